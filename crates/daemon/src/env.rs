// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the daemon.

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use crate::lifecycle::LifecycleError;

/// Resolve state directory: ARQ_STATE_DIR > XDG_STATE_HOME/arq > ~/.local/state/arq
pub fn state_dir() -> Result<PathBuf, LifecycleError> {
    if let Some(dir) = non_empty("ARQ_STATE_DIR") {
        return Ok(PathBuf::from(dir));
    }
    if let Some(xdg) = non_empty("XDG_STATE_HOME") {
        return Ok(PathBuf::from(xdg).join("arq"));
    }
    let home = dirs::home_dir().ok_or(LifecycleError::NoStateDir)?;
    Ok(home.join(".local/state/arq"))
}

/// Config file: ARQ_CONFIG > <state_dir>/arq.toml
pub fn config_path(state_dir: &Path) -> PathBuf {
    non_empty("ARQ_CONFIG").map(PathBuf::from).unwrap_or_else(|| state_dir.join("arq.toml"))
}

/// Default IPC timeout
pub fn ipc_timeout() -> Duration {
    parse::<u64>("ARQ_IPC_TIMEOUT_MS")
        .and_then(Result::ok)
        .map(Duration::from_millis)
        .unwrap_or(Duration::from_secs(5))
}

/// Set inside a Kubernetes pod
pub fn in_cluster() -> bool {
    non_empty("KUBERNETES_SERVICE_HOST").is_some()
}

/// `None` when unset or blank; `Some(Err(raw))` when set but unparseable.
pub fn parse<T: FromStr>(name: &str) -> Option<Result<T, String>> {
    non_empty(name).map(|raw| raw.trim().parse::<T>().map_err(|_| raw))
}

fn non_empty(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|s| !s.trim().is_empty())
}

#[cfg(test)]
#[path = "env_tests.rs"]
mod tests;
