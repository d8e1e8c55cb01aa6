// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon lifecycle management: startup, shutdown, recovery.

mod startup;
#[cfg(test)]
pub(crate) use startup::Adapters;
pub use startup::startup;

use std::fs::File;
use std::path::PathBuf;
use std::time::Instant;

use arq_adapters::ContainerError;
use arq_core::SystemClock;
use arq_engine::Runtime;
use arq_storage::StoreError;
use thiserror::Error;
use tokio::net::UnixListener;
use tracing::{info, warn};

use crate::config::ConfigError;
use crate::env;

/// Daemon runtime with the real clock
pub type DaemonRuntime = Runtime<SystemClock>;

/// Filesystem layout of one daemon instance
#[derive(Debug, Clone)]
pub struct Config {
    /// Root state directory (e.g. ~/.local/state/arq); also holds the store
    pub state_dir: PathBuf,
    pub socket_path: PathBuf,
    /// Lock file holding the daemon PID
    pub lock_path: PathBuf,
    pub log_path: PathBuf,
    pub config_path: PathBuf,
}

impl Config {
    pub fn load() -> Result<Self, LifecycleError> {
        let state_dir = env::state_dir()?;
        let config_path = env::config_path(&state_dir);
        Ok(Self { config_path, ..Self::for_state_dir(state_dir) })
    }

    pub fn for_state_dir(state_dir: PathBuf) -> Self {
        Self {
            socket_path: state_dir.join("arqd.sock"),
            lock_path: state_dir.join("arqd.pid"),
            log_path: state_dir.join("arqd.log"),
            config_path: state_dir.join("arq.toml"),
            state_dir,
        }
    }
}

/// Daemon state during operation.
pub struct DaemonState {
    pub config: Config,
    // NOTE(lifetime): Held to maintain exclusive file lock; released on drop
    #[allow(dead_code)]
    lock_file: File,
    pub runtime: DaemonRuntime,
    pub start_time: Instant,
}

/// Result of daemon startup: the daemon state and the bound socket.
pub struct StartupResult {
    pub daemon: DaemonState,
    pub listener: UnixListener,
    /// Container executions whose timers were re-armed
    pub reconciled: usize,
}

impl DaemonState {
    /// Persist state and remove the socket and PID files.
    ///
    /// Running containers are left alone; the next startup re-arms their
    /// poll and timeout timers.
    pub fn shutdown(&mut self) -> Result<(), LifecycleError> {
        info!("Shutting down daemon...");

        if let Err(e) = self.runtime.store().flush() {
            warn!("Failed to flush WAL on shutdown: {}", e);
        }
        match self.runtime.store().checkpoint() {
            Ok(Some(seq)) => info!(seq, "saved final shutdown snapshot"),
            Ok(None) => {}
            Err(e) => warn!("Failed to save shutdown snapshot: {}", e),
        }

        for path in [&self.config.socket_path, &self.config.lock_path] {
            if path.exists() {
                if let Err(e) = std::fs::remove_file(path) {
                    warn!(path = %path.display(), "Failed to remove file: {}", e);
                }
            }
        }

        info!(uptime_secs = self.start_time.elapsed().as_secs(), "Daemon shutdown complete");
        Ok(())
    }
}

/// Lifecycle errors
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("Could not determine state directory")]
    NoStateDir,

    #[error("Failed to acquire lock: daemon already running?")]
    LockFailed(#[source] std::io::Error),

    #[error("Failed to bind socket at {0}: {1}")]
    BindFailed(PathBuf, std::io::Error),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Container platform error: {0}")]
    Container(#[from] ContainerError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
