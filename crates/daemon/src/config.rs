// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon settings: TOML file, then `ARQ_*` environment overrides.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use arq_engine::RuntimeConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::env;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {0}: {1}")]
    Read(PathBuf, #[source] std::io::Error),

    #[error("failed to parse {0}: {1}")]
    Parse(PathBuf, #[source] toml::de::Error),

    #[error("invalid value for {name}: {value:?}")]
    InvalidEnv { name: &'static str, value: String },
}

/// Platform that runs managed-container executions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContainerRuntime {
    Docker,
    Kubernetes,
}

impl FromStr for ContainerRuntime {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "docker" => Ok(ContainerRuntime::Docker),
            "kubernetes" | "k8s" => Ok(ContainerRuntime::Kubernetes),
            other => Err(other.to_string()),
        }
    }
}

arq_core::simple_display! {
    ContainerRuntime {
        Docker => "docker",
        Kubernetes => "kubernetes",
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DaemonConfig {
    /// Unset means Kubernetes when running in-cluster, Docker otherwise.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub container_runtime: Option<ContainerRuntime>,
    pub runtime: RuntimeConfig,
}

impl DaemonConfig {
    /// Read `path` (a missing file yields defaults), then apply overrides.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let mut config = match std::fs::read_to_string(path) {
            Ok(text) => Self::from_toml(&text).map_err(|e| ConfigError::Parse(path.into(), e))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "no config file, using defaults");
                Self::default()
            }
            Err(e) => return Err(ConfigError::Read(path.into(), e)),
        };
        config.apply_env()?;
        Ok(config)
    }

    pub fn from_toml(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    fn apply_env(&mut self) -> Result<(), ConfigError> {
        if let Some(v) = override_value::<usize>("ARQ_MAX_CONCURRENT")? {
            self.runtime.max_concurrent = v;
        }
        if let Some(v) = override_value::<u64>("ARQ_SWEEP_INTERVAL_MS")? {
            self.runtime.sweep_interval_ms = v;
        }
        if let Some(v) = override_value::<u64>("ARQ_RECLAIM_GRACE_MS")? {
            self.runtime.reclaim_grace_ms = v;
        }
        if let Some(v) = override_value::<ContainerRuntime>("ARQ_CONTAINER_RUNTIME")? {
            self.container_runtime = Some(v);
        }
        if let Some(v) = override_value::<String>("ARQ_CONTAINER_IMAGE")? {
            self.runtime.container.image = v;
        }
        Ok(())
    }

    pub fn container_runtime(&self) -> ContainerRuntime {
        match self.container_runtime {
            Some(runtime) => runtime,
            None if env::in_cluster() => ContainerRuntime::Kubernetes,
            None => ContainerRuntime::Docker,
        }
    }
}

fn override_value<T: FromStr>(name: &'static str) -> Result<Option<T>, ConfigError> {
    env::parse::<T>(name).transpose().map_err(|value| ConfigError::InvalidEnv { name, value })
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
