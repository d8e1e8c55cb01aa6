// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Backend configuration, one variant per execution adapter.
//!
//! Executions carry a provider key plus a free-form config blob as
//! submitted; [`BackendConfig::resolve`] turns the pair into a typed variant
//! so routing is exhaustive.

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const LOCAL_MODEL: &str = "local-model";
pub const MANAGED_CONTAINER: &str = "managed-container";
pub const MANAGED_SANDBOX: &str = "managed-sandbox";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum BackendConfigError {
    #[error("unknown model provider: {0}")]
    UnknownProvider(String),
    #[error("invalid {provider} config: {message}")]
    Invalid { provider: String, message: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "provider", rename_all = "kebab-case")]
pub enum BackendConfig {
    LocalModel(LocalModelConfig),
    ManagedContainer(ContainerJobConfig),
    ManagedSandbox(SandboxJobConfig),
}

/// Local model server reachable over plain HTTP.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocalModelConfig {
    #[serde(default = "default_local_endpoint")]
    pub endpoint: String,
    pub model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

fn default_local_endpoint() -> String {
    "http://localhost:11434/api".to_string()
}

fn default_temperature() -> f32 {
    0.7
}

/// Per-job settings forwarded into the container environment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerJobConfig {
    #[serde(default, alias = "modelId")]
    pub model_id: Option<String>,
    #[serde(default)]
    pub region: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SandboxJobConfig {
    pub endpoint: String,
    #[serde(alias = "runtimeId")]
    pub runtime_id: String,
}

impl BackendConfig {
    pub fn resolve(provider: &str, config: &serde_json::Value) -> Result<Self, BackendConfigError> {
        let blob = match config {
            serde_json::Value::Null => serde_json::Value::Object(Default::default()),
            other => other.clone(),
        };
        let invalid = |e: serde_json::Error| BackendConfigError::Invalid {
            provider: provider.to_string(),
            message: e.to_string(),
        };
        match provider {
            LOCAL_MODEL => serde_json::from_value(blob).map(Self::LocalModel).map_err(invalid),
            MANAGED_CONTAINER => {
                serde_json::from_value(blob).map(Self::ManagedContainer).map_err(invalid)
            }
            MANAGED_SANDBOX => serde_json::from_value(blob).map(Self::ManagedSandbox).map_err(invalid),
            other => Err(BackendConfigError::UnknownProvider(other.to_string())),
        }
    }

    pub fn provider(&self) -> &'static str {
        match self {
            Self::LocalModel(_) => LOCAL_MODEL,
            Self::ManagedContainer(_) => MANAGED_CONTAINER,
            Self::ManagedSandbox(_) => MANAGED_SANDBOX,
        }
    }
}

#[cfg(test)]
#[path = "backend_tests.rs"]
mod tests;
