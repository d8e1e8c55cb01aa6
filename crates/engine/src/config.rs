// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Engine tunables

use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const SUCCESS_MARKER: &str = "===ARQ_EXECUTION_SUCCESS===";
pub const FAILURE_MARKER: &str = "===ARQ_EXECUTION_FAILED===";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Cap on in-flight executions
    pub max_concurrent: usize,
    /// Claimed entries older than this are considered abandoned
    pub reclaim_grace_ms: u64,
    pub log_poll_interval_ms: u64,
    /// Consecutive log fetch failures tolerated before polling gives up
    pub poll_retry_limit: u32,
    pub success_marker: String,
    pub failure_marker: String,
    pub sweep_interval_ms: u64,
    pub reclaim_interval_ms: u64,
    pub checkpoint_interval_ms: u64,
    pub container: ContainerSettings,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            max_concurrent: 10,
            reclaim_grace_ms: 15 * 60 * 1000,
            log_poll_interval_ms: 2_000,
            poll_retry_limit: 3,
            success_marker: SUCCESS_MARKER.to_string(),
            failure_marker: FAILURE_MARKER.to_string(),
            sweep_interval_ms: 5_000,
            reclaim_interval_ms: 5 * 60 * 1000,
            checkpoint_interval_ms: 60_000,
            container: ContainerSettings::default(),
        }
    }
}

impl RuntimeConfig {
    pub fn log_poll_interval(&self) -> Duration {
        Duration::from_millis(self.log_poll_interval_ms)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_millis(self.sweep_interval_ms)
    }

    pub fn reclaim_interval(&self) -> Duration {
        Duration::from_millis(self.reclaim_interval_ms)
    }

    pub fn checkpoint_interval(&self) -> Duration {
        Duration::from_millis(self.checkpoint_interval_ms)
    }

    /// Delay before the next poll after `failures` consecutive fetch errors.
    pub fn poll_backoff(&self, failures: u32) -> Duration {
        self.log_poll_interval().saturating_mul(1u32 << failures.min(16))
    }
}

/// Where and how container tasks are launched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContainerSettings {
    pub image: String,
    /// Cluster name, or namespace on Kubernetes
    pub cluster: String,
    pub task_definition: String,
    /// Network the task joins, if any
    pub network: Option<String>,
    pub cpu_units: u32,
    pub memory_mb: u32,
    pub log_group: String,
}

impl Default for ContainerSettings {
    fn default() -> Self {
        Self {
            image: "arq-agent-runner:latest".to_string(),
            cluster: "default".to_string(),
            task_definition: "arq-agent-runner".to_string(),
            network: None,
            cpu_units: 1024,
            memory_mb: 2048,
            log_group: "/arq/agents".to_string(),
        }
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
