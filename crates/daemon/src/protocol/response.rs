// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use arq_adapters::RuntimeStatus;
use arq_core::{ErrorStage, Execution, ExecutionStatus};
use serde::{Deserialize, Serialize};

/// Response from daemon to a client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Response {
    Pong,

    Submitted { execution: Box<Execution> },

    Cancelled { id: String },

    /// Cancel found the execution already finalized
    AlreadyTerminal { id: String, status: ExecutionStatus },

    /// Full record, or `None` when nothing matched
    Execution { execution: Option<Box<Execution>> },

    Executions { executions: Vec<ExecutionSummary> },

    SandboxStatus { status: RuntimeStatus },

    ShuttingDown,

    Error { message: String },
}

/// Listing row; omits logs and the agent bundle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionSummary {
    pub id: String,
    pub agent_id: String,
    pub provider: String,
    pub status: ExecutionStatus,
    pub attempts: u32,
    pub submitted_at_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_stage: Option<ErrorStage>,
}

impl From<&Execution> for ExecutionSummary {
    fn from(exe: &Execution) -> Self {
        Self {
            id: exe.id.to_string(),
            agent_id: exe.agent_id.clone(),
            provider: exe.provider.clone(),
            status: exe.status,
            attempts: exe.attempts,
            submitted_at_ms: exe.metrics.submitted_at_ms,
            error: exe.error.clone(),
            error_stage: exe.error_stage,
        }
    }
}
