// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use arq_core::Submission;
use serde::{Deserialize, Serialize};

/// Request from a client to the daemon
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Request {
    /// Health check
    Ping,

    /// Queue a new execution; triggers an immediate sweep
    Submit { submission: Box<Submission> },

    /// Cancel an execution by ID or unique prefix
    Cancel { id: String },

    Get { id: String },

    List,

    /// Readiness of a managed sandbox runtime
    SandboxStatus { endpoint: String, runtime_id: String },

    Shutdown,
}

impl Request {
    /// Short form for logs; submissions carry code bundles.
    pub fn summary(&self) -> String {
        match self {
            Request::Ping => "ping".to_string(),
            Request::Submit { submission } => {
                format!("submit agent={} provider={}", submission.agent_id, submission.provider)
            }
            Request::Cancel { id } => format!("cancel {id}"),
            Request::Get { id } => format!("get {id}"),
            Request::List => "list".to_string(),
            Request::SandboxStatus { runtime_id, .. } => format!("sandbox-status {runtime_id}"),
            Request::Shutdown => "shutdown".to_string(),
        }
    }
}

#[cfg(test)]
#[path = "request_tests.rs"]
mod tests;
