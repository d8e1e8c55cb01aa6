// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Events recorded in the write-ahead log.
//!
//! Every mutation of the job store is expressed as one of these; replaying
//! them in order over an empty state rebuilds it.

use crate::execution::{BackendHandles, ErrorStage, Execution, ExecutionId, ExecutionStatus, TokenUsage};
use crate::queue::{QueueEntry, QueueEntryId};
use serde::{Deserialize, Serialize};

/// Serializes with `{"type": "event:name", ...fields}` format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    #[serde(rename = "execution:submitted")]
    ExecutionSubmitted { execution: Box<Execution> },

    #[serde(rename = "execution:status")]
    ExecutionStatusChanged { id: ExecutionId, status: ExecutionStatus, at_ms: u64 },

    /// Backend handles plus resource reservation, recorded once a backend accepts the job
    #[serde(rename = "execution:backend")]
    ExecutionBackendAttached {
        id: ExecutionId,
        handles: BackendHandles,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        cpu_units: Option<u32>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        memory_mb: Option<u32>,
    },

    #[serde(rename = "execution:completed")]
    ExecutionCompleted {
        id: ExecutionId,
        #[serde(default)]
        response: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        usage: Option<TokenUsage>,
        at_ms: u64,
    },

    #[serde(rename = "execution:failed")]
    ExecutionFailed { id: ExecutionId, stage: ErrorStage, error: String, at_ms: u64 },

    /// Reset a failed or abandoned execution back to QUEUED for another attempt
    #[serde(rename = "execution:requeued")]
    ExecutionRequeued { id: ExecutionId, entry_id: QueueEntryId, attempts: u32 },

    /// `source_offset` is the sink position the lines were read from; when
    /// set, the append only applies if it matches the current offset.
    #[serde(rename = "execution:logs")]
    LogsAppended {
        id: ExecutionId,
        lines: Vec<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        source_offset: Option<u64>,
        at_ms: u64,
    },

    #[serde(rename = "execution:poll_failures")]
    PollFailuresSet { id: ExecutionId, count: u32 },

    #[serde(rename = "queue:created")]
    QueueEntryCreated { entry: QueueEntry },

    #[serde(rename = "queue:claimed")]
    QueueEntryClaimed { id: QueueEntryId, at_ms: u64 },

    #[serde(rename = "queue:deleted")]
    QueueEntryDeleted { id: QueueEntryId },
}

impl Event {
    pub fn name(&self) -> &'static str {
        match self {
            Event::ExecutionSubmitted { .. } => "execution:submitted",
            Event::ExecutionStatusChanged { .. } => "execution:status",
            Event::ExecutionBackendAttached { .. } => "execution:backend",
            Event::ExecutionCompleted { .. } => "execution:completed",
            Event::ExecutionFailed { .. } => "execution:failed",
            Event::ExecutionRequeued { .. } => "execution:requeued",
            Event::LogsAppended { .. } => "execution:logs",
            Event::PollFailuresSet { .. } => "execution:poll_failures",
            Event::QueueEntryCreated { .. } => "queue:created",
            Event::QueueEntryClaimed { .. } => "queue:claimed",
            Event::QueueEntryDeleted { .. } => "queue:deleted",
        }
    }

    /// Execution this event touches directly, if any.
    pub fn execution_id(&self) -> Option<&ExecutionId> {
        match self {
            Event::ExecutionSubmitted { execution } => Some(&execution.id),
            Event::ExecutionStatusChanged { id, .. }
            | Event::ExecutionBackendAttached { id, .. }
            | Event::ExecutionCompleted { id, .. }
            | Event::ExecutionFailed { id, .. }
            | Event::ExecutionRequeued { id, .. }
            | Event::LogsAppended { id, .. }
            | Event::PollFailuresSet { id, .. } => Some(id),
            Event::QueueEntryCreated { entry } => Some(&entry.execution_id),
            Event::QueueEntryClaimed { .. } | Event::QueueEntryDeleted { .. } => None,
        }
    }

    /// One-line description for tracing.
    pub fn log_summary(&self) -> String {
        let t = self.name();
        match self {
            Event::ExecutionSubmitted { execution } => {
                format!("{t} id={} provider={}", execution.id, execution.provider)
            }
            Event::ExecutionStatusChanged { id, status, .. } => format!("{t} id={id} status={status}"),
            Event::ExecutionFailed { id, stage, .. } => format!("{t} id={id} stage={stage}"),
            Event::ExecutionRequeued { id, attempts, .. } => {
                format!("{t} id={id} attempts={attempts}")
            }
            Event::LogsAppended { id, lines, .. } => format!("{t} id={id} lines={}", lines.len()),
            Event::PollFailuresSet { id, count } => format!("{t} id={id} count={count}"),
            Event::QueueEntryCreated { entry } => {
                format!("{t} id={} exe={} attempts={}", entry.id, entry.execution_id, entry.attempts)
            }
            Event::QueueEntryClaimed { id, .. } | Event::QueueEntryDeleted { id } => {
                format!("{t} id={id}")
            }
            Event::ExecutionBackendAttached { id, .. } | Event::ExecutionCompleted { id, .. } => {
                format!("{t} id={id}")
            }
        }
    }
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
