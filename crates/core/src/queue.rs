// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Queue entries: the schedulable handle for a non-terminal execution.

use crate::execution::ExecutionId;
use serde::{Deserialize, Serialize};

crate::define_id! {
    /// Unique identifier for a queue entry.
    pub struct QueueEntryId("que-");
}

/// Maximum number of attempts before an execution is failed permanently.
pub const MAX_ATTEMPTS: u32 = 3;

/// Attempt count for the next retry, or `None` once the budget is spent.
pub fn next_attempt(attempts: u32) -> Option<u32> {
    let next = attempts.saturating_add(1);
    (next < MAX_ATTEMPTS).then_some(next)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueueEntryStatus {
    Pending,
    Claimed,
}

crate::simple_display! {
    QueueEntryStatus {
        Pending => "pending",
        Claimed => "claimed",
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueEntry {
    pub id: QueueEntryId,
    pub execution_id: ExecutionId,
    /// Lower is more urgent
    pub priority: u32,
    pub status: QueueEntryStatus,
    pub created_at_ms: u64,
    #[serde(default)]
    pub claimed_at_ms: Option<u64>,
    #[serde(default)]
    pub attempts: u32,
    #[serde(default)]
    pub last_error: Option<String>,
}

impl QueueEntry {
    pub fn new(execution_id: ExecutionId, priority: u32, created_at_ms: u64) -> Self {
        Self {
            id: QueueEntryId::new(),
            execution_id,
            priority,
            status: QueueEntryStatus::Pending,
            created_at_ms,
            claimed_at_ms: None,
            attempts: 0,
            last_error: None,
        }
    }

    /// Fresh pending entry for a retry of the same execution.
    pub fn retry(&self, attempts: u32, last_error: impl Into<String>, now_ms: u64) -> Self {
        Self {
            attempts,
            last_error: Some(last_error.into()),
            ..Self::new(self.execution_id.clone(), self.priority, now_ms)
        }
    }

    pub fn is_pending(&self) -> bool {
        self.status == QueueEntryStatus::Pending
    }

    /// Claimed at or before `cutoff_ms`.
    pub fn claimed_before(&self, cutoff_ms: u64) -> bool {
        self.status == QueueEntryStatus::Claimed
            && self.claimed_at_ms.is_some_and(|at| at <= cutoff_ms)
    }

    /// Sort key: priority, then age, then id for a stable tie-break.
    pub fn order_key(&self) -> (u32, u64, &str) {
        (self.priority, self.created_at_ms, self.id.as_str())
    }
}

crate::builder! {
    QueueEntryBuilder => QueueEntry,
    seed: QueueEntry {
        id: QueueEntryId::from_string("que-test"),
        ..QueueEntry::new(ExecutionId::from_string("exe-test"), 1, 1_000_000)
    },
    into { id: QueueEntryId, execution_id: ExecutionId }
    set { priority: u32, status: QueueEntryStatus, created_at_ms: u64, attempts: u32 }
    option { claimed_at_ms: u64, last_error: String }
}

#[cfg(test)]
#[path = "queue_tests.rs"]
mod tests;
