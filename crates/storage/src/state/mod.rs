// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Materialized state from WAL replay

mod executions;
mod helpers;
mod queue;

use arq_core::{Event, Execution, ExecutionStatus, QueueEntry, QueueEntryStatus};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Executions and queue entries, keyed by id.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct MaterializedState {
    pub executions: HashMap<String, Execution>,
    #[serde(default)]
    pub queue: HashMap<String, QueueEntry>,
}

impl MaterializedState {
    /// Get an execution by ID or unique prefix (like git commit hashes)
    pub fn get_execution(&self, id: &str) -> Option<&Execution> {
        helpers::find_by_prefix(&self.executions, id)
    }

    pub fn get_entry(&self, id: &str) -> Option<&QueueEntry> {
        self.queue.get(id)
    }

    pub fn has_pending(&self) -> bool {
        self.queue.values().any(QueueEntry::is_pending)
    }

    /// Pending entries in claim order: priority, then age.
    pub fn pending_entries(&self) -> Vec<&QueueEntry> {
        let mut pending: Vec<&QueueEntry> = self.queue.values().filter(|e| e.is_pending()).collect();
        pending.sort_by(|a, b| a.order_key().cmp(&b.order_key()));
        pending
    }

    /// Executions currently BUILDING or RUNNING.
    pub fn active_count(&self) -> usize {
        self.executions.values().filter(|e| e.status.is_active()).count()
    }

    /// Active executions plus claimed entries whose execution has not
    /// started yet. This is the figure bounded by the concurrency cap.
    pub fn in_flight_count(&self) -> usize {
        let claimed_not_started = self
            .queue
            .values()
            .filter(|entry| entry.status == QueueEntryStatus::Claimed)
            .filter(|entry| {
                self.executions
                    .get(entry.execution_id.as_str())
                    .is_some_and(|e| e.status == ExecutionStatus::Queued)
            })
            .count();
        self.active_count() + claimed_not_started
    }

    /// Live queue entry referencing `execution_id`, if any.
    pub fn entry_for(&self, execution_id: &str) -> Option<&QueueEntry> {
        self.queue.values().find(|e| e.execution_id == execution_id)
    }

    /// Claimed entries with `claimed_at_ms <= cutoff_ms`, oldest first.
    pub fn claimed_before(&self, cutoff_ms: u64) -> Vec<&QueueEntry> {
        let mut stale: Vec<&QueueEntry> =
            self.queue.values().filter(|e| e.claimed_before(cutoff_ms)).collect();
        stale.sort_by(|a, b| (a.claimed_at_ms, a.id.as_str()).cmp(&(b.claimed_at_ms, b.id.as_str())));
        stale
    }

    /// Non-terminal executions with the given status.
    pub fn executions_with_status(&self, status: ExecutionStatus) -> Vec<&Execution> {
        self.executions.values().filter(|e| e.status == status).collect()
    }

    /// Apply an event to derive state changes.
    ///
    /// # Idempotency
    ///
    /// Handlers must tolerate replay: applying an event twice leaves the same
    /// state as applying it once. Inserts check for existing keys, status
    /// moves go through [`Execution::advance`], and offset-tagged log appends
    /// only apply at their exact offset.
    pub fn apply_event(&mut self, event: &Event) {
        match event {
            Event::ExecutionSubmitted { .. }
            | Event::ExecutionStatusChanged { .. }
            | Event::ExecutionBackendAttached { .. }
            | Event::ExecutionCompleted { .. }
            | Event::ExecutionFailed { .. }
            | Event::ExecutionRequeued { .. }
            | Event::LogsAppended { .. }
            | Event::PollFailuresSet { .. } => executions::apply(self, event),

            Event::QueueEntryCreated { .. }
            | Event::QueueEntryClaimed { .. }
            | Event::QueueEntryDeleted { .. } => queue::apply(self, event),
        }
    }
}

#[cfg(test)]
#[path = "../state_tests/mod.rs"]
mod tests;
