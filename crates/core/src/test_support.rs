// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test helpers for use across crates.
//!
//! Gated behind `#[cfg(any(test, feature = "test-support"))]`.

use crate::{Event, Execution, ExecutionId, ExecutionStatus, QueueEntry, QueueEntryId};

// ── Proptest strategies ─────────────────────────────────────────────────

pub mod strategies {
    use crate::execution::ExecutionStatus;
    use proptest::prelude::*;

    pub fn arb_status() -> impl Strategy<Value = ExecutionStatus> {
        prop_oneof![
            Just(ExecutionStatus::Queued),
            Just(ExecutionStatus::Building),
            Just(ExecutionStatus::Running),
            Just(ExecutionStatus::Completed),
            Just(ExecutionStatus::Failed),
        ]
    }

    /// Queue priorities in a small range so ties are common.
    pub fn arb_priorities(max_len: usize) -> impl Strategy<Value = Vec<u32>> {
        prop::collection::vec(0u32..4, 1..=max_len)
    }
}

// ── Event factory functions ─────────────────────────────────────────────

/// Submission of a QUEUED container execution with the given id.
pub fn submitted_event(id: &str) -> Event {
    Event::ExecutionSubmitted { execution: Box::new(Execution::builder().id(id).build()) }
}

/// Pending queue entry `que-<exe suffix>` for execution `id`.
pub fn entry_created_event(id: &str, priority: u32, created_at_ms: u64) -> Event {
    let exe = ExecutionId::from_string(id);
    Event::QueueEntryCreated {
        entry: QueueEntry::builder()
            .id(QueueEntryId::from_string(format!("que-{}", exe.suffix())))
            .execution_id(exe)
            .priority(priority)
            .created_at_ms(created_at_ms)
            .build(),
    }
}

pub fn status_event(id: &str, status: ExecutionStatus, at_ms: u64) -> Event {
    Event::ExecutionStatusChanged { id: ExecutionId::from_string(id), status, at_ms }
}

pub fn logs_event(id: &str, lines: &[&str], source_offset: Option<u64>) -> Event {
    Event::LogsAppended {
        id: ExecutionId::from_string(id),
        lines: lines.iter().map(|s| s.to_string()).collect(),
        source_offset,
        at_ms: 1_000_000,
    }
}
