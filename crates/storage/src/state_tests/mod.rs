// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use arq_core::test_support::{entry_created_event, logs_event, status_event, submitted_event};
use arq_core::{ErrorStage, ExecutionId, QueueEntryId};

fn state_with(events: &[Event]) -> MaterializedState {
    let mut state = MaterializedState::default();
    for event in events {
        state.apply_event(event);
    }
    state
}

fn exe(state: &MaterializedState, id: &str) -> Execution {
    state.executions.get(id).cloned().unwrap()
}

fn failed(id: &str, error: &str) -> Event {
    Event::ExecutionFailed {
        id: ExecutionId::from_string(id),
        stage: ErrorStage::Build,
        error: error.to_string(),
        at_ms: 2_000_000,
    }
}

#[test]
fn every_event_is_idempotent() {
    let events = vec![
        submitted_event("exe-1"),
        entry_created_event("exe-1", 1, 10),
        Event::QueueEntryClaimed { id: QueueEntryId::from_string("que-1"), at_ms: 20 },
        status_event("exe-1", ExecutionStatus::Running, 30),
        logs_event("exe-1", &["a", "b"], Some(0)),
        Event::PollFailuresSet { id: ExecutionId::from_string("exe-1"), count: 2 },
        Event::QueueEntryDeleted { id: QueueEntryId::from_string("que-1") },
    ];
    let once = state_with(&events);
    let twice = state_with(&events.iter().flat_map(|e| [e.clone(), e.clone()]).collect::<Vec<_>>());

    assert_eq!(exe(&once, "exe-1"), exe(&twice, "exe-1"));
    assert_eq!(once.queue, twice.queue);
}

#[test]
fn entry_created_links_execution() {
    let state = state_with(&[submitted_event("exe-1"), entry_created_event("exe-1", 1, 10)]);
    assert_eq!(exe(&state, "exe-1").entry_id.as_ref().map(|i| i.as_str()), Some("que-1"));
    assert!(state.has_pending());

    let state = state_with(&[
        submitted_event("exe-1"),
        entry_created_event("exe-1", 1, 10),
        Event::QueueEntryDeleted { id: QueueEntryId::from_string("que-1") },
    ]);
    assert!(exe(&state, "exe-1").entry_id.is_none());
    assert!(!state.has_pending());
}

#[test]
fn terminal_status_is_sticky() {
    let state = state_with(&[
        submitted_event("exe-1"),
        status_event("exe-1", ExecutionStatus::Running, 10),
        Event::ExecutionCompleted {
            id: ExecutionId::from_string("exe-1"),
            response: Some("done".into()),
            usage: None,
            at_ms: 20,
        },
        failed("exe-1", "late timeout"),
        status_event("exe-1", ExecutionStatus::Running, 30),
    ]);
    let e = exe(&state, "exe-1");
    assert_eq!(e.status, ExecutionStatus::Completed);
    assert_eq!(e.response.as_deref(), Some("done"));
    assert!(e.error.is_none());
}

#[test]
fn requeue_resets_failed_but_not_completed() {
    let requeue = Event::ExecutionRequeued {
        id: ExecutionId::from_string("exe-1"),
        entry_id: QueueEntryId::from_string("que-2"),
        attempts: 1,
    };
    let state = state_with(&[submitted_event("exe-1"), failed("exe-1", "boom"), requeue.clone()]);
    let e = exe(&state, "exe-1");
    assert_eq!(e.status, ExecutionStatus::Queued);
    assert_eq!(e.attempts, 1);
    assert!(e.error.is_none());

    let state = state_with(&[
        submitted_event("exe-1"),
        Event::ExecutionCompleted {
            id: ExecutionId::from_string("exe-1"),
            response: None,
            usage: None,
            at_ms: 5,
        },
        requeue,
    ]);
    assert_eq!(exe(&state, "exe-1").status, ExecutionStatus::Completed);
}

#[test]
fn offset_tagged_logs_drop_duplicates() {
    let state = state_with(&[
        submitted_event("exe-1"),
        logs_event("exe-1", &["one", "two"], Some(0)),
        // redelivery of the same batch
        logs_event("exe-1", &["one", "two"], Some(0)),
        logs_event("exe-1", &["three"], Some(2)),
        // stale offset from the future
        logs_event("exe-1", &["bogus"], Some(9)),
        logs_event("exe-1", &["note"], None),
    ]);
    let e = exe(&state, "exe-1");
    assert_eq!(e.logs, vec!["one", "two", "three", "note"]);
    assert_eq!(e.log_offset, 3);
}

#[test]
fn backend_attach_merges_handles_and_resources() {
    let state = state_with(&[
        submitted_event("exe-1"),
        Event::ExecutionBackendAttached {
            id: ExecutionId::from_string("exe-1"),
            handles: arq_core::BackendHandles { task_id: Some("t-1".into()), ..Default::default() },
            cpu_units: Some(256),
            memory_mb: Some(512),
        },
        Event::ExecutionBackendAttached {
            id: ExecutionId::from_string("exe-1"),
            handles: arq_core::BackendHandles { log_stream: Some("s-1".into()), ..Default::default() },
            cpu_units: None,
            memory_mb: None,
        },
    ]);
    let e = exe(&state, "exe-1");
    assert_eq!(e.handles.task_id.as_deref(), Some("t-1"));
    assert_eq!(e.handles.log_stream.as_deref(), Some("s-1"));
    assert_eq!(e.metrics.cpu_units, Some(256));
    assert_eq!(e.metrics.memory_mb, Some(512));
}

#[test]
fn pending_entries_sorted_by_priority_then_age() {
    let state = state_with(&[
        submitted_event("exe-a"),
        submitted_event("exe-b"),
        submitted_event("exe-c"),
        entry_created_event("exe-a", 2, 1),
        entry_created_event("exe-b", 2, 2),
        entry_created_event("exe-c", 1, 3),
    ]);
    let order: Vec<&str> =
        state.pending_entries().iter().map(|e| e.execution_id.as_str()).collect();
    assert_eq!(order, vec!["exe-c", "exe-a", "exe-b"]);
}

#[test]
fn in_flight_counts_active_and_claimed_not_started() {
    let state = state_with(&[
        submitted_event("exe-1"),
        submitted_event("exe-2"),
        submitted_event("exe-3"),
        entry_created_event("exe-1", 1, 1),
        entry_created_event("exe-2", 1, 2),
        Event::QueueEntryClaimed { id: QueueEntryId::from_string("que-1"), at_ms: 5 },
        Event::QueueEntryClaimed { id: QueueEntryId::from_string("que-2"), at_ms: 5 },
        status_event("exe-2", ExecutionStatus::Building, 6),
        status_event("exe-3", ExecutionStatus::Running, 6),
    ]);
    assert_eq!(state.active_count(), 2);
    // exe-1 claimed but queued, exe-2 building (counted once), exe-3 running
    assert_eq!(state.in_flight_count(), 3);
}

#[test]
fn claimed_before_filters_by_cutoff() {
    let state = state_with(&[
        submitted_event("exe-1"),
        submitted_event("exe-2"),
        entry_created_event("exe-1", 1, 1),
        entry_created_event("exe-2", 1, 1),
        Event::QueueEntryClaimed { id: QueueEntryId::from_string("que-1"), at_ms: 100 },
        Event::QueueEntryClaimed { id: QueueEntryId::from_string("que-2"), at_ms: 500 },
    ]);
    let stale: Vec<&str> = state.claimed_before(200).iter().map(|e| e.id.as_str()).collect();
    assert_eq!(stale, vec!["que-1"]);
}

#[test]
fn get_execution_by_prefix() {
    let state = state_with(&[submitted_event("exe-abc123"), submitted_event("exe-xyz789")]);
    assert!(state.get_execution("exe-abc123").is_some());
    assert!(state.get_execution("abc").is_some());
    assert!(state.get_execution("exe-").is_none());
    assert!(state.get_execution("nope").is_none());
}
