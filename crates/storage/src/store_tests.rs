// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use arq_core::test_support::{entry_created_event, status_event, submitted_event};
use arq_core::ExecutionStatus;
use std::sync::Barrier;
use tempfile::tempdir;

fn seeded(store: &JobStore, ids: &[&str]) {
    let mut events = Vec::new();
    for (i, id) in ids.iter().enumerate() {
        events.push(submitted_event(id));
        events.push(entry_created_event(id, 1, i as u64));
    }
    store.apply(events).unwrap();
}

fn entry_id(id: &str) -> QueueEntryId {
    QueueEntryId::from_string(format!("que-{}", id.trim_start_matches("exe-")))
}

#[test]
fn claim_marks_entry_claimed() {
    let store = JobStore::in_memory();
    seeded(&store, &["exe-1"]);

    let outcome = store.try_claim(&entry_id("exe-1"), 42, 10).unwrap();

    let entry = match outcome {
        ClaimOutcome::Claimed(entry) => entry,
        other => panic!("expected claim, got {other:?}"),
    };
    assert_eq!(entry.claimed_at_ms, Some(42));
    assert_eq!(store.read(|s| s.get_entry("que-1").map(|e| e.status)), Some(QueueEntryStatus::Claimed));
}

#[test]
fn second_claim_is_already_taken() {
    let store = JobStore::in_memory();
    seeded(&store, &["exe-1"]);

    store.try_claim(&entry_id("exe-1"), 1, 10).unwrap();
    assert_eq!(store.try_claim(&entry_id("exe-1"), 2, 10).unwrap(), ClaimOutcome::AlreadyTaken);
    assert_eq!(
        store.try_claim(&QueueEntryId::from_string("que-missing"), 2, 10).unwrap(),
        ClaimOutcome::AlreadyTaken
    );
}

#[test]
fn claim_respects_capacity() {
    let store = JobStore::in_memory();
    seeded(&store, &["exe-1", "exe-2"]);
    store.apply(vec![status_event("exe-1", ExecutionStatus::Running, 5)]).unwrap();

    assert_eq!(store.try_claim(&entry_id("exe-2"), 6, 1).unwrap(), ClaimOutcome::AtCapacity);
    assert!(matches!(store.try_claim(&entry_id("exe-2"), 6, 2).unwrap(), ClaimOutcome::Claimed(_)));
}

#[test]
fn racing_claims_have_exactly_one_winner() {
    let store = JobStore::in_memory();
    seeded(&store, &["exe-1"]);
    let threads = 16;
    let barrier = Arc::new(Barrier::new(threads));

    let handles: Vec<_> = (0..threads)
        .map(|_| {
            let store = store.clone();
            let barrier = Arc::clone(&barrier);
            std::thread::spawn(move || {
                barrier.wait();
                store.try_claim(&entry_id("exe-1"), 1, 100).unwrap()
            })
        })
        .collect();

    let wins = handles
        .into_iter()
        .map(|h| h.join().unwrap())
        .filter(|o| matches!(o, ClaimOutcome::Claimed(_)))
        .count();
    assert_eq!(wins, 1);
}

#[test]
fn rejected_write_leaves_state_untouched() {
    let store = JobStore::in_memory();
    seeded(&store, &["exe-1", "exe-2"]);
    let blocked = entry_id("exe-1");
    store.fail_writes_matching(
        move |e| matches!(e, Event::QueueEntryClaimed { id, .. } if *id == blocked),
    );

    assert!(store.try_claim(&entry_id("exe-1"), 1, 10).is_err());
    assert!(matches!(store.try_claim(&entry_id("exe-2"), 1, 10).unwrap(), ClaimOutcome::Claimed(_)));
    assert_eq!(store.read(|s| s.get_entry("que-1").map(|e| e.status)), Some(QueueEntryStatus::Pending));
}

#[test]
fn update_with_no_events_commits_nothing() {
    let store = JobStore::in_memory();
    let n = store.update(|state| (vec![], state.executions.len())).unwrap();
    assert_eq!(n, 0);
}

#[test]
fn durable_store_recovers_from_wal() {
    let dir = tempdir().unwrap();
    {
        let store = JobStore::open(dir.path()).unwrap();
        seeded(&store, &["exe-1", "exe-2"]);
        store.try_claim(&entry_id("exe-1"), 7, 10).unwrap();
    }

    let store = JobStore::open(dir.path()).unwrap();
    assert!(store.execution("exe-2").is_some());
    assert_eq!(
        store.read(|s| s.get_entry("que-1").and_then(|e| e.claimed_at_ms)),
        Some(7)
    );
}

#[test]
fn checkpoint_compacts_and_recovers() {
    let dir = tempdir().unwrap();
    {
        let store = JobStore::open(dir.path()).unwrap();
        seeded(&store, &["exe-1"]);
        assert_eq!(store.checkpoint().unwrap(), Some(2));
        store.apply(vec![status_event("exe-1", ExecutionStatus::Running, 9)]).unwrap();
    }

    let wal = Wal::open(&dir.path().join(WAL_FILE)).unwrap();
    assert_eq!(wal.entries_after(0).unwrap().len(), 1);

    let store = JobStore::open(dir.path()).unwrap();
    assert_eq!(store.execution("exe-1").map(|e| e.status), Some(ExecutionStatus::Running));
}

#[test]
fn in_memory_checkpoint_is_noop() {
    assert_eq!(JobStore::in_memory().checkpoint().unwrap(), None);
}
