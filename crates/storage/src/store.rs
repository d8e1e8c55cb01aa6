// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The job store: materialized state guarded by one lock, backed by the WAL.
//!
//! Every write goes through [`JobStore::update`], which computes events from
//! the current state, logs them, and applies them without releasing the lock.
//! That single critical section is the atomic conditional write that claims
//! and guarded status transitions are built on.

use crate::snapshot::{Snapshot, SnapshotError};
use crate::state::MaterializedState;
use crate::wal::{Wal, WalError};
use arq_core::{Event, Execution, QueueEntry, QueueEntryId, QueueEntryStatus};
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

const WAL_FILE: &str = "events.wal";
const SNAPSHOT_FILE: &str = "snapshot.zst";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("wal error: {0}")]
    Wal(#[from] WalError),
    #[error("snapshot error: {0}")]
    Snapshot(#[from] SnapshotError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result of an attempt to claim a queue entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClaimOutcome {
    Claimed(QueueEntry),
    /// Entry is gone or no longer pending
    AlreadyTaken,
    /// The in-flight count already meets the cap
    AtCapacity,
}

/// Predicate selecting writes to reject in tests
#[cfg(any(test, feature = "test-support"))]
type WriteFault = Box<dyn Fn(&Event) -> bool + Send>;

struct Inner {
    state: MaterializedState,
    wal: Option<Wal>,
    snapshot_path: Option<PathBuf>,
    #[cfg(any(test, feature = "test-support"))]
    fault: Option<WriteFault>,
}

#[derive(Clone)]
pub struct JobStore {
    inner: Arc<Mutex<Inner>>,
}

impl JobStore {
    /// Store with no persistence.
    pub fn in_memory() -> Self {
        Self::from_parts(MaterializedState::default(), None, None)
    }

    /// Open the durable store in `dir`: load the snapshot if any, then
    /// replay WAL entries recorded after it.
    pub fn open(dir: &Path) -> Result<Self, StoreError> {
        std::fs::create_dir_all(dir)?;
        let snapshot_path = dir.join(SNAPSHOT_FILE);
        let (mut state, snapshot_seq) = match Snapshot::load(&snapshot_path)? {
            Some(snapshot) => (snapshot.state, snapshot.seq),
            None => (MaterializedState::default(), 0),
        };

        let wal = Wal::open(&dir.join(WAL_FILE))?;
        let replay = wal.entries_after(snapshot_seq)?;
        for entry in &replay {
            state.apply_event(&entry.event);
        }
        tracing::info!(
            snapshot_seq,
            replayed = replay.len(),
            executions = state.executions.len(),
            queued = state.queue.len(),
            "job store recovered"
        );

        Ok(Self::from_parts(state, Some(wal), Some(snapshot_path)))
    }

    fn from_parts(state: MaterializedState, wal: Option<Wal>, snapshot_path: Option<PathBuf>) -> Self {
        let inner = Inner {
            state,
            wal,
            snapshot_path,
            #[cfg(any(test, feature = "test-support"))]
            fault: None,
        };
        Self { inner: Arc::new(Mutex::new(inner)) }
    }

    /// Reject every later write containing an event that matches `fault`,
    /// leaving state untouched.
    #[cfg(any(test, feature = "test-support"))]
    pub fn fail_writes_matching(&self, fault: impl Fn(&Event) -> bool + Send + 'static) {
        self.inner.lock().fault = Some(Box::new(fault));
    }

    /// Run `f` against the current state and commit the events it returns
    /// in the same critical section.
    pub fn update<T>(
        &self,
        f: impl FnOnce(&MaterializedState) -> (Vec<Event>, T),
    ) -> Result<T, StoreError> {
        let mut guard = self.inner.lock();
        let inner = &mut *guard;
        let (events, out) = f(&inner.state);
        if events.is_empty() {
            return Ok(out);
        }
        #[cfg(any(test, feature = "test-support"))]
        if let Some(fault) = &inner.fault {
            if events.iter().any(|e| fault(e)) {
                return Err(StoreError::Io(std::io::Error::other("injected write failure")));
            }
        }

        if let Some(wal) = inner.wal.as_mut() {
            for event in &events {
                wal.append(event)?;
            }
        }
        for event in &events {
            tracing::debug!(event = %event.log_summary(), "apply");
            inner.state.apply_event(event);
        }
        // Applied events stay buffered in the WAL if the flush fails
        if let Some(wal) = inner.wal.as_mut() {
            wal.flush()?;
        }
        Ok(out)
    }

    /// Commit events unconditionally.
    pub fn apply(&self, events: Vec<Event>) -> Result<(), StoreError> {
        self.update(|_| (events, ()))
    }

    pub fn read<T>(&self, f: impl FnOnce(&MaterializedState) -> T) -> T {
        f(&self.inner.lock().state)
    }

    /// Clone of an execution by ID or unique prefix.
    pub fn execution(&self, id: &str) -> Option<Execution> {
        self.read(|state| state.get_execution(id).cloned())
    }

    /// Claim `entry_id` if it is still pending and the in-flight count is
    /// below `max_in_flight`. Exactly one of any number of racing callers
    /// can succeed for a given entry.
    pub fn try_claim(
        &self,
        entry_id: &QueueEntryId,
        now_ms: u64,
        max_in_flight: usize,
    ) -> Result<ClaimOutcome, StoreError> {
        self.update(|state| {
            let entry = match state.get_entry(entry_id.as_str()) {
                Some(entry) if entry.is_pending() => entry,
                _ => return (vec![], ClaimOutcome::AlreadyTaken),
            };
            if state.in_flight_count() >= max_in_flight {
                return (vec![], ClaimOutcome::AtCapacity);
            }
            let mut claimed = entry.clone();
            claimed.status = QueueEntryStatus::Claimed;
            claimed.claimed_at_ms = Some(now_ms);
            (
                vec![Event::QueueEntryClaimed { id: entry_id.clone(), at_ms: now_ms }],
                ClaimOutcome::Claimed(claimed),
            )
        })
    }

    pub fn flush(&self) -> Result<(), StoreError> {
        if let Some(wal) = self.inner.lock().wal.as_mut() {
            wal.flush()?;
        }
        Ok(())
    }

    /// Write a snapshot and drop the WAL entries it covers. Returns the
    /// covered sequence, or `None` for an in-memory store.
    pub fn checkpoint(&self) -> Result<Option<u64>, StoreError> {
        let mut guard = self.inner.lock();
        let inner = &mut *guard;
        let (Some(wal), Some(path)) = (inner.wal.as_mut(), inner.snapshot_path.as_ref()) else {
            return Ok(None);
        };
        wal.flush()?;
        let seq = wal.write_seq();
        Snapshot::new(seq, inner.state.clone()).save(path)?;
        wal.truncate_before(seq + 1)?;
        tracing::info!(seq, "checkpoint written");
        Ok(Some(seq))
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
