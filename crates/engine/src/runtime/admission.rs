// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Admission controller: claim pending entries up to the concurrency cap
//! and dispatch them.

use super::Runtime;
use crate::error::{DispatchError, RuntimeError};
use arq_core::{next_attempt, Clock, Event, QueueEntry, QueueEntryId, MAX_ATTEMPTS};
use arq_storage::ClaimOutcome;
use futures_util::future::join_all;

/// What one sweep did
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SweepReport {
    pub claimed: usize,
    pub dispatched: usize,
    pub requeued: usize,
    pub failed: usize,
    /// Candidates another sweep claimed first
    pub contended: usize,
    /// Entries whose claim or dispatch hit a store error
    pub errors: usize,
}

enum Outcome {
    Dispatched,
    Requeued,
    Failed,
    /// Execution missing or already finalized; entry dropped
    Dropped,
}

impl<C: Clock> Runtime<C> {
    /// Claim pending entries in priority-then-age order until the cap is
    /// reached, then dispatch every claimed execution concurrently.
    ///
    /// Safe to run concurrently with other sweeps: a claim only succeeds if
    /// the entry is still pending and there is room under the cap. A store
    /// error is logged against its entry and the rest of the batch goes on.
    pub async fn sweep(&self) -> SweepReport {
        let max = self.config.max_concurrent;
        let candidates: Vec<QueueEntryId> = self.store.read(|state| {
            if !state.has_pending() {
                return Vec::new();
            }
            let slots = max.saturating_sub(state.in_flight_count());
            state.pending_entries().into_iter().take(slots).map(|e| e.id.clone()).collect()
        });
        if candidates.is_empty() {
            return SweepReport::default();
        }

        let mut report = SweepReport::default();
        let mut claimed = Vec::with_capacity(candidates.len());
        for entry_id in &candidates {
            match self.store.try_claim(entry_id, self.clock().epoch_ms(), max) {
                Ok(ClaimOutcome::Claimed(entry)) => claimed.push(entry),
                Ok(ClaimOutcome::AlreadyTaken) => report.contended += 1,
                Ok(ClaimOutcome::AtCapacity) => break,
                Err(e) => {
                    tracing::warn!(entry_id = %entry_id, error = %e, "claim failed");
                    report.errors += 1;
                }
            }
        }
        report.claimed = claimed.len();

        let outcomes = join_all(claimed.iter().map(|entry| self.process_claimed(entry))).await;
        for (entry, outcome) in claimed.iter().zip(outcomes) {
            match outcome {
                Ok(Outcome::Dispatched) => report.dispatched += 1,
                Ok(Outcome::Requeued) => report.requeued += 1,
                Ok(Outcome::Failed) => report.failed += 1,
                Ok(Outcome::Dropped) => {}
                Err(e) => {
                    // Claimed entries left behind here are picked up by the reclaimer
                    tracing::warn!(
                        execution_id = %entry.execution_id,
                        entry_id = %entry.id,
                        error = %e,
                        "admission failed"
                    );
                    report.errors += 1;
                }
            }
        }

        tracing::info!(
            claimed = report.claimed,
            dispatched = report.dispatched,
            requeued = report.requeued,
            failed = report.failed,
            contended = report.contended,
            errors = report.errors,
            "sweep finished"
        );
        report
    }

    async fn process_claimed(&self, entry: &QueueEntry) -> Result<Outcome, RuntimeError> {
        let exe = match self.store.execution(entry.execution_id.as_str()) {
            Some(exe) if !exe.is_terminal() => exe,
            _ => {
                self.store.apply(vec![Event::QueueEntryDeleted { id: entry.id.clone() }])?;
                return Ok(Outcome::Dropped);
            }
        };

        match self.dispatch(&exe).await {
            Ok(()) => {
                self.store.apply(vec![Event::QueueEntryDeleted { id: entry.id.clone() }])?;
                Ok(Outcome::Dispatched)
            }
            Err(e) => self.record_dispatch_failure(entry, e),
        }
    }

    /// Finalize a failed dispatch and, if it is retryable and budget
    /// remains, queue a fresh attempt. All in one store update.
    fn record_dispatch_failure(
        &self,
        entry: &QueueEntry,
        error: DispatchError,
    ) -> Result<Outcome, RuntimeError> {
        let now_ms = self.clock().epoch_ms();
        let id = entry.execution_id.clone();
        let outcome = self.store.update(|state| {
            let mut events = vec![Event::QueueEntryDeleted { id: entry.id.clone() }];
            match state.executions.get(id.as_str()) {
                Some(exe) if !exe.is_terminal() => {}
                _ => return (events, Outcome::Dropped),
            }
            events.push(Event::ExecutionFailed {
                id: id.clone(),
                stage: error.stage,
                error: error.message.clone(),
                at_ms: now_ms,
            });
            match next_attempt(entry.attempts).filter(|_| error.retryable) {
                Some(attempts) => {
                    let retry = entry.retry(attempts, error.message.clone(), now_ms);
                    events.push(Event::ExecutionRequeued {
                        id: id.clone(),
                        entry_id: retry.id.clone(),
                        attempts,
                    });
                    events.push(Event::QueueEntryCreated { entry: retry });
                    (events, Outcome::Requeued)
                }
                None => (events, Outcome::Failed),
            }
        })?;

        match outcome {
            Outcome::Requeued => {
                tracing::info!(
                    execution_id = %id,
                    stage = %error.stage,
                    error = %error.message,
                    "dispatch failed, requeued"
                );
                self.recorder.note(
                    &id,
                    format!("attempt {} failed: {}; retrying", entry.attempts + 1, error.message),
                )?;
            }
            Outcome::Failed => {
                tracing::warn!(
                    execution_id = %id,
                    stage = %error.stage,
                    error = %error.message,
                    attempts = entry.attempts + 1,
                    max_attempts = MAX_ATTEMPTS,
                    "dispatch failed permanently"
                );
            }
            Outcome::Dispatched | Outcome::Dropped => {}
        }
        Ok(outcome)
    }
}
