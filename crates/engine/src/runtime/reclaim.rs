// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Reclaimer: recover entries claimed by a sweep that never finished.

use super::Runtime;
use crate::error::RuntimeError;
use arq_core::{next_attempt, Clock, ErrorStage, Event, ExecutionId, QueueEntryId};

pub const ABANDONED_ERROR: &str = "abandoned — claimed but never started";

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ReclaimReport {
    pub requeued: usize,
    pub failed: usize,
    /// Entries whose execution was gone or already terminal
    pub removed: usize,
    /// Stale claims whose execution is still inside its run window
    pub in_progress: usize,
}

enum Verdict {
    Requeued(ExecutionId, u32),
    Failed(ExecutionId),
    Removed,
    InProgress,
    /// Changed since the scan; left alone
    Skipped,
}

impl<C: Clock> Runtime<C> {
    /// Requeue or fail every entry claimed longer ago than the grace window.
    ///
    /// Each entry is re-checked inside its own store update, so running
    /// this alongside sweeps or another reclaim is harmless.
    pub fn reclaim(&self) -> Result<ReclaimReport, RuntimeError> {
        let now_ms = self.clock().epoch_ms();
        let grace_ms = self.config.reclaim_grace_ms;
        let cutoff = now_ms.saturating_sub(grace_ms);
        let stale: Vec<QueueEntryId> = self
            .store
            .read(|state| state.claimed_before(cutoff).into_iter().map(|e| e.id.clone()).collect());

        let mut report = ReclaimReport::default();
        for entry_id in stale {
            let verdict = self.store.update(|state| {
                let entry = match state.get_entry(entry_id.as_str()) {
                    Some(entry) if entry.claimed_before(cutoff) => entry,
                    _ => return (vec![], Verdict::Skipped),
                };
                let delete = Event::QueueEntryDeleted { id: entry.id.clone() };
                let exe = match state.executions.get(entry.execution_id.as_str()) {
                    Some(exe) if !exe.is_terminal() => exe,
                    _ => return (vec![delete], Verdict::Removed),
                };
                // A long synchronous call still inside its run window
                if exe.status.is_active() && exe.deadline_ms(grace_ms).is_some_and(|d| now_ms < d) {
                    return (vec![], Verdict::InProgress);
                }

                match next_attempt(entry.attempts) {
                    Some(attempts) => {
                        let retry = entry.retry(attempts, ABANDONED_ERROR, now_ms);
                        let events = vec![
                            delete,
                            Event::ExecutionRequeued {
                                id: exe.id.clone(),
                                entry_id: retry.id.clone(),
                                attempts,
                            },
                            Event::QueueEntryCreated { entry: retry },
                        ];
                        (events, Verdict::Requeued(exe.id.clone(), attempts))
                    }
                    None => {
                        let events = vec![
                            Event::ExecutionFailed {
                                id: exe.id.clone(),
                                stage: ErrorStage::Service,
                                error: ABANDONED_ERROR.to_string(),
                                at_ms: now_ms,
                            },
                            delete,
                        ];
                        (events, Verdict::Failed(exe.id.clone()))
                    }
                }
            })?;

            match verdict {
                Verdict::Requeued(id, attempts) => {
                    report.requeued += 1;
                    tracing::warn!(execution_id = %id, attempts, "abandoned claim requeued");
                    self.cancel_execution_timers(&id);
                    self.recorder.note(&id, format!("{ABANDONED_ERROR}; requeued"))?;
                }
                Verdict::Failed(id) => {
                    report.failed += 1;
                    tracing::warn!(execution_id = %id, "abandoned claim failed permanently");
                }
                Verdict::Removed => report.removed += 1,
                Verdict::InProgress => report.in_progress += 1,
                Verdict::Skipped => {}
            }
        }

        if report != ReclaimReport::default() {
            tracing::info!(
                requeued = report.requeued,
                failed = report.failed,
                removed = report.removed,
                in_progress = report.in_progress,
                "reclaim finished"
            );
        }
        Ok(report)
    }
}
