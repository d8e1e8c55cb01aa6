// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Submission, cancellation and lookups

use super::Runtime;
use crate::backends::container::task_handle;
use crate::error::RuntimeError;
use arq_core::{
    Clock, ErrorStage, Event, Execution, ExecutionId, ExecutionStatus, QueueEntry, Submission,
};

pub const CANCELLED_ERROR: &str = "cancelled by user";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CancelOutcome {
    Cancelled,
    AlreadyTerminal(ExecutionStatus),
}

enum Lookup {
    Missing,
    Terminal(ExecutionStatus),
    Live(Box<Execution>),
}

impl<C: Clock> Runtime<C> {
    /// Record a new QUEUED execution and its pending queue entry.
    pub fn submit(&self, submission: Submission) -> Result<Execution, RuntimeError> {
        if submission.agent_id.trim().is_empty() {
            return Err(RuntimeError::InvalidRequest("agent_id is required".into()));
        }
        if submission.timeout_ms == 0 {
            return Err(RuntimeError::InvalidRequest("timeout_ms must be positive".into()));
        }

        let now_ms = self.clock().epoch_ms();
        let mut execution = Execution::from_submission(ExecutionId::new(), &submission, now_ms);
        let entry = QueueEntry::new(execution.id.clone(), submission.priority, now_ms);
        execution.entry_id = Some(entry.id.clone());

        self.store.apply(vec![
            Event::ExecutionSubmitted { execution: Box::new(execution.clone()) },
            Event::QueueEntryCreated { entry },
        ])?;
        tracing::info!(
            execution_id = %execution.id,
            provider = %execution.provider,
            priority = submission.priority,
            "execution submitted"
        );
        Ok(execution)
    }

    /// Finalize a live execution as FAILED "cancelled by user".
    ///
    /// A still-pending entry is removed so the job is never dispatched; a
    /// running container task is asked to stop exactly once.
    pub async fn cancel(&self, id: &str) -> Result<CancelOutcome, RuntimeError> {
        let at_ms = self.clock().epoch_ms();
        let lookup = self.store.update(|state| {
            let Some(exe) = state.get_execution(id) else {
                return (vec![], Lookup::Missing);
            };
            if exe.is_terminal() {
                return (vec![], Lookup::Terminal(exe.status));
            }
            let mut events = vec![Event::ExecutionFailed {
                id: exe.id.clone(),
                stage: ErrorStage::Runtime,
                error: CANCELLED_ERROR.to_string(),
                at_ms,
            }];
            if let Some(entry) = state.entry_for(exe.id.as_str()).filter(|e| e.is_pending()) {
                events.push(Event::QueueEntryDeleted { id: entry.id.clone() });
            }
            (events, Lookup::Live(Box::new(exe.clone())))
        })?;

        let exe = match lookup {
            Lookup::Missing => return Err(RuntimeError::ExecutionNotFound(id.to_string())),
            Lookup::Terminal(status) => return Ok(CancelOutcome::AlreadyTerminal(status)),
            Lookup::Live(exe) => exe,
        };

        tracing::info!(execution_id = %exe.id, status = %exe.status, "execution cancelled");
        self.cancel_execution_timers(&exe.id);
        self.recorder.note(&exe.id, "execution cancelled by user")?;
        if let Some(handle) = task_handle(&exe) {
            self.stop_task(&handle, CANCELLED_ERROR).await;
        }
        Ok(CancelOutcome::Cancelled)
    }

    /// Look up an execution by id or unique prefix.
    pub fn get(&self, id: &str) -> Option<Execution> {
        self.store.execution(id)
    }

    /// All executions, oldest submission first.
    pub fn list(&self) -> Vec<Execution> {
        let mut all: Vec<Execution> =
            self.store.read(|state| state.executions.values().cloned().collect());
        all.sort_by(|a, b| {
            (a.metrics.submitted_at_ms, a.id.as_str()).cmp(&(b.metrics.submitted_at_ms, b.id.as_str()))
        });
        all
    }
}
