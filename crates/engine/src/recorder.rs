// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Lifecycle recorder: the only writer of execution outcome fields.
//!
//! Every write is a guarded transition evaluated under the store lock, so a
//! late or duplicate callback (a poll tick after a timeout, an HTTP reply
//! after a cancel) is dropped instead of overwriting a terminal record.
//! Each method returns whether its write took effect.

use crate::error::RuntimeError;
use arq_core::{
    BackendHandles, Clock, ErrorStage, Event, ExecutionId, ExecutionStatus, TokenUsage,
};
use arq_storage::JobStore;

#[derive(Clone)]
pub struct Recorder<C: Clock> {
    store: JobStore,
    clock: C,
}

impl<C: Clock> Recorder<C> {
    pub fn new(store: JobStore, clock: C) -> Self {
        Self { store, clock }
    }

    /// Move an execution forward. Backwards moves and moves out of a
    /// terminal status are ignored.
    pub fn update_status(
        &self,
        id: &ExecutionId,
        status: ExecutionStatus,
    ) -> Result<bool, RuntimeError> {
        let at_ms = self.clock.epoch_ms();
        Ok(self.store.update(|state| match state.executions.get(id.as_str()) {
            Some(exe) if exe.status.can_advance_to(status) => (
                vec![Event::ExecutionStatusChanged { id: id.clone(), status, at_ms }],
                true,
            ),
            _ => (vec![], false),
        })?)
    }

    /// Append progress lines. With `source_offset`, the append only lands
    /// if it continues exactly where the previous one stopped.
    pub fn append_logs(
        &self,
        id: &ExecutionId,
        lines: Vec<String>,
        source_offset: Option<u64>,
    ) -> Result<bool, RuntimeError> {
        if lines.is_empty() {
            return Ok(false);
        }
        let at_ms = self.clock.epoch_ms();
        Ok(self.store.update(|state| {
            let Some(exe) = state.executions.get(id.as_str()) else {
                return (vec![], false);
            };
            if source_offset.is_some_and(|offset| offset != exe.log_offset) {
                return (vec![], false);
            }
            (vec![Event::LogsAppended { id: id.clone(), lines, source_offset, at_ms }], true)
        })?)
    }

    /// Convenience for a single engine-authored progress line.
    pub fn note(&self, id: &ExecutionId, line: impl Into<String>) -> Result<bool, RuntimeError> {
        self.append_logs(id, vec![line.into()], None)
    }

    pub fn attach_backend(
        &self,
        id: &ExecutionId,
        handles: BackendHandles,
        cpu_units: Option<u32>,
        memory_mb: Option<u32>,
    ) -> Result<bool, RuntimeError> {
        Ok(self.store.update(|state| match state.executions.get(id.as_str()) {
            Some(exe) if !exe.is_terminal() => (
                vec![Event::ExecutionBackendAttached {
                    id: id.clone(),
                    handles,
                    cpu_units,
                    memory_mb,
                }],
                true,
            ),
            _ => (vec![], false),
        })?)
    }

    /// Finalize as COMPLETED unless already terminal.
    pub fn complete(
        &self,
        id: &ExecutionId,
        response: Option<String>,
        usage: Option<TokenUsage>,
    ) -> Result<bool, RuntimeError> {
        let at_ms = self.clock.epoch_ms();
        let done = self.store.update(|state| match state.executions.get(id.as_str()) {
            Some(exe) if !exe.is_terminal() => (
                vec![Event::ExecutionCompleted { id: id.clone(), response, usage, at_ms }],
                true,
            ),
            _ => (vec![], false),
        })?;
        if done {
            tracing::info!(execution_id = %id, "execution completed");
        }
        Ok(done)
    }

    /// Finalize as FAILED unless already terminal.
    pub fn fail(
        &self,
        id: &ExecutionId,
        stage: ErrorStage,
        error: impl Into<String>,
    ) -> Result<bool, RuntimeError> {
        let error = error.into();
        let at_ms = self.clock.epoch_ms();
        let done = self.store.update(|state| match state.executions.get(id.as_str()) {
            Some(exe) if !exe.is_terminal() => (
                vec![Event::ExecutionFailed {
                    id: id.clone(),
                    stage,
                    error: error.clone(),
                    at_ms,
                }],
                true,
            ),
            _ => (vec![], false),
        })?;
        if done {
            tracing::info!(execution_id = %id, %stage, error = %error, "execution failed");
        }
        Ok(done)
    }

    pub fn set_poll_failures(&self, id: &ExecutionId, count: u32) -> Result<(), RuntimeError> {
        self.store.update(|state| match state.executions.get(id.as_str()) {
            Some(exe) if exe.poll_failures != count => {
                (vec![Event::PollFailuresSet { id: id.clone(), count }], ())
            }
            _ => (vec![], ()),
        })?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "recorder_tests.rs"]
mod tests;
