// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Startup reconciliation

use super::Runtime;
use arq_core::{backend::MANAGED_CONTAINER, Clock, Execution, ExecutionStatus, TimerId};
use std::time::Duration;

impl<C: Clock> Runtime<C> {
    /// Re-arm supervision timers for container executions that were
    /// running when the process last stopped. A timeout that already
    /// passed fires on the next tick. Returns how many were resumed.
    pub fn reconcile(&self) -> usize {
        let now_ms = self.clock().epoch_ms();
        let running: Vec<Execution> = self.store.read(|state| {
            state
                .executions_with_status(ExecutionStatus::Running)
                .into_iter()
                .filter(|e| e.provider == MANAGED_CONTAINER && e.handles.task_id.is_some())
                .cloned()
                .collect()
        });

        for exe in &running {
            let started = exe.metrics.running_at_ms.or(exe.metrics.started_at_ms).unwrap_or(now_ms);
            let remaining = started.saturating_add(exe.timeout_ms).saturating_sub(now_ms);
            self.schedule(TimerId::log_poll(&exe.id), Duration::ZERO);
            self.schedule(TimerId::timeout(&exe.id), Duration::from_millis(remaining));
            tracing::info!(execution_id = %exe.id, remaining_ms = remaining, "resumed supervision");
        }
        running.len()
    }
}
