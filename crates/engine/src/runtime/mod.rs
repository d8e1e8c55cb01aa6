// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Runtime: admission, dispatch and lifecycle supervision

mod admission;
mod reclaim;
mod reconcile;
mod router;
mod submit;
mod timers;

pub use admission::SweepReport;
pub use reclaim::{ReclaimReport, ABANDONED_ERROR};
pub use submit::{CancelOutcome, CANCELLED_ERROR};

use crate::config::RuntimeConfig;
use crate::recorder::Recorder;
use crate::scheduler::Scheduler;
use arq_adapters::{ContainerPlatform, ModelClient, SandboxClient};
use arq_core::{Clock, ExecutionId, TimerId};
use arq_storage::JobStore;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Notify;

/// External collaborators the runtime drives
pub struct RuntimeDeps {
    pub store: JobStore,
    pub containers: Arc<dyn ContainerPlatform>,
    pub models: Arc<dyn ModelClient>,
    pub sandbox: Arc<dyn SandboxClient>,
}

/// Cheap to clone; clones share the store, scheduler and adapters.
#[derive(Clone)]
pub struct Runtime<C: Clock> {
    pub(crate) store: JobStore,
    pub(crate) containers: Arc<dyn ContainerPlatform>,
    pub(crate) models: Arc<dyn ModelClient>,
    pub(crate) sandbox: Arc<dyn SandboxClient>,
    pub(crate) recorder: Recorder<C>,
    pub(crate) config: Arc<RuntimeConfig>,
    scheduler: Arc<Mutex<Scheduler>>,
    timers_changed: Arc<Notify>,
    clock: C,
}

impl<C: Clock> Runtime<C> {
    pub fn new(deps: RuntimeDeps, config: RuntimeConfig, clock: C) -> Self {
        Self {
            recorder: Recorder::new(deps.store.clone(), clock.clone()),
            store: deps.store,
            containers: deps.containers,
            models: deps.models,
            sandbox: deps.sandbox,
            config: Arc::new(config),
            scheduler: Arc::new(Mutex::new(Scheduler::new())),
            timers_changed: Arc::new(Notify::new()),
            clock,
        }
    }

    pub fn store(&self) -> &JobStore {
        &self.store
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Arm (or re-arm) a timer `delay` from now.
    pub fn schedule(&self, id: TimerId, delay: Duration) {
        self.scheduler.lock().set_timer(id, delay, self.clock.now());
        self.timers_changed.notify_one();
    }

    pub fn cancel_timer(&self, id: &TimerId) {
        self.scheduler.lock().cancel_timer(id);
    }

    pub fn is_scheduled(&self, id: &TimerId) -> bool {
        self.scheduler.lock().is_set(id)
    }

    /// Drop the per-execution timers once an execution is finalized.
    pub(crate) fn cancel_execution_timers(&self, id: &ExecutionId) {
        let mut scheduler = self.scheduler.lock();
        scheduler.cancel_timer(&TimerId::log_poll(id));
        scheduler.cancel_timer(&TimerId::timeout(id));
    }

    /// Timers due now, removed from the schedule.
    pub fn take_fired_timers(&self) -> Vec<TimerId> {
        self.scheduler.lock().fired_timers(self.clock.now())
    }

    pub fn has_timers(&self) -> bool {
        self.scheduler.lock().has_timers()
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.scheduler.lock().next_deadline()
    }

    /// Resolves when a timer is armed, so a sleeping loop can recompute its
    /// next deadline.
    pub async fn timers_changed(&self) {
        self.timers_changed.notified().await;
    }
}

#[cfg(test)]
#[path = "../runtime_tests/mod.rs"]
mod tests;
