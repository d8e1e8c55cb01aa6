// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Periodic triggers and startup reconciliation

use super::*;
use crate::backends::TIMEOUT_ERROR;
use arq_adapters::ContainerCall;
use arq_core::test_support::{status_event, submitted_event};
use arq_core::{BackendHandles, Event};

#[tokio::test]
async fn periodic_sweep_dispatches_and_rearms() {
    let ctx = setup();
    let id = ctx.submit(container_job());

    ctx.runtime.arm_periodic();
    ctx.fire().await;

    assert_eq!(ctx.status(&id), ExecutionStatus::Running);
    assert!(ctx.runtime.is_scheduled(&TimerId::sweep()));
    assert!(ctx.runtime.is_scheduled(&TimerId::reclaim()));
    assert!(ctx.runtime.is_scheduled(&TimerId::checkpoint()));

    // Submissions after startup are picked up on the next interval
    let later = ctx.submit(container_job());
    ctx.advance(Duration::from_secs(5)).await;
    assert_eq!(ctx.status(&later), ExecutionStatus::Running);
}

#[tokio::test]
async fn unknown_timer_is_ignored() {
    let ctx = setup();
    ctx.runtime.handle_timer(TimerId::from_string("bogus")).await.unwrap();
}

#[tokio::test]
async fn checkpoint_on_an_in_memory_store_is_harmless() {
    let ctx = setup();
    ctx.runtime.handle_timer(TimerId::checkpoint()).await.unwrap();
    assert!(ctx.runtime.is_scheduled(&TimerId::checkpoint()));
}

/// A RUNNING container execution as recovered from disk after a restart.
fn recovered_running(ctx: &TestContext, id: &str, running_at_ms: u64) -> ExecutionId {
    ctx.runtime
        .store()
        .apply(vec![
            submitted_event(id),
            status_event(id, ExecutionStatus::Running, running_at_ms),
            Event::ExecutionBackendAttached {
                id: ExecutionId::from_string(id),
                handles: BackendHandles {
                    task_id: Some("task-9".to_string()),
                    ..Default::default()
                },
                cpu_units: None,
                memory_mb: None,
            },
        ])
        .unwrap();
    ExecutionId::from_string(id)
}

#[tokio::test]
async fn reconcile_resumes_polling_for_running_containers() {
    let ctx = setup();
    let id = recovered_running(&ctx, "exe-resume", ctx.clock.epoch_ms());
    ctx.containers.set_status("task-9", arq_adapters::TaskStatus::Running);

    assert_eq!(ctx.runtime.reconcile(), 1);
    ctx.fire().await;

    assert!(ctx
        .containers
        .calls()
        .iter()
        .any(|c| matches!(c, ContainerCall::FetchLogs { task_id, .. } if task_id == "task-9")));
    assert_eq!(ctx.status(&id), ExecutionStatus::Running);
    assert!(ctx.runtime.is_scheduled(&TimerId::timeout(&id)));
}

#[tokio::test]
async fn reconcile_fires_expired_timeouts_immediately() {
    let ctx = setup();
    let running_at = ctx.clock.epoch_ms();
    // The builder's default timeout is 60s
    ctx.clock.advance(Duration::from_secs(120));
    let id = recovered_running(&ctx, "exe-late", running_at);
    ctx.containers.set_status("task-9", arq_adapters::TaskStatus::Running);

    ctx.runtime.reconcile();
    ctx.fire().await;

    let exe = ctx.exe(&id);
    assert_eq!(exe.status, ExecutionStatus::Failed);
    assert_eq!(exe.error.as_deref(), Some(TIMEOUT_ERROR));
    assert_eq!(ctx.containers.stop_count("task-9"), 1);
}

#[tokio::test]
async fn reconcile_ignores_other_backends_and_finished_runs() {
    let ctx = setup();
    ctx.models.reply("done", 1, 1);
    ctx.submit(local_job());
    ctx.runtime.sweep().await;

    assert_eq!(ctx.runtime.reconcile(), 0);
    assert!(!ctx.runtime.has_timers());
}
