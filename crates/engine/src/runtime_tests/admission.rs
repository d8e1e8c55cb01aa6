// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Admission controller tests

use super::*;
use crate::config::SUCCESS_MARKER;
use crate::error::RuntimeError;
use arq_core::{ErrorStage, Event, QueueEntryStatus};

#[tokio::test]
async fn sweep_with_empty_queue_does_nothing() {
    let ctx = setup();
    assert_eq!(ctx.runtime.sweep().await, SweepReport::default());
}

#[tokio::test]
async fn container_job_runs_to_completion() {
    let ctx = setup();
    let id = ctx.submit(container_job());

    let report = ctx.runtime.sweep().await;
    assert_eq!(report.claimed, 1);
    assert_eq!(report.dispatched, 1);

    let exe = ctx.exe(&id);
    assert_eq!(exe.status, ExecutionStatus::Running);
    assert_eq!(exe.handles.task_id.as_deref(), Some("task-1"));
    assert_eq!(exe.metrics.memory_mb, Some(2048));
    assert!(exe.metrics.build_time_ms.is_some());
    assert_eq!(ctx.queue_len(), 0);

    ctx.containers.push_logs("task-1", &["hello", "world", SUCCESS_MARKER]);
    ctx.advance(Duration::from_secs(2)).await;

    let exe = ctx.exe(&id);
    assert_eq!(exe.status, ExecutionStatus::Completed);
    assert_eq!(exe.response.as_deref(), Some("hello\nworld"));
    assert!(exe.logs.iter().any(|l| l == "hello"));
    assert!(!ctx.runtime.is_scheduled(&TimerId::timeout(&id)));
    assert!(!ctx.runtime.is_scheduled(&TimerId::log_poll(&id)));
}

#[tokio::test]
async fn sweep_stops_at_the_concurrency_cap() {
    let ctx = setup();
    let ids: Vec<ExecutionId> = (0..12).map(|_| ctx.submit(container_job())).collect();

    let report = ctx.runtime.sweep().await;
    assert_eq!(report.claimed, 10);

    let running = ids.iter().filter(|id| ctx.status(id) == ExecutionStatus::Running).count();
    assert_eq!(running, 10);
    let pending = ctx.runtime.store().read(|s| s.pending_entries().len());
    assert_eq!(pending, 2);

    // No capacity left
    assert_eq!(ctx.runtime.sweep().await.claimed, 0);

    // Freeing one slot admits exactly one more
    ctx.runtime.cancel(ids[0].as_str()).await.unwrap();
    assert_eq!(ctx.runtime.sweep().await.claimed, 1);
}

#[tokio::test]
async fn higher_priority_is_claimed_first_then_oldest() {
    let ctx = setup_with(RuntimeConfig { max_concurrent: 1, ..Default::default() });
    let first_low = ctx.submit(container_job().priority(2));
    ctx.clock.advance(Duration::from_millis(5));
    let second_low = ctx.submit(container_job().priority(2));
    ctx.clock.advance(Duration::from_millis(5));
    let urgent = ctx.submit(container_job().priority(1));

    let mut order = Vec::new();
    for _ in 0..3 {
        ctx.runtime.sweep().await;
        let running = [&first_low, &second_low, &urgent]
            .into_iter()
            .find(|id| ctx.status(id) == ExecutionStatus::Running)
            .cloned()
            .unwrap();
        ctx.runtime.cancel(running.as_str()).await.unwrap();
        order.push(running);
    }

    assert_eq!(order, vec![urgent, first_low, second_low]);
}

#[tokio::test]
async fn launch_failures_retry_until_the_budget_is_spent() {
    let ctx = setup();
    ctx.containers.fail_next_launch("capacity 1");
    ctx.containers.fail_next_launch("capacity 2");
    ctx.containers.fail_next_launch("capacity 3");
    let id = ctx.submit(container_job());

    let report = ctx.runtime.sweep().await;
    assert_eq!(report.requeued, 1);
    let exe = ctx.exe(&id);
    assert_eq!(exe.status, ExecutionStatus::Queued);
    assert_eq!(exe.attempts, 1);
    let entry = ctx.runtime.store().read(|s| s.entry_for(id.as_str()).cloned()).unwrap();
    assert_eq!(entry.status, QueueEntryStatus::Pending);
    assert_eq!(entry.last_error.as_deref(), Some("launch failed: capacity 1"));

    assert_eq!(ctx.runtime.sweep().await.requeued, 1);
    assert_eq!(ctx.exe(&id).attempts, 2);

    let report = ctx.runtime.sweep().await;
    assert_eq!(report.failed, 1);
    let exe = ctx.exe(&id);
    assert_eq!(exe.status, ExecutionStatus::Failed);
    assert_eq!(exe.error_stage, Some(ErrorStage::Build));
    assert_eq!(exe.error.as_deref(), Some("launch failed: capacity 3"));
    assert!(exe.attempts <= 3);
    assert_eq!(ctx.queue_len(), 0);
    assert_eq!(ctx.containers.run_count(), 3);

    // Nothing left to retry
    assert_eq!(ctx.runtime.sweep().await, SweepReport::default());
}

#[tokio::test]
async fn retry_after_launch_failure_succeeds() {
    let ctx = setup();
    ctx.containers.fail_next_launch("image pull backoff");
    let id = ctx.submit(container_job());

    ctx.runtime.sweep().await;
    ctx.runtime.sweep().await;

    let exe = ctx.exe(&id);
    assert_eq!(exe.status, ExecutionStatus::Running);
    assert_eq!(exe.error, None);
    assert_eq!(exe.attempts, 1);
    assert!(exe.logs.iter().any(|l| l.contains("image pull backoff")));
}

#[tokio::test]
async fn unknown_provider_fails_without_retry() {
    let ctx = setup();
    let id = ctx.submit(Submission::new("agent-1", "quantum-annealer").query("hi"));

    let report = ctx.runtime.sweep().await;
    assert_eq!(report.failed, 1);

    let exe = ctx.exe(&id);
    assert_eq!(exe.status, ExecutionStatus::Failed);
    assert_eq!(exe.error_stage, Some(ErrorStage::Service));
    assert!(exe.error.unwrap().contains("quantum-annealer"));
    assert_eq!(ctx.queue_len(), 0);
}

#[tokio::test]
async fn malformed_provider_config_fails_without_retry() {
    let ctx = setup();
    // local-model requires a model name
    let id = ctx.submit(Submission::new("agent-1", "local-model").query("hi"));

    assert_eq!(ctx.runtime.sweep().await.failed, 1);
    assert_eq!(ctx.exe(&id).error_stage, Some(ErrorStage::Service));
    assert_eq!(ctx.models.calls().len(), 0);
}

#[tokio::test]
async fn claim_error_skips_only_that_entry() {
    let ctx = setup();
    let blocked = ctx.submit(container_job());
    let other = ctx.submit(container_job());
    let blocked_entry = ctx.runtime.store().read(|s| {
        s.queue.values().find(|e| e.execution_id == blocked).map(|e| e.id.clone()).unwrap()
    });
    ctx.runtime.store().fail_writes_matching(
        move |e| matches!(e, Event::QueueEntryClaimed { id, .. } if *id == blocked_entry),
    );

    let report = ctx.runtime.sweep().await;

    assert_eq!(report.errors, 1);
    assert_eq!(report.claimed, 1);
    assert_eq!(report.dispatched, 1);
    assert_eq!(ctx.status(&other), ExecutionStatus::Running);
    assert_eq!(ctx.status(&blocked), ExecutionStatus::Queued);
}

#[tokio::test]
async fn dispatch_store_error_is_isolated_to_its_execution() {
    let ctx = setup();
    let blocked = ctx.submit(container_job());
    let other = ctx.submit(container_job());
    let target = blocked.clone();
    ctx.runtime.store().fail_writes_matching(move |e| match e {
        Event::ExecutionStatusChanged { id, .. } | Event::ExecutionFailed { id, .. } => {
            *id == target
        }
        _ => false,
    });

    let report = ctx.runtime.sweep().await;

    assert_eq!(report.claimed, 2);
    assert_eq!(report.errors, 1);
    assert_eq!(report.dispatched, 1);
    assert_eq!(ctx.status(&other), ExecutionStatus::Running);
    assert_eq!(ctx.status(&blocked), ExecutionStatus::Queued);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn racing_sweeps_claim_an_entry_once() {
    let ctx = setup();
    let id = ctx.submit(container_job());

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let runtime = ctx.runtime.clone();
            tokio::spawn(async move { runtime.sweep().await })
        })
        .collect();
    let mut claimed = 0;
    for handle in handles {
        claimed += handle.await.unwrap().claimed;
    }

    assert_eq!(claimed, 1);
    assert_eq!(ctx.containers.run_count(), 1);
    assert_eq!(ctx.status(&id), ExecutionStatus::Running);
}

#[tokio::test]
async fn submit_rejects_invalid_input() {
    let ctx = setup();
    assert!(matches!(
        ctx.runtime.submit(container_job().timeout_ms(0)),
        Err(RuntimeError::InvalidRequest(_))
    ));
    assert!(matches!(
        ctx.runtime.submit(Submission::new(" ", "local-model")),
        Err(RuntimeError::InvalidRequest(_))
    ));
    assert_eq!(ctx.queue_len(), 0);
}

#[tokio::test]
async fn submit_records_a_queued_execution_and_pending_entry() {
    let ctx = setup();
    let exe = ctx.runtime.submit(container_job().priority(3)).unwrap();

    assert_eq!(exe.status, ExecutionStatus::Queued);
    assert_eq!(exe.metrics.submitted_at_ms, 1_000_000);
    let entry = ctx.runtime.store().read(|s| s.entry_for(exe.id.as_str()).cloned()).unwrap();
    assert_eq!(entry.priority, 3);
    assert_eq!(entry.attempts, 0);
    assert_eq!(exe.entry_id, Some(entry.id));
}
