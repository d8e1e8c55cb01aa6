// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Reclaimer tests

use super::*;
use arq_core::test_support::{status_event, submitted_event};
use arq_core::{ErrorStage, Event, QueueEntry, QueueEntryId, QueueEntryStatus};
use arq_storage::ClaimOutcome;

const GRACE: Duration = Duration::from_secs(15 * 60);

/// Submit and claim without dispatching, as if the sweep died mid-way.
fn abandoned_claim(ctx: &TestContext) -> ExecutionId {
    let id = ctx.submit(container_job());
    let entry_id = ctx.exe(&id).entry_id.unwrap();
    let outcome =
        ctx.runtime.store().try_claim(&entry_id, ctx.clock.epoch_ms(), 10).unwrap();
    assert!(matches!(outcome, ClaimOutcome::Claimed(_)));
    id
}

#[tokio::test]
async fn abandoned_claim_is_requeued() {
    let ctx = setup();
    let id = abandoned_claim(&ctx);

    ctx.clock.advance(GRACE + Duration::from_secs(60));
    let report = ctx.runtime.reclaim().unwrap();
    assert_eq!(report.requeued, 1);

    let exe = ctx.exe(&id);
    assert_eq!(exe.status, ExecutionStatus::Queued);
    assert_eq!(exe.attempts, 1);
    let entry = ctx.runtime.store().read(|s| s.entry_for(id.as_str()).cloned()).unwrap();
    assert_eq!(entry.status, QueueEntryStatus::Pending);
    assert_eq!(entry.attempts, 1);
    assert_eq!(entry.last_error.as_deref(), Some(ABANDONED_ERROR));
    assert_eq!(ctx.queue_len(), 1);

    // The requeued job is picked up by the next sweep
    assert_eq!(ctx.runtime.sweep().await.dispatched, 1);
}

#[tokio::test]
async fn claims_inside_the_grace_window_are_left_alone() {
    let ctx = setup();
    let id = abandoned_claim(&ctx);

    ctx.clock.advance(Duration::from_secs(10 * 60));
    assert_eq!(ctx.runtime.reclaim().unwrap(), ReclaimReport::default());
    assert_eq!(ctx.exe(&id).attempts, 0);
}

#[tokio::test]
async fn reclaim_is_idempotent() {
    let ctx = setup();
    abandoned_claim(&ctx);
    ctx.clock.advance(GRACE + Duration::from_secs(1));

    assert_eq!(ctx.runtime.reclaim().unwrap().requeued, 1);
    assert_eq!(ctx.runtime.reclaim().unwrap(), ReclaimReport::default());
    assert_eq!(ctx.queue_len(), 1);
}

#[tokio::test]
async fn exhausted_budget_fails_with_service_stage() {
    let ctx = setup();
    let store = ctx.runtime.store();
    store
        .apply(vec![
            submitted_event("exe-spent"),
            Event::QueueEntryCreated {
                entry: QueueEntry::builder()
                    .id("que-spent")
                    .execution_id("exe-spent")
                    .attempts(2)
                    .build(),
            },
        ])
        .unwrap();
    store.try_claim(&QueueEntryId::from_string("que-spent"), ctx.clock.epoch_ms(), 10).unwrap();

    ctx.clock.advance(GRACE + Duration::from_secs(1));
    let report = ctx.runtime.reclaim().unwrap();
    assert_eq!(report.failed, 1);

    let exe = ctx.runtime.get("exe-spent").unwrap();
    assert_eq!(exe.status, ExecutionStatus::Failed);
    assert_eq!(exe.error_stage, Some(ErrorStage::Service));
    assert_eq!(exe.error.as_deref(), Some(ABANDONED_ERROR));
    assert_eq!(ctx.queue_len(), 0);
}

#[tokio::test]
async fn long_running_call_inside_its_window_is_not_abandoned() {
    let ctx = setup();
    let store = ctx.runtime.store();
    let mut exe = Execution::builder().id("exe-slow").provider("local-model").build();
    exe.timeout_ms = 60 * 60 * 1000;
    store
        .apply(vec![
            Event::ExecutionSubmitted { execution: Box::new(exe) },
            Event::QueueEntryCreated {
                entry: QueueEntry::builder().id("que-slow").execution_id("exe-slow").build(),
            },
        ])
        .unwrap();
    store.try_claim(&QueueEntryId::from_string("que-slow"), ctx.clock.epoch_ms(), 10).unwrap();
    store
        .apply(vec![status_event("exe-slow", ExecutionStatus::Running, ctx.clock.epoch_ms())])
        .unwrap();

    ctx.clock.advance(GRACE + Duration::from_secs(60));
    let report = ctx.runtime.reclaim().unwrap();

    assert_eq!(report.in_progress, 1);
    assert_eq!(ctx.runtime.get("exe-slow").unwrap().status, ExecutionStatus::Running);
}

#[tokio::test]
async fn claims_for_finished_executions_are_removed() {
    let ctx = setup();
    let id = abandoned_claim(&ctx);
    ctx.runtime
        .store()
        .apply(vec![status_event(id.as_str(), ExecutionStatus::Completed, ctx.clock.epoch_ms())])
        .unwrap();

    ctx.clock.advance(GRACE + Duration::from_secs(1));
    let report = ctx.runtime.reclaim().unwrap();

    assert_eq!(report.removed, 1);
    assert_eq!(ctx.status(&id), ExecutionStatus::Completed);
    assert_eq!(ctx.queue_len(), 0);
}
