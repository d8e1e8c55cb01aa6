// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Cancellation tests

use super::*;
use crate::error::RuntimeError;
use arq_core::ErrorStage;

#[tokio::test]
async fn cancel_then_timeout_stops_once() {
    let ctx = setup();
    let id = ctx.running_container().await;

    let outcome = ctx.runtime.cancel(id.as_str()).await.unwrap();
    assert_eq!(outcome, CancelOutcome::Cancelled);

    let exe = ctx.exe(&id);
    assert_eq!(exe.status, ExecutionStatus::Failed);
    assert_eq!(exe.error.as_deref(), Some(CANCELLED_ERROR));
    assert_eq!(exe.error_stage, Some(ErrorStage::Runtime));
    assert_eq!(ctx.containers.stop_count("task-1"), 1);

    // The timeout timer was dropped; a late delivery changes nothing
    ctx.advance(Duration::from_secs(120)).await;
    assert!(!ctx.runtime.handle_timeout(&id).await.unwrap());
    assert_eq!(ctx.containers.stop_count("task-1"), 1);
    assert_eq!(ctx.exe(&id).error.as_deref(), Some(CANCELLED_ERROR));
}

#[tokio::test]
async fn cancelling_twice_reports_terminal() {
    let ctx = setup();
    let id = ctx.running_container().await;

    ctx.runtime.cancel(id.as_str()).await.unwrap();
    let again = ctx.runtime.cancel(id.as_str()).await.unwrap();

    assert_eq!(again, CancelOutcome::AlreadyTerminal(ExecutionStatus::Failed));
    assert_eq!(ctx.containers.stop_count("task-1"), 1);
}

#[tokio::test]
async fn cancelling_a_queued_job_removes_it_from_the_queue() {
    let ctx = setup();
    let id = ctx.submit(container_job());

    ctx.runtime.cancel(id.as_str()).await.unwrap();

    assert_eq!(ctx.status(&id), ExecutionStatus::Failed);
    assert_eq!(ctx.queue_len(), 0);
    assert_eq!(ctx.runtime.sweep().await, SweepReport::default());
    assert_eq!(ctx.containers.run_count(), 0);
}

#[tokio::test]
async fn cancel_accepts_an_id_prefix() {
    let ctx = setup();
    let id = ctx.submit(container_job());
    let prefix = &id.as_str()[..10];

    assert_eq!(ctx.runtime.cancel(prefix).await.unwrap(), CancelOutcome::Cancelled);
}

#[tokio::test]
async fn cancel_of_unknown_execution_errors() {
    let ctx = setup();
    assert!(matches!(
        ctx.runtime.cancel("exe-nope").await,
        Err(RuntimeError::ExecutionNotFound(_))
    ));
}

#[tokio::test]
async fn cancelled_job_is_never_retried() {
    let ctx = setup();
    let id = ctx.running_container().await;
    ctx.runtime.cancel(id.as_str()).await.unwrap();

    ctx.runtime.sweep().await;
    ctx.runtime.reclaim().unwrap();

    let exe = ctx.exe(&id);
    assert_eq!(exe.status, ExecutionStatus::Failed);
    assert_eq!(exe.attempts, 0);
    assert_eq!(ctx.containers.run_count(), 1);
}
