// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Local model backend tests

use super::*;
use arq_core::{ErrorStage, TokenUsage};

#[tokio::test]
async fn local_job_completes_with_usage() {
    let ctx = setup();
    ctx.models.reply("42", 17, 3);
    let id = ctx.submit(local_job().system_prompt("be brief"));

    let report = ctx.runtime.sweep().await;
    assert_eq!(report.dispatched, 1);

    let exe = ctx.exe(&id);
    assert_eq!(exe.status, ExecutionStatus::Completed);
    assert_eq!(exe.response.as_deref(), Some("42"));
    assert_eq!(exe.metrics.usage, Some(TokenUsage { prompt_tokens: 17, completion_tokens: 3 }));
    // No BUILDING phase
    assert_eq!(exe.metrics.build_time_ms, None);
    assert_eq!(ctx.queue_len(), 0);

    let calls = ctx.models.calls();
    assert_eq!(calls.len(), 1);
    let (endpoint, request) = &calls[0];
    assert_eq!(endpoint, "http://localhost:11434/api");
    assert_eq!(request.model, "llama3");
    assert_eq!(request.messages.len(), 2);
    assert_eq!(request.messages[0].role, "system");
    assert_eq!(request.messages[1].content, "what is 6*7?");
    assert_eq!(request.timeout, Duration::from_secs(30));
}

#[tokio::test]
async fn blank_system_prompt_is_left_out() {
    let ctx = setup();
    ctx.submit(local_job().system_prompt("  "));

    ctx.runtime.sweep().await;

    let (_, request) = &ctx.models.calls()[0];
    assert_eq!(request.messages.len(), 1);
    assert_eq!(request.messages[0].role, "user");
}

#[tokio::test]
async fn model_error_fails_with_execution_stage() {
    let ctx = setup();
    ctx.models.fail("connection refused");
    let id = ctx.submit(local_job());

    let report = ctx.runtime.sweep().await;
    assert_eq!(report.dispatched, 1);

    let exe = ctx.exe(&id);
    assert_eq!(exe.status, ExecutionStatus::Failed);
    assert_eq!(exe.error_stage, Some(ErrorStage::Execution));
    assert!(exe.error.unwrap().contains("connection refused"));
    // Backend-finalized failures are not retried
    assert_eq!(exe.attempts, 0);
    assert_eq!(ctx.queue_len(), 0);
}

#[tokio::test]
async fn local_jobs_never_touch_the_container_platform() {
    let ctx = setup();
    ctx.submit(local_job());
    ctx.runtime.sweep().await;
    assert!(ctx.containers.calls().is_empty());
}
