// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Managed sandbox backend tests

use super::*;
use arq_core::ErrorStage;

#[tokio::test]
async fn sandbox_job_completes_under_a_fresh_session() {
    let ctx = setup();
    ctx.sandbox.reply("forty-two");
    let id = ctx.submit(sandbox_job());

    ctx.runtime.sweep().await;

    let exe = ctx.exe(&id);
    assert_eq!(exe.status, ExecutionStatus::Completed);
    assert_eq!(exe.response.as_deref(), Some("forty-two"));
    assert_eq!(exe.handles.runtime_id.as_deref(), Some("rt-1"));

    let session = exe.handles.session_id.unwrap();
    assert_eq!(session.len(), 36);
    let invocations = ctx.sandbox.invocations();
    assert_eq!(invocations.len(), 1);
    assert_eq!(invocations[0].session_id, session);
    assert_eq!(invocations[0].prompt, "what is 6*7?");
}

#[tokio::test]
async fn each_execution_gets_its_own_session() {
    let ctx = setup();
    ctx.submit(sandbox_job());
    ctx.submit(sandbox_job());

    ctx.runtime.sweep().await;

    let invocations = ctx.sandbox.invocations();
    assert_eq!(invocations.len(), 2);
    assert_ne!(invocations[0].session_id, invocations[1].session_id);
}

#[tokio::test]
async fn sandbox_error_fails_with_execution_stage() {
    let ctx = setup();
    ctx.sandbox.fail("runtime crashed");
    let id = ctx.submit(sandbox_job());

    ctx.runtime.sweep().await;

    let exe = ctx.exe(&id);
    assert_eq!(exe.status, ExecutionStatus::Failed);
    assert_eq!(exe.error_stage, Some(ErrorStage::Execution));
    assert!(exe.error.unwrap().contains("runtime crashed"));
}

#[tokio::test]
async fn status_reports_runtime_readiness() {
    let ctx = setup();

    let status = ctx.runtime.sandbox_status("http://sandbox.test", "rt-1").await.unwrap();
    assert!(status.is_ready());

    ctx.sandbox.set_state("CREATING");
    let status = ctx.runtime.sandbox_status("http://sandbox.test", "rt-1").await.unwrap();
    assert!(!status.is_ready());
}
