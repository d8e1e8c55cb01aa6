// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Container supervision: log polling, markers, timeouts

use super::*;
use crate::backends::TIMEOUT_ERROR;
use crate::config::{FAILURE_MARKER, SUCCESS_MARKER};
use arq_adapters::{ContainerCall, TaskStatus};
use arq_core::ErrorStage;

fn agent_lines(exe: &Execution, from: &[&str]) -> Vec<String> {
    exe.logs.iter().filter(|l| from.contains(&l.as_str())).cloned().collect()
}

#[tokio::test]
async fn launch_passes_the_bundle_as_environment() {
    let ctx = setup();
    let id = ctx.running_container().await;

    let env = ctx.containers.last_run_env().unwrap();
    let get = |key: &str| env.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str());
    assert_eq!(get("ARQ_EXECUTION_ID"), Some(id.as_str()));
    assert_eq!(get("ARQ_QUERY"), Some("what is 6*7?"));
    assert!(get("ARQ_AGENT_CODE").is_some());
    assert!(ctx.runtime.is_scheduled(&TimerId::log_poll(&id)));
    assert!(ctx.runtime.is_scheduled(&TimerId::timeout(&id)));
}

#[tokio::test]
async fn poll_without_marker_appends_and_reschedules() {
    let ctx = setup();
    let id = ctx.running_container().await;
    ctx.containers.push_logs("task-1", &["installing deps", "running agent"]);

    ctx.advance(Duration::from_secs(2)).await;

    let exe = ctx.exe(&id);
    assert_eq!(exe.status, ExecutionStatus::Running);
    assert_eq!(exe.log_offset, 2);
    assert_eq!(
        agent_lines(&exe, &["installing deps", "running agent"]),
        vec!["installing deps", "running agent"]
    );
    assert!(ctx.runtime.is_scheduled(&TimerId::log_poll(&id)));
}

#[tokio::test]
async fn logs_stay_ordered_across_polls() {
    let ctx = setup();
    let id = ctx.running_container().await;

    ctx.containers.push_logs("task-1", &["a", "b"]);
    ctx.advance(Duration::from_secs(2)).await;
    ctx.containers.push_logs("task-1", &["c"]);
    ctx.advance(Duration::from_secs(2)).await;
    ctx.advance(Duration::from_secs(2)).await;

    let exe = ctx.exe(&id);
    assert_eq!(agent_lines(&exe, &["a", "b", "c"]), vec!["a", "b", "c"]);
    assert_eq!(exe.log_offset, 3);
}

#[tokio::test]
async fn duplicate_poll_delivery_does_not_duplicate_lines() {
    let ctx = setup();
    let id = ctx.running_container().await;
    ctx.containers.push_logs("task-1", &["once"]);

    ctx.runtime.poll_logs(&id).await.unwrap();
    ctx.runtime.poll_logs(&id).await.unwrap();

    let exe = ctx.exe(&id);
    assert_eq!(agent_lines(&exe, &["once"]), vec!["once"]);
    assert_eq!(exe.log_offset, 1);
}

#[tokio::test]
async fn failure_marker_fails_the_execution() {
    let ctx = setup();
    let id = ctx.running_container().await;
    let marker = format!("{FAILURE_MARKER} ModuleNotFoundError: requests");
    ctx.containers.push_logs("task-1", &["starting", marker.as_str()]);

    ctx.advance(Duration::from_secs(2)).await;

    let exe = ctx.exe(&id);
    assert_eq!(exe.status, ExecutionStatus::Failed);
    assert_eq!(exe.error_stage, Some(ErrorStage::Runtime));
    assert_eq!(exe.error.as_deref(), Some("ModuleNotFoundError: requests"));
    assert!(!ctx.runtime.is_scheduled(&TimerId::log_poll(&id)));
}

#[tokio::test]
async fn stopped_task_without_marker_fails() {
    let ctx = setup();
    let id = ctx.running_container().await;
    ctx.containers.push_logs("task-1", &["Traceback (most recent call last):"]);
    ctx.containers.set_status("task-1", TaskStatus::Stopped { exit_code: Some(1) });

    ctx.advance(Duration::from_secs(2)).await;

    let exe = ctx.exe(&id);
    assert_eq!(exe.status, ExecutionStatus::Failed);
    assert_eq!(
        exe.error.as_deref(),
        Some("container exited without completion marker (exit code 1)")
    );
    assert_eq!(ctx.containers.stop_count("task-1"), 1);
}

#[tokio::test]
async fn marker_flushed_in_two_pieces_still_completes() {
    let ctx = setup();
    let id = ctx.running_container().await;

    ctx.containers.push_output("task-1", "working\n===ARQ_EXEC");
    ctx.advance(Duration::from_secs(2)).await;
    let exe = ctx.exe(&id);
    assert_eq!(exe.status, ExecutionStatus::Running);
    assert_eq!(exe.log_offset, 1);

    ctx.containers.push_output("task-1", "UTION_SUCCESS===\n");
    ctx.advance(Duration::from_secs(2)).await;

    let exe = ctx.exe(&id);
    assert_eq!(exe.status, ExecutionStatus::Completed);
    assert_eq!(agent_lines(&exe, &["working", SUCCESS_MARKER]), vec!["working", SUCCESS_MARKER]);
}

#[tokio::test]
async fn unterminated_marker_is_read_once_the_task_exits() {
    let ctx = setup();
    let id = ctx.running_container().await;
    ctx.containers.push_output("task-1", &format!("{FAILURE_MARKER} out of memory"));
    ctx.containers.set_status("task-1", TaskStatus::Stopped { exit_code: Some(1) });

    ctx.advance(Duration::from_secs(2)).await;

    let exe = ctx.exe(&id);
    assert_eq!(exe.status, ExecutionStatus::Failed);
    assert_eq!(exe.error.as_deref(), Some("out of memory"));
}

#[tokio::test]
async fn poll_errors_back_off_then_recover() {
    let ctx = setup();
    let id = ctx.running_container().await;
    ctx.containers.fail_next_log_fetch("throttled");
    ctx.containers.fail_next_log_fetch("throttled");

    ctx.advance(Duration::from_secs(2)).await;
    assert_eq!(ctx.exe(&id).poll_failures, 1);

    // Second try waits twice as long
    ctx.advance(Duration::from_secs(2)).await;
    assert_eq!(ctx.exe(&id).poll_failures, 1);
    ctx.advance(Duration::from_secs(2)).await;
    assert_eq!(ctx.exe(&id).poll_failures, 2);

    ctx.containers.push_logs("task-1", &[SUCCESS_MARKER]);
    ctx.advance(Duration::from_secs(8)).await;

    let exe = ctx.exe(&id);
    assert_eq!(exe.poll_failures, 0);
    assert_eq!(exe.status, ExecutionStatus::Completed);
}

#[tokio::test]
async fn polling_gives_up_silently_after_repeated_errors() {
    let ctx = setup();
    let id = ctx.running_container().await;
    for _ in 0..4 {
        ctx.containers.fail_next_log_fetch("log service down");
    }

    for secs in [2, 4, 8, 16] {
        ctx.advance(Duration::from_secs(secs)).await;
    }

    let exe = ctx.exe(&id);
    assert_eq!(exe.status, ExecutionStatus::Running);
    assert_eq!(exe.poll_failures, 4);
    assert!(!ctx.runtime.is_scheduled(&TimerId::log_poll(&id)));
    // Still subject to the timeout
    assert!(ctx.runtime.is_scheduled(&TimerId::timeout(&id)));

    ctx.advance(Duration::from_secs(60)).await;
    assert_eq!(ctx.exe(&id).error.as_deref(), Some(TIMEOUT_ERROR));
}

#[tokio::test]
async fn timeout_stops_the_task_once() {
    let ctx = setup();
    let id = ctx.running_container().await;

    ctx.advance(Duration::from_secs(60)).await;

    let exe = ctx.exe(&id);
    assert_eq!(exe.status, ExecutionStatus::Failed);
    assert_eq!(exe.error_stage, Some(ErrorStage::Runtime));
    assert_eq!(exe.error.as_deref(), Some(TIMEOUT_ERROR));
    assert_eq!(ctx.containers.stop_count("task-1"), 1);
    assert!(!ctx.runtime.is_scheduled(&TimerId::log_poll(&id)));

    // Redelivered timeout is a no-op
    assert!(!ctx.runtime.handle_timeout(&id).await.unwrap());
    assert_eq!(ctx.containers.stop_count("task-1"), 1);
}

#[tokio::test]
async fn timeout_after_completion_is_a_no_op() {
    let ctx = setup();
    let id = ctx.running_container().await;
    ctx.containers.push_logs("task-1", &["42", SUCCESS_MARKER]);
    ctx.advance(Duration::from_secs(2)).await;
    let stops = ctx.containers.stop_count("task-1");

    assert!(!ctx.runtime.handle_timeout(&id).await.unwrap());

    let exe = ctx.exe(&id);
    assert_eq!(exe.status, ExecutionStatus::Completed);
    assert_eq!(exe.response.as_deref(), Some("42"));
    assert_eq!(ctx.containers.stop_count("task-1"), stops);
}

#[tokio::test]
async fn poll_on_a_finished_execution_does_not_fetch() {
    let ctx = setup();
    let id = ctx.running_container().await;
    ctx.runtime.handle_timeout(&id).await.unwrap();
    let fetches_before = ctx
        .containers
        .calls()
        .iter()
        .filter(|c| matches!(c, ContainerCall::FetchLogs { .. }))
        .count();

    ctx.runtime.poll_logs(&id).await.unwrap();

    let fetches_after = ctx
        .containers
        .calls()
        .iter()
        .filter(|c| matches!(c, ContainerCall::FetchLogs { .. }))
        .count();
    assert_eq!(fetches_before, fetches_after);
}
