// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn request(name: &str) -> TaskRequest {
    TaskRequest {
        name: name.to_string(),
        image: "arq-runner:latest".to_string(),
        cluster: "default".to_string(),
        task_definition: "arq-agent".to_string(),
        network: None,
        cpu_units: 256,
        memory_mb: 512,
        env: vec![("ARQ_QUERY".to_string(), "hi".to_string())],
        tags: vec![],
        log_group: "arq".to_string(),
    }
}

#[yare::parameterized(
    from_start = { 0, vec!["a", "b", "c"] },
    middle = { 2, vec!["c"] },
    past_end = { 5, vec![] },
)]
fn lines_after_skips_offset(offset: u64, expected: Vec<&str>) {
    assert_eq!(lines_after("a\nb\nc\n", offset, false), expected);
}

#[yare::parameterized(
    running_holds_tail = { "working\n===ARQ_EXEC", false, vec!["working"] },
    exited_keeps_tail = { "working\n===ARQ_EXEC", true, vec!["working", "===ARQ_EXEC"] },
    no_newline_yet = { "partial", false, vec![] },
    crlf = { "a\r\nb\r\n", false, vec!["a", "b"] },
)]
fn complete_lines_hold_back_the_tail(output: &str, exited: bool, expected: Vec<&str>) {
    assert_eq!(complete_lines(output, exited), expected);
}

#[test]
fn line_split_across_fetches_is_delivered_whole() {
    let first = lines_after("working\n===ARQ_EXEC", 0, false);
    assert_eq!(first, vec!["working"]);

    let second = lines_after("working\n===ARQ_EXECUTION_SUCCESS===\n", first.len() as u64, false);
    assert_eq!(second, vec!["===ARQ_EXECUTION_SUCCESS==="]);
}

#[tokio::test]
async fn fake_launch_failures_are_consumed_in_order() {
    let fake = FakeContainerPlatform::new();
    fake.fail_next_launch("no capacity");

    let err = fake.run_task(&request("t1")).await.unwrap_err();
    assert!(matches!(err, ContainerError::LaunchFailed(ref m) if m == "no capacity"));

    let handle = fake.run_task(&request("t2")).await.unwrap();
    assert_eq!(handle.task_id, "task-1");
    assert_eq!(handle.log_stream, "t2");
    assert_eq!(fake.run_count(), 2);
    assert_eq!(fake.last_run_env().unwrap()[0].0, "ARQ_QUERY");
}

#[tokio::test]
async fn fake_logs_honor_offset_and_stop_records_call() {
    let fake = FakeContainerPlatform::new();
    let handle = fake.run_task(&request("t1")).await.unwrap();
    fake.push_logs(&handle.task_id, &["one", "two", "three"]);

    assert_eq!(fake.fetch_logs(&handle, 1, false).await.unwrap(), vec!["two", "three"]);
    assert_eq!(fake.describe_task(&handle).await.unwrap(), TaskStatus::Running);

    fake.stop_task(&handle, "timeout").await.unwrap();
    assert_eq!(fake.stop_count(&handle.task_id), 1);
    assert_eq!(
        fake.describe_task(&handle).await.unwrap(),
        TaskStatus::Stopped { exit_code: Some(137) }
    );
}

#[tokio::test]
async fn fake_holds_back_partial_output_until_exit() {
    let fake = FakeContainerPlatform::new();
    let handle = fake.run_task(&request("t1")).await.unwrap();
    fake.push_output(&handle.task_id, "done\nbye");

    assert_eq!(fake.fetch_logs(&handle, 0, false).await.unwrap(), vec!["done"]);
    assert_eq!(fake.fetch_logs(&handle, 1, true).await.unwrap(), vec!["bye"]);
}
