// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn request() -> TaskRequest {
    TaskRequest {
        name: "arq-exe-1".to_string(),
        image: "arq-runner:latest".to_string(),
        cluster: String::new(),
        task_definition: "arq-agent".to_string(),
        network: Some("sandbox".to_string()),
        cpu_units: 512,
        memory_mb: 1024,
        env: vec![("ARQ_EXECUTION_ID".to_string(), "exe-1".to_string())],
        tags: vec![("execution".to_string(), "exe-1".to_string())],
        log_group: "arq".to_string(),
    }
}

#[test]
fn run_args_carry_resources_env_and_labels() {
    let args = run_args(&request());
    let joined = args.join(" ");

    assert!(joined.starts_with("run -d --name arq-exe-1"));
    assert!(joined.contains("--label arq.task-definition=arq-agent"));
    assert!(joined.contains("--label execution=exe-1"));
    assert!(joined.contains("--cpus 0.50"));
    assert!(joined.contains("--memory 1024m"));
    assert!(joined.contains("--network sandbox"));
    assert!(joined.contains("-e ARQ_EXECUTION_ID=exe-1"));
    assert_eq!(args.last().map(String::as_str), Some("arq-runner:latest"));
    assert!(!args.iter().any(|a| a == "--rm"));
}

#[test]
fn run_args_omit_unset_limits() {
    let mut req = request();
    req.cpu_units = 0;
    req.memory_mb = 0;
    req.network = None;
    let args = run_args(&req);
    assert!(!args.iter().any(|a| a == "--cpus" || a == "--memory" || a == "--network"));
}

#[yare::parameterized(
    running = { "running 0", TaskStatus::Running },
    created = { "created 0", TaskStatus::Pending },
    exited_ok = { "exited 0", TaskStatus::Stopped { exit_code: Some(0) } },
    exited_err = { "exited 137", TaskStatus::Stopped { exit_code: Some(137) } },
    dead_no_code = { "dead", TaskStatus::Stopped { exit_code: None } },
    empty = { "", TaskStatus::Missing },
)]
fn inspect_parsing(output: &str, expected: TaskStatus) {
    assert_eq!(parse_inspect(output), expected);
}

#[test]
fn missing_container_detection() {
    assert!(is_missing("Error: No such container: abc"));
    assert!(!is_missing("permission denied"));
}

#[test]
fn logs_interleave_stdout_and_stderr_by_time() {
    let stdout = "2026-01-05T10:00:00.000000001Z loading model\n\
                  2026-01-05T10:00:00.000000003Z answer: 42\n";
    let stderr = "2026-01-05T10:00:00.000000002Z WARNING slow tokenizer\n\
                  2026-01-05T10:00:00.000000004Z ===ARQ_EXECUTION_FAILED=== boom\n";

    assert_eq!(
        merge_streams(stdout, stderr, false),
        vec![
            "loading model",
            "WARNING slow tokenizer",
            "answer: 42",
            "===ARQ_EXECUTION_FAILED=== boom"
        ]
    );
}

#[test]
fn stderr_only_output_is_kept() {
    let stderr = "2026-01-05T10:00:00.000000001Z Traceback (most recent call last):\n";
    assert_eq!(merge_streams("", stderr, false), vec!["Traceback (most recent call last):"]);
}

#[test]
fn unterminated_stream_tail_waits_for_exit() {
    let stdout = "2026-01-05T10:00:00.000000001Z working\n\
                  2026-01-05T10:00:00.000000002Z ===ARQ_EXEC";

    assert_eq!(merge_streams(stdout, "", false), vec!["working"]);
    assert_eq!(merge_streams(stdout, "", true), vec!["working", "===ARQ_EXEC"]);
}

#[test]
fn line_without_timestamp_follows_its_predecessor() {
    let stdout = "2026-01-05T10:00:00.000000001Z a\ncontinued\n";
    let stderr = "2026-01-05T10:00:00.000000002Z b\n";
    assert_eq!(merge_streams(stdout, stderr, false), vec!["a", "continued", "b"]);
}
