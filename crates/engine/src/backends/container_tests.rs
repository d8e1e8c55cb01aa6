// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::config::{FAILURE_MARKER, SUCCESS_MARKER};
use arq_core::AgentBundle;
use yare::parameterized;

fn lines(raw: &[&str]) -> Vec<String> {
    raw.iter().map(|s| s.to_string()).collect()
}

#[test]
fn success_marker_returns_preceding_lines() {
    let batch = lines(&["thinking", "the answer is 42", SUCCESS_MARKER, "trailing"]);
    assert_eq!(
        scan_markers(&batch, SUCCESS_MARKER, FAILURE_MARKER),
        Some(Completion::Succeeded { response: "thinking\nthe answer is 42".to_string() })
    );
}

#[parameterized(
    with_detail = { "===ARQ_EXECUTION_FAILED=== ImportError: numpy", "ImportError: numpy" },
    with_colon = { "===ARQ_EXECUTION_FAILED===: boom", "boom" },
    bare = { "===ARQ_EXECUTION_FAILED===", "agent reported failure" },
)]
fn failure_marker_carries_detail(line: &str, expected: &str) {
    let batch = lines(&["starting", line]);
    assert_eq!(
        scan_markers(&batch, SUCCESS_MARKER, FAILURE_MARKER),
        Some(Completion::Failed { message: expected.to_string() })
    );
}

#[test]
fn first_marker_wins() {
    let batch = lines(&[FAILURE_MARKER, SUCCESS_MARKER]);
    assert!(matches!(
        scan_markers(&batch, SUCCESS_MARKER, FAILURE_MARKER),
        Some(Completion::Failed { .. })
    ));
}

#[test]
fn no_marker_means_still_running() {
    let batch = lines(&["step 1", "step 2"]);
    assert_eq!(scan_markers(&batch, SUCCESS_MARKER, FAILURE_MARKER), None);
    assert_eq!(scan_markers(&[], SUCCESS_MARKER, FAILURE_MARKER), None);
}

#[test]
fn task_name_is_dns_safe_and_per_attempt() {
    let exe = Execution::builder().id("exe-Ab_c9").attempts(2).build();
    assert_eq!(task_name(&exe), "arq-ab-c9-2");
}

#[test]
fn task_request_encodes_the_bundle() {
    let mut exe = Execution::builder().id("exe-abc").query("what is 6*7?").build();
    exe.bundle = AgentBundle {
        code: "print(42)".to_string(),
        requirements: "numpy".to_string(),
        dockerfile: Some("FROM python:3.12".to_string()),
    };
    let job = ContainerJobConfig { model_id: Some("m-1".to_string()), region: None };
    let request = task_request(&exe, &job, &RuntimeConfig::default());

    let env = |key: &str| request.env.iter().find(|(k, _)| k == key).map(|(_, v)| v.clone());
    assert_eq!(env("ARQ_AGENT_CODE").as_deref(), Some("cHJpbnQoNDIp"));
    assert_eq!(env("ARQ_AGENT_REQUIREMENTS").as_deref(), Some("bnVtcHk="));
    assert!(env("ARQ_AGENT_DOCKERFILE").is_some());
    assert_eq!(env("ARQ_QUERY").as_deref(), Some("what is 6*7?"));
    assert_eq!(env("ARQ_MODEL_ID").as_deref(), Some("m-1"));
    assert_eq!(env("ARQ_REGION"), None);
    assert_eq!(env("ARQ_SUCCESS_MARKER").as_deref(), Some(SUCCESS_MARKER));
    assert!(request.tags.contains(&("arq.execution".to_string(), "exe-abc".to_string())));
    assert_eq!(request.memory_mb, 2048);
}
