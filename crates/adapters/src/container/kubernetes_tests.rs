// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use k8s_openapi::api::core::v1::{
    ContainerState, ContainerStateTerminated, ContainerStatus, PodStatus,
};

fn request() -> TaskRequest {
    TaskRequest {
        name: "arq-exe-1".to_string(),
        image: "arq-runner:latest".to_string(),
        cluster: "jobs".to_string(),
        task_definition: "arq agent/v1".to_string(),
        network: None,
        cpu_units: 1024,
        memory_mb: 2048,
        env: vec![("ARQ_QUERY".to_string(), "hello".to_string())],
        tags: vec![("execution".to_string(), "exe-1".to_string())],
        log_group: "jobs".to_string(),
    }
}

fn pod_with(phase: &str, exit_code: Option<i32>) -> Pod {
    let state = exit_code.map(|code| ContainerState {
        terminated: Some(ContainerStateTerminated { exit_code: code, ..Default::default() }),
        ..Default::default()
    });
    Pod {
        status: Some(PodStatus {
            phase: Some(phase.to_string()),
            container_statuses: Some(vec![ContainerStatus {
                name: CONTAINER_NAME.to_string(),
                state,
                ..Default::default()
            }]),
            ..Default::default()
        }),
        ..Default::default()
    }
}

#[test]
fn pod_spec_has_env_limits_and_labels() {
    let pod = build_pod(&request());
    assert_eq!(pod.metadata.name.as_deref(), Some("arq-exe-1"));
    assert_eq!(pod.metadata.namespace.as_deref(), Some("jobs"));

    let labels = pod.metadata.labels.unwrap();
    assert_eq!(labels.get("arq/task-definition").map(String::as_str), Some("arq-agent-v1"));
    assert_eq!(labels.get("arq/execution").map(String::as_str), Some("exe-1"));

    let spec = pod.spec.unwrap();
    assert_eq!(spec.restart_policy.as_deref(), Some("Never"));
    let container = &spec.containers[0];
    let env = container.env.as_ref().unwrap();
    assert_eq!(env[0].name, "ARQ_QUERY");
    assert_eq!(env[0].value.as_deref(), Some("hello"));

    let limits = container.resources.as_ref().and_then(|r| r.limits.as_ref()).unwrap();
    assert_eq!(limits.get("cpu"), Some(&Quantity("1000m".to_string())));
    assert_eq!(limits.get("memory"), Some(&Quantity("2048Mi".to_string())));
}

#[test]
fn huge_cpu_request_does_not_overflow() {
    let mut req = request();
    req.cpu_units = u32::MAX;
    let pod = build_pod(&req);
    let spec = pod.spec.unwrap();
    let limits = spec.containers[0].resources.as_ref().and_then(|r| r.limits.as_ref()).unwrap();
    assert_eq!(limits.get("cpu"), Some(&Quantity("4194303999m".to_string())));
}

#[yare::parameterized(
    pending = { "Pending", None, TaskStatus::Pending },
    running = { "Running", None, TaskStatus::Running },
    succeeded = { "Succeeded", Some(0), TaskStatus::Stopped { exit_code: Some(0) } },
    failed = { "Failed", Some(2), TaskStatus::Stopped { exit_code: Some(2) } },
    unknown = { "Unknown", None, TaskStatus::Missing },
)]
fn pod_phase_mapping(phase: &str, exit_code: Option<i32>, expected: TaskStatus) {
    assert_eq!(pod_status(&pod_with(phase, exit_code)), expected);
}

#[test]
fn pod_without_status_is_pending() {
    assert_eq!(pod_status(&Pod::default()), TaskStatus::Pending);
}

#[test]
fn label_values_are_sanitized() {
    assert_eq!(label_value("a b/c"), "a-b-c");
    assert_eq!(label_value("-x-"), "x");
    assert_eq!(label_value(&"y".repeat(80)).len(), 63);
}
