// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serial_test::serial;
use tempfile::tempdir;
use yare::parameterized;

const OVERRIDES: [&str; 6] = [
    "ARQ_MAX_CONCURRENT",
    "ARQ_SWEEP_INTERVAL_MS",
    "ARQ_RECLAIM_GRACE_MS",
    "ARQ_CONTAINER_RUNTIME",
    "ARQ_CONTAINER_IMAGE",
    "KUBERNETES_SERVICE_HOST",
];

fn clear() {
    for name in OVERRIDES {
        std::env::remove_var(name);
    }
}

#[test]
#[serial]
fn missing_file_yields_defaults() {
    clear();
    let dir = tempdir().unwrap();

    let config = DaemonConfig::load(&dir.path().join("absent.toml")).unwrap();

    assert_eq!(config, DaemonConfig::default());
    assert_eq!(config.runtime.max_concurrent, 10);
    assert_eq!(config.container_runtime(), ContainerRuntime::Docker);
}

#[test]
#[serial]
fn file_values_override_defaults() {
    clear();
    let dir = tempdir().unwrap();
    let path = dir.path().join("arq.toml");
    std::fs::write(
        &path,
        r#"
container_runtime = "kubernetes"

[runtime]
max_concurrent = 4
log_poll_interval_ms = 500

[runtime.container]
image = "runner:dev"
cluster = "agents"
"#,
    )
    .unwrap();

    let config = DaemonConfig::load(&path).unwrap();

    assert_eq!(config.container_runtime(), ContainerRuntime::Kubernetes);
    assert_eq!(config.runtime.max_concurrent, 4);
    assert_eq!(config.runtime.log_poll_interval_ms, 500);
    assert_eq!(config.runtime.sweep_interval_ms, 5_000);
    assert_eq!(config.runtime.container.image, "runner:dev");
    assert_eq!(config.runtime.container.cluster, "agents");
    assert_eq!(config.runtime.container.memory_mb, 2048);
}

#[test]
#[serial]
fn environment_wins_over_file() {
    clear();
    let dir = tempdir().unwrap();
    let path = dir.path().join("arq.toml");
    std::fs::write(&path, "[runtime]\nmax_concurrent = 4\n").unwrap();
    std::env::set_var("ARQ_MAX_CONCURRENT", "2");
    std::env::set_var("ARQ_SWEEP_INTERVAL_MS", "250");
    std::env::set_var("ARQ_CONTAINER_RUNTIME", "k8s");

    let config = DaemonConfig::load(&path).unwrap();
    clear();

    assert_eq!(config.runtime.max_concurrent, 2);
    assert_eq!(config.runtime.sweep_interval_ms, 250);
    assert_eq!(config.container_runtime(), ContainerRuntime::Kubernetes);
}

#[test]
#[serial]
fn invalid_override_is_reported() {
    clear();
    let dir = tempdir().unwrap();
    std::env::set_var("ARQ_MAX_CONCURRENT", "many");

    let err = DaemonConfig::load(&dir.path().join("arq.toml")).unwrap_err();
    clear();

    assert!(
        matches!(err, ConfigError::InvalidEnv { name: "ARQ_MAX_CONCURRENT", ref value } if value == "many"),
        "got {err:?}"
    );
}

#[test]
#[serial]
fn malformed_file_is_a_parse_error() {
    clear();
    let dir = tempdir().unwrap();
    let path = dir.path().join("arq.toml");
    std::fs::write(&path, "[runtime\nmax_concurrent = ").unwrap();

    let err = DaemonConfig::load(&path).unwrap_err();
    assert!(matches!(err, ConfigError::Parse(ref p, _) if p == &path), "got {err:?}");
}

#[test]
#[serial]
fn in_cluster_selects_kubernetes_when_unset() {
    clear();
    std::env::set_var("KUBERNETES_SERVICE_HOST", "10.0.0.1");

    let detected = DaemonConfig::default().container_runtime();
    let pinned = DaemonConfig { container_runtime: Some(ContainerRuntime::Docker), ..Default::default() }
        .container_runtime();
    clear();

    assert_eq!(detected, ContainerRuntime::Kubernetes);
    assert_eq!(pinned, ContainerRuntime::Docker);
}

#[parameterized(
    docker = { "docker", Some(ContainerRuntime::Docker) },
    upper = { "Docker", Some(ContainerRuntime::Docker) },
    kubernetes = { "kubernetes", Some(ContainerRuntime::Kubernetes) },
    short = { "k8s", Some(ContainerRuntime::Kubernetes) },
    unknown = { "podman", None },
)]
fn container_runtime_parses(raw: &str, expected: Option<ContainerRuntime>) {
    assert_eq!(raw.parse::<ContainerRuntime>().ok(), expected);
}
