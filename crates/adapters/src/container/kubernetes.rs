// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Kubernetes backend: one pod per task.
//!
//! The task's `cluster` is the namespace. Pods use `restartPolicy: Never`
//! so a finished agent stays in `Succeeded`/`Failed` with its exit code
//! until `stop_task` deletes it. Logs are read from the pod's only
//! container.

use super::{lines_after, ContainerError, ContainerPlatform, TaskHandle, TaskRequest, TaskStatus};
use async_trait::async_trait;
use k8s_openapi::api::core::v1::{Container, EnvVar, Pod, PodSpec, ResourceRequirements};
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::api::{Api, DeleteParams, LogParams, PostParams};
use kube::Client;
use std::collections::BTreeMap;

const CONTAINER_NAME: &str = "agent";

#[derive(Clone)]
pub struct KubernetesPlatform {
    client: Client,
}

impl KubernetesPlatform {
    /// Connect using in-cluster config or the local kubeconfig.
    pub async fn new() -> Result<Self, ContainerError> {
        let client = Client::try_default()
            .await
            .map_err(|e| ContainerError::Platform(format!("failed to create kube client: {}", e)))?;
        Ok(Self { client })
    }

    fn pods(&self, namespace: &str) -> Api<Pod> {
        Api::namespaced(self.client.clone(), namespace)
    }
}

fn env_var(name: &str, value: &str) -> EnvVar {
    EnvVar { name: name.to_string(), value: Some(value.to_string()), ..Default::default() }
}

/// Label values are limited to 63 alphanumeric/`-_.` characters.
fn label_value(v: &str) -> String {
    v.chars()
        .map(|c| if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') { c } else { '-' })
        .take(63)
        .collect::<String>()
        .trim_matches(|c: char| !c.is_ascii_alphanumeric())
        .to_string()
}

/// Build the pod spec for a task.
pub(crate) fn build_pod(request: &TaskRequest) -> Pod {
    let mut labels = BTreeMap::new();
    labels.insert("app.kubernetes.io/managed-by".to_string(), "arq".to_string());
    labels.insert("arq/task-definition".to_string(), label_value(&request.task_definition));
    for (k, v) in &request.tags {
        labels.insert(format!("arq/{}", label_value(k)), label_value(v));
    }

    let mut limits = BTreeMap::new();
    if request.cpu_units > 0 {
        // 1024 units = 1 vCPU = 1000m
        let millis = u64::from(request.cpu_units) * 1000 / 1024;
        limits.insert("cpu".to_string(), Quantity(format!("{millis}m")));
    }
    if request.memory_mb > 0 {
        limits.insert("memory".to_string(), Quantity(format!("{}Mi", request.memory_mb)));
    }

    Pod {
        metadata: ObjectMeta {
            name: Some(request.name.clone()),
            namespace: Some(request.cluster.clone()),
            labels: Some(labels),
            ..Default::default()
        },
        spec: Some(PodSpec {
            restart_policy: Some("Never".to_string()),
            containers: vec![Container {
                name: CONTAINER_NAME.to_string(),
                image: Some(request.image.clone()),
                env: Some(request.env.iter().map(|(k, v)| env_var(k, v)).collect()),
                resources: Some(ResourceRequirements {
                    requests: Some(limits.clone()),
                    limits: Some(limits),
                    ..Default::default()
                }),
                ..Default::default()
            }],
            ..Default::default()
        }),
        ..Default::default()
    }
}

/// Map pod phase and container state to a task status.
pub(crate) fn pod_status(pod: &Pod) -> TaskStatus {
    let Some(status) = pod.status.as_ref() else { return TaskStatus::Pending };
    let exit_code = status
        .container_statuses
        .as_ref()
        .and_then(|cs| cs.iter().find(|c| c.name == CONTAINER_NAME))
        .and_then(|c| c.state.as_ref())
        .and_then(|s| s.terminated.as_ref())
        .map(|t| t.exit_code);
    match status.phase.as_deref() {
        Some("Succeeded") | Some("Failed") => TaskStatus::Stopped { exit_code },
        Some("Running") if exit_code.is_some() => TaskStatus::Stopped { exit_code },
        Some("Running") => TaskStatus::Running,
        Some("Pending") | None => TaskStatus::Pending,
        Some(_) => TaskStatus::Missing,
    }
}

fn is_not_found(e: &kube::Error) -> bool {
    matches!(e, kube::Error::Api(resp) if resp.code == 404)
}

#[async_trait]
impl ContainerPlatform for KubernetesPlatform {
    async fn run_task(&self, request: &TaskRequest) -> Result<TaskHandle, ContainerError> {
        let start = std::time::Instant::now();
        let pod = build_pod(request);
        tracing::info!(pod = %request.name, namespace = %request.cluster, "creating pod");
        self.pods(&request.cluster).create(&PostParams::default(), &pod).await.map_err(|e| {
            tracing::error!(pod = %request.name, error = %e, "pod creation failed");
            ContainerError::LaunchFailed(format!("pod creation failed: {}", e))
        })?;
        tracing::info!(
            pod = %request.name,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "pod created"
        );
        Ok(TaskHandle {
            task_id: request.name.clone(),
            log_group: request.cluster.clone(),
            log_stream: request.name.clone(),
        })
    }

    async fn stop_task(&self, handle: &TaskHandle, reason: &str) -> Result<(), ContainerError> {
        tracing::info!(pod = %handle.task_id, %reason, "deleting pod");
        match self.pods(&handle.log_group).delete(&handle.task_id, &DeleteParams::default()).await {
            Ok(_) => Ok(()),
            Err(e) if is_not_found(&e) => Ok(()),
            Err(e) => Err(ContainerError::Platform(format!("pod delete failed: {}", e))),
        }
    }

    async fn describe_task(&self, handle: &TaskHandle) -> Result<TaskStatus, ContainerError> {
        match self.pods(&handle.log_group).get(&handle.task_id).await {
            Ok(pod) => Ok(pod_status(&pod)),
            Err(e) if is_not_found(&e) => Ok(TaskStatus::Missing),
            Err(e) => Err(ContainerError::Platform(format!("pod lookup failed: {}", e))),
        }
    }

    async fn fetch_logs(
        &self,
        handle: &TaskHandle,
        offset: u64,
        exited: bool,
    ) -> Result<Vec<String>, ContainerError> {
        let params = LogParams { container: Some(CONTAINER_NAME.to_string()), ..Default::default() };
        match self.pods(&handle.log_group).logs(&handle.log_stream, &params).await {
            Ok(text) => Ok(lines_after(&text, offset, exited)),
            Err(e) if is_not_found(&e) => Err(ContainerError::NotFound(handle.task_id.clone())),
            Err(e) => Err(ContainerError::Platform(format!("pod logs failed: {}", e))),
        }
    }
}

#[cfg(test)]
#[path = "kubernetes_tests.rs"]
mod tests;
