// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Docker backend: one detached container per task, driven by the CLI.
//!
//! Containers are not started with `--rm` so their exit status and logs
//! stay readable after the process ends; `stop_task` removes them.

use super::{complete_lines, ContainerError, ContainerPlatform, TaskHandle, TaskRequest, TaskStatus};
use async_trait::async_trait;

#[derive(Clone, Debug, Default)]
pub struct DockerPlatform;

impl DockerPlatform {
    pub fn new() -> Self {
        Self
    }
}

/// Build `docker run` arguments for a task.
pub(crate) fn run_args(request: &TaskRequest) -> Vec<String> {
    let mut args: Vec<String> = vec!["run".into(), "-d".into(), "--name".into(), request.name.clone()];
    args.push("--label".into());
    args.push(format!("arq.task-definition={}", request.task_definition));
    for (k, v) in &request.tags {
        args.push("--label".into());
        args.push(format!("{k}={v}"));
    }
    if request.cpu_units > 0 {
        args.push("--cpus".into());
        args.push(format!("{:.2}", f64::from(request.cpu_units) / 1024.0));
    }
    if request.memory_mb > 0 {
        args.push("--memory".into());
        args.push(format!("{}m", request.memory_mb));
    }
    if let Some(ref network) = request.network {
        args.push("--network".into());
        args.push(network.clone());
    }
    for (k, v) in &request.env {
        args.push("-e".into());
        args.push(format!("{k}={v}"));
    }
    args.push(request.image.clone());
    args
}

/// Parse `docker inspect -f '{{.State.Status}} {{.State.ExitCode}}'` output.
pub(crate) fn parse_inspect(output: &str) -> TaskStatus {
    let mut parts = output.split_whitespace();
    let state = parts.next().unwrap_or("");
    let exit_code = parts.next().and_then(|c| c.parse().ok());
    match state {
        "created" | "restarting" => TaskStatus::Pending,
        "running" | "paused" => TaskStatus::Running,
        "exited" | "dead" | "removing" => TaskStatus::Stopped { exit_code },
        _ => TaskStatus::Missing,
    }
}

/// Split a `docker logs --timestamps` line into its timestamp and text.
fn split_timestamp(line: &str) -> Option<(&str, &str)> {
    let (ts, text) = line.split_once(' ')?;
    (ts.starts_with(|c: char| c.is_ascii_digit()) && ts.ends_with('Z')).then_some((ts, text))
}

/// Lines of one stream paired with their timestamp. A line without one
/// inherits the timestamp of the line before it.
fn timestamped(output: &str, exited: bool) -> Vec<(&str, &str)> {
    let mut last = "";
    complete_lines(output, exited)
        .into_iter()
        .map(|line| match split_timestamp(line) {
            Some((ts, text)) => {
                last = ts;
                (ts, text)
            }
            None => (last, line),
        })
        .collect()
}

/// Interleave a container's stdout and stderr by timestamp.
///
/// Docker prints fixed-width UTC timestamps, so they order as strings.
/// Ties go to stdout, which keeps line positions stable between polls.
pub(crate) fn merge_streams(stdout: &str, stderr: &str, exited: bool) -> Vec<String> {
    let out = timestamped(stdout, exited);
    let err = timestamped(stderr, exited);
    let mut merged = Vec::with_capacity(out.len() + err.len());
    let (mut i, mut j) = (0, 0);
    while i < out.len() && j < err.len() {
        if out[i].0 <= err[j].0 {
            merged.push(out[i].1.to_string());
            i += 1;
        } else {
            merged.push(err[j].1.to_string());
            j += 1;
        }
    }
    merged.extend(out[i..].iter().chain(&err[j..]).map(|(_, text)| text.to_string()));
    merged
}

fn is_missing(stderr: &str) -> bool {
    stderr.contains("No such container") || stderr.contains("No such object")
}

#[async_trait]
impl ContainerPlatform for DockerPlatform {
    async fn run_task(&self, request: &TaskRequest) -> Result<TaskHandle, ContainerError> {
        let start = std::time::Instant::now();
        let args = run_args(request);
        let arg_refs: Vec<&str> = args.iter().map(String::as_str).collect();
        let result = run_docker(&arg_refs).await;
        let elapsed_ms = start.elapsed().as_millis() as u64;
        match result {
            Ok(container_id) => {
                tracing::info!(
                    task = %request.name,
                    %container_id,
                    elapsed_ms,
                    "docker task started"
                );
                Ok(TaskHandle {
                    task_id: container_id,
                    log_group: request.log_group.clone(),
                    log_stream: request.name.clone(),
                })
            }
            Err(e) => {
                tracing::error!(task = %request.name, elapsed_ms, error = %e, "docker run failed");
                Err(ContainerError::LaunchFailed(e))
            }
        }
    }

    async fn stop_task(&self, handle: &TaskHandle, reason: &str) -> Result<(), ContainerError> {
        tracing::info!(task_id = %handle.task_id, %reason, "stopping docker task");
        match run_docker(&["rm", "-f", &handle.task_id]).await {
            Ok(_) => Ok(()),
            Err(e) if is_missing(&e) => Ok(()),
            Err(e) => Err(ContainerError::Platform(e)),
        }
    }

    async fn describe_task(&self, handle: &TaskHandle) -> Result<TaskStatus, ContainerError> {
        let format = "{{.State.Status}} {{.State.ExitCode}}";
        match run_docker(&["inspect", "-f", format, &handle.task_id]).await {
            Ok(out) => Ok(parse_inspect(&out)),
            Err(e) if is_missing(&e) => Ok(TaskStatus::Missing),
            Err(e) => Err(ContainerError::Platform(e)),
        }
    }

    async fn fetch_logs(
        &self,
        handle: &TaskHandle,
        offset: u64,
        exited: bool,
    ) -> Result<Vec<String>, ContainerError> {
        // The container's stderr arrives on the CLI's own stderr
        match docker_output(&["logs", "--timestamps", &handle.task_id]).await {
            Ok(output) => {
                let stdout = String::from_utf8_lossy(&output.stdout);
                let stderr = String::from_utf8_lossy(&output.stderr);
                let lines = merge_streams(&stdout, &stderr, exited);
                Ok(lines.into_iter().skip(offset as usize).collect())
            }
            Err(e) if is_missing(&e) => Err(ContainerError::NotFound(handle.task_id.clone())),
            Err(e) => Err(ContainerError::Platform(e)),
        }
    }
}

/// Run a docker CLI command and return stdout on success.
async fn run_docker(args: &[&str]) -> Result<String, String> {
    let output = docker_output(args).await?;
    Ok(String::from_utf8_lossy(&output.stdout).trim_end().to_string())
}

/// Run a docker CLI command and return its raw output on success.
async fn docker_output(args: &[&str]) -> Result<std::process::Output, String> {
    let output = tokio::process::Command::new("docker")
        .args(args)
        .output()
        .await
        .map_err(|e| format!("failed to exec docker: {}", e))?;

    if output.status.success() {
        Ok(output)
    } else {
        let stderr = String::from_utf8_lossy(&output.stderr);
        Err(format!("docker {} failed: {}", args.first().unwrap_or(&""), stderr.trim()))
    }
}

#[cfg(test)]
#[path = "docker_tests.rs"]
mod tests;
