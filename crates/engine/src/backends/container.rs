// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Container task backend.
//!
//! Launch hands the bundle to the platform as environment payload. From
//! then on the task is supervised by timers: a log-poll tick that scans
//! new output for the completion markers, and a timeout tick that stops
//! the task if it has not finished.

use crate::config::RuntimeConfig;
use crate::error::{DispatchError, RuntimeError};
use crate::runtime::{Runtime, CANCELLED_ERROR};
use arq_adapters::{ContainerError, TaskHandle, TaskRequest, TaskStatus};
use arq_core::{
    BackendHandles, Clock, ContainerJobConfig, ErrorStage, Execution, ExecutionId,
    ExecutionStatus, TimerId,
};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use std::time::{Duration, Instant};

pub const TIMEOUT_ERROR: &str = "execution timeout exceeded";

/// Outcome announced by a completion marker
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion {
    Succeeded { response: String },
    Failed { message: String },
}

/// Find the first completion marker in a batch of log lines.
///
/// A success marker yields the batch lines before it as the response. A
/// failure marker yields the text following it on the same line.
pub fn scan_markers(lines: &[String], success: &str, failure: &str) -> Option<Completion> {
    for (i, line) in lines.iter().enumerate() {
        if line.contains(success) {
            let response = lines.iter().take(i).map(String::as_str).collect::<Vec<_>>().join("\n");
            return Some(Completion::Succeeded { response });
        }
        if let Some(pos) = line.find(failure) {
            let detail = line[pos + failure.len()..].trim().trim_start_matches(':').trim();
            let message =
                if detail.is_empty() { "agent reported failure".to_string() } else { detail.to_string() };
            return Some(Completion::Failed { message });
        }
    }
    None
}

/// Task handle recorded on an execution, if it was launched.
pub(crate) fn task_handle(exe: &Execution) -> Option<TaskHandle> {
    let h = &exe.handles;
    Some(TaskHandle {
        task_id: h.task_id.clone()?,
        log_group: h.log_group.clone().unwrap_or_default(),
        log_stream: h.log_stream.clone().unwrap_or_default(),
    })
}

/// Platform-safe task name, unique per attempt.
pub(crate) fn task_name(exe: &Execution) -> String {
    let suffix: String = exe
        .id
        .suffix()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '-' })
        .collect();
    format!("arq-{suffix}-{}", exe.attempts)
}

pub(crate) fn task_request(
    exe: &Execution,
    job: &ContainerJobConfig,
    config: &RuntimeConfig,
) -> TaskRequest {
    let settings = &config.container;
    let encode = |s: &str| STANDARD.encode(s.as_bytes());
    let mut env = vec![
        ("ARQ_EXECUTION_ID".to_string(), exe.id.to_string()),
        ("ARQ_AGENT_ID".to_string(), exe.agent_id.clone()),
        ("ARQ_USER_ID".to_string(), exe.user_id.clone()),
        ("ARQ_QUERY".to_string(), exe.query.clone()),
        ("ARQ_TIMEOUT_MS".to_string(), exe.timeout_ms.to_string()),
        ("ARQ_AGENT_CODE".to_string(), encode(&exe.bundle.code)),
        ("ARQ_AGENT_REQUIREMENTS".to_string(), encode(&exe.bundle.requirements)),
        ("ARQ_SUCCESS_MARKER".to_string(), config.success_marker.clone()),
        ("ARQ_FAILURE_MARKER".to_string(), config.failure_marker.clone()),
    ];
    if let Some(dockerfile) = &exe.bundle.dockerfile {
        env.push(("ARQ_AGENT_DOCKERFILE".to_string(), encode(dockerfile)));
    }
    if let Some(prompt) = &exe.system_prompt {
        env.push(("ARQ_SYSTEM_PROMPT".to_string(), prompt.clone()));
    }
    if let Some(model_id) = &job.model_id {
        env.push(("ARQ_MODEL_ID".to_string(), model_id.clone()));
    }
    if let Some(region) = &job.region {
        env.push(("ARQ_REGION".to_string(), region.clone()));
    }

    TaskRequest {
        name: task_name(exe),
        image: settings.image.clone(),
        cluster: settings.cluster.clone(),
        task_definition: settings.task_definition.clone(),
        network: settings.network.clone(),
        cpu_units: settings.cpu_units,
        memory_mb: settings.memory_mb,
        env,
        tags: vec![
            ("arq.execution".to_string(), exe.id.to_string()),
            ("arq.agent".to_string(), exe.agent_id.clone()),
            ("arq.user".to_string(), exe.user_id.clone()),
        ],
        log_group: settings.log_group.clone(),
    }
}

impl<C: Clock> Runtime<C> {
    pub(crate) async fn launch_container(
        &self,
        exe: &Execution,
        job: &ContainerJobConfig,
    ) -> Result<(), DispatchError> {
        let id = &exe.id;
        if !self.recorder.update_status(id, ExecutionStatus::Building)? {
            return Ok(());
        }
        self.recorder.note(id, "launching container task")?;

        let request = task_request(exe, job, &self.config);
        let start = Instant::now();
        let handle = match self.containers.run_task(&request).await {
            Ok(handle) => handle,
            Err(e) => {
                tracing::warn!(execution_id = %id, error = %e, "container launch failed");
                self.recorder.note(id, format!("container launch failed: {e}"))?;
                return Err(DispatchError::build(e.to_string()));
            }
        };
        tracing::info!(
            execution_id = %id,
            task_id = %handle.task_id,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "container task launched"
        );

        let handles = BackendHandles {
            task_id: Some(handle.task_id.clone()),
            log_group: Some(handle.log_group.clone()),
            log_stream: Some(handle.log_stream.clone()),
            ..Default::default()
        };
        self.recorder.attach_backend(id, handles, Some(request.cpu_units), Some(request.memory_mb))?;
        if !self.recorder.update_status(id, ExecutionStatus::Running)? {
            // Finalized while the launch was in flight
            self.stop_task(&handle, CANCELLED_ERROR).await;
            return Ok(());
        }
        self.recorder.note(id, format!("container task {} running", handle.task_id))?;

        self.schedule(TimerId::log_poll(id), self.config.log_poll_interval());
        self.schedule(TimerId::timeout(id), Duration::from_millis(exe.timeout_ms));
        Ok(())
    }

    /// One log-poll tick.
    pub async fn poll_logs(&self, id: &ExecutionId) -> Result<(), RuntimeError> {
        let Some(exe) = self.store.execution(id.as_str()) else {
            return Ok(());
        };
        if !exe.status.is_active() {
            return Ok(());
        }
        let Some(handle) = task_handle(&exe) else {
            return Ok(());
        };

        let offset = exe.log_offset;
        let lines = match self.containers.fetch_logs(&handle, offset, false).await {
            Ok(lines) => lines,
            Err(e) => return self.poll_failed(&exe, e),
        };
        if exe.poll_failures > 0 {
            self.recorder.set_poll_failures(id, 0)?;
        }
        if !lines.is_empty() && !self.recorder.append_logs(id, lines.clone(), Some(offset))? {
            // Another tick already consumed this batch
            return Ok(());
        }
        if self.finish_on_marker(id, &handle, &lines).await? {
            return Ok(());
        }

        match self.containers.describe_task(&handle).await {
            Ok(TaskStatus::Stopped { exit_code }) => {
                return self.finish_stopped(id, &handle, offset + lines.len() as u64, exit_code).await;
            }
            Ok(TaskStatus::Missing) => {
                return self.finish_stopped(id, &handle, offset + lines.len() as u64, None).await;
            }
            Ok(TaskStatus::Pending | TaskStatus::Running) => {}
            Err(e) => tracing::warn!(execution_id = %id, error = %e, "describe task failed"),
        }

        self.schedule(TimerId::log_poll(id), self.config.log_poll_interval());
        Ok(())
    }

    fn poll_failed(&self, exe: &Execution, error: ContainerError) -> Result<(), RuntimeError> {
        let failures = exe.poll_failures + 1;
        self.recorder.set_poll_failures(&exe.id, failures)?;
        if failures > self.config.poll_retry_limit {
            tracing::warn!(execution_id = %exe.id, failures, error = %error, "log polling abandoned");
            return Ok(());
        }
        let delay = self.config.poll_backoff(failures);
        tracing::debug!(
            execution_id = %exe.id,
            failures,
            delay_ms = delay.as_millis() as u64,
            error = %error,
            "log fetch failed, retrying"
        );
        self.schedule(TimerId::log_poll(&exe.id), delay);
        Ok(())
    }

    /// Finalize from a completion marker in `lines`. Returns whether one
    /// was found.
    async fn finish_on_marker(
        &self,
        id: &ExecutionId,
        handle: &TaskHandle,
        lines: &[String],
    ) -> Result<bool, RuntimeError> {
        let finalized =
            match scan_markers(lines, &self.config.success_marker, &self.config.failure_marker) {
                None => return Ok(false),
                Some(Completion::Succeeded { response }) => {
                    self.recorder.complete(id, Some(response), None)?
                }
                Some(Completion::Failed { message }) => {
                    self.recorder.fail(id, ErrorStage::Runtime, message)?
                }
            };
        if finalized {
            self.release_task(id, handle, "execution finished").await;
        }
        Ok(true)
    }

    /// The task exited. Read whatever it wrote after the last fetch, then
    /// fail it if no marker turned up.
    async fn finish_stopped(
        &self,
        id: &ExecutionId,
        handle: &TaskHandle,
        offset: u64,
        exit_code: Option<i32>,
    ) -> Result<(), RuntimeError> {
        let tail = match self.containers.fetch_logs(handle, offset, true).await {
            Ok(tail) => tail,
            Err(e) => {
                tracing::warn!(execution_id = %id, error = %e, "final log fetch failed");
                Vec::new()
            }
        };
        if !tail.is_empty() && !self.recorder.append_logs(id, tail.clone(), Some(offset))? {
            return Ok(());
        }
        if self.finish_on_marker(id, handle, &tail).await? {
            return Ok(());
        }

        let code = exit_code.map_or_else(|| "unknown".to_string(), |c| c.to_string());
        let message = format!("container exited without completion marker (exit code {code})");
        if self.recorder.fail(id, ErrorStage::Runtime, message)? {
            self.release_task(id, handle, "task stopped").await;
        }
        Ok(())
    }

    /// Timeout tick. Returns whether this call finalized the execution.
    pub async fn handle_timeout(&self, id: &ExecutionId) -> Result<bool, RuntimeError> {
        let Some(exe) = self.store.execution(id.as_str()) else {
            return Ok(false);
        };
        if exe.is_terminal() || !self.recorder.fail(id, ErrorStage::Runtime, TIMEOUT_ERROR)? {
            return Ok(false);
        }
        self.recorder.note(id, "execution timeout exceeded, stopping task")?;
        self.cancel_timer(&TimerId::log_poll(id));
        if let Some(handle) = task_handle(&exe) {
            self.stop_task(&handle, TIMEOUT_ERROR).await;
        }
        Ok(true)
    }

    async fn release_task(&self, id: &ExecutionId, handle: &TaskHandle, reason: &str) {
        self.cancel_execution_timers(id);
        self.stop_task(handle, reason).await;
    }

    /// Stop a task, logging rather than propagating platform errors.
    pub(crate) async fn stop_task(&self, handle: &TaskHandle, reason: &str) {
        match self.containers.stop_task(handle, reason).await {
            Ok(()) => tracing::info!(task_id = %handle.task_id, reason, "container task stopped"),
            Err(ContainerError::NotFound(_)) => {
                tracing::debug!(task_id = %handle.task_id, "task already gone")
            }
            Err(e) => tracing::warn!(task_id = %handle.task_id, error = %e, "stop task failed"),
        }
    }
}

#[cfg(test)]
#[path = "container_tests.rs"]
mod tests;
