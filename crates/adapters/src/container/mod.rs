// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Container platform adapters.
//!
//! # Module layout
//!
//! - [`docker`]: Docker CLI backend
//! - [`kubernetes`]: Kubernetes API backend, one pod per task
//!
//! A task is one sandboxed container run. The platform returns a
//! [`TaskHandle`] naming both the task and the log sink it writes to;
//! callers persist the handle and use it to poll logs, check status, and
//! stop the task.

mod docker;
mod kubernetes;

pub use docker::DockerPlatform;
pub use kubernetes::KubernetesPlatform;

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ContainerError {
    #[error("launch failed: {0}")]
    LaunchFailed(String),
    #[error("task not found: {0}")]
    NotFound(String),
    #[error("platform error: {0}")]
    Platform(String),
}

/// Everything needed to start one task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskRequest {
    /// Unique task name, also used as the log stream
    pub name: String,
    pub image: String,
    /// Docker: unused. Kubernetes: namespace.
    pub cluster: String,
    pub task_definition: String,
    /// Docker network to attach to
    pub network: Option<String>,
    /// CPU in 1/1024 vCPU units
    pub cpu_units: u32,
    pub memory_mb: u32,
    pub env: Vec<(String, String)>,
    pub tags: Vec<(String, String)>,
    pub log_group: String,
}

/// Platform-assigned identity of a running task and its log sink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskHandle {
    pub task_id: String,
    pub log_group: String,
    pub log_stream: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskStatus {
    Pending,
    Running,
    Stopped { exit_code: Option<i32> },
    /// The platform no longer knows about the task
    Missing,
}

/// Adapter for a container platform
#[async_trait]
pub trait ContainerPlatform: Send + Sync + 'static {
    async fn run_task(&self, request: &TaskRequest) -> Result<TaskHandle, ContainerError>;

    async fn stop_task(&self, handle: &TaskHandle, reason: &str) -> Result<(), ContainerError>;

    async fn describe_task(&self, handle: &TaskHandle) -> Result<TaskStatus, ContainerError>;

    /// Log lines from the task's sink, starting at line `offset`.
    ///
    /// An unterminated last line is still being written and is held back
    /// until the task has exited, which the caller signals with `exited`.
    async fn fetch_logs(
        &self,
        handle: &TaskHandle,
        offset: u64,
        exited: bool,
    ) -> Result<Vec<String>, ContainerError>;
}

/// Newline-terminated lines of `output`, plus the unterminated tail when
/// `exited` is set.
pub(crate) fn complete_lines(output: &str, exited: bool) -> Vec<&str> {
    let complete =
        if exited { output } else { output.rfind('\n').map_or("", |end| &output[..=end]) };
    complete.lines().collect()
}

/// Lines of `output` after skipping the first `offset`.
pub(crate) fn lines_after(output: &str, offset: u64, exited: bool) -> Vec<String> {
    complete_lines(output, exited).into_iter().skip(offset as usize).map(str::to_string).collect()
}

#[cfg(any(test, feature = "test-support"))]
#[cfg_attr(coverage_nightly, coverage(off))]
mod fake {
    use super::{
        lines_after, ContainerError, ContainerPlatform, TaskHandle, TaskRequest, TaskStatus,
    };
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::collections::{HashMap, VecDeque};
    use std::sync::Arc;

    /// Recorded platform call
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum ContainerCall {
        Run { name: String, env: Vec<(String, String)> },
        Stop { task_id: String, reason: String },
        Describe { task_id: String },
        FetchLogs { task_id: String, offset: u64, exited: bool },
    }

    #[derive(Default)]
    struct FakeContainerState {
        calls: Vec<ContainerCall>,
        /// Errors returned by upcoming `run_task` calls, in order
        launch_failures: VecDeque<String>,
        /// Errors returned by upcoming `fetch_logs` calls, in order
        log_failures: VecDeque<String>,
        /// Raw output per task, as the platform would return it
        logs: HashMap<String, String>,
        status: HashMap<String, TaskStatus>,
        next_task: u32,
    }

    /// In-memory container platform for tests.
    ///
    /// Tasks are named `task-N` in launch order and start `Running`.
    #[derive(Clone, Default)]
    pub struct FakeContainerPlatform {
        inner: Arc<Mutex<FakeContainerState>>,
    }

    impl FakeContainerPlatform {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn calls(&self) -> Vec<ContainerCall> {
            self.inner.lock().calls.clone()
        }

        pub fn stop_count(&self, task_id: &str) -> usize {
            self.inner
                .lock()
                .calls
                .iter()
                .filter(|c| matches!(c, ContainerCall::Stop { task_id: t, .. } if t == task_id))
                .count()
        }

        pub fn run_count(&self) -> usize {
            self.inner.lock().calls.iter().filter(|c| matches!(c, ContainerCall::Run { .. })).count()
        }

        pub fn fail_next_launch(&self, error: impl Into<String>) {
            self.inner.lock().launch_failures.push_back(error.into());
        }

        pub fn fail_next_log_fetch(&self, error: impl Into<String>) {
            self.inner.lock().log_failures.push_back(error.into());
        }

        /// Append whole lines to a task's log sink.
        pub fn push_logs(&self, task_id: &str, lines: &[&str]) {
            let mut inner = self.inner.lock();
            let sink = inner.logs.entry(task_id.to_string()).or_default();
            for line in lines {
                sink.push_str(line);
                sink.push('\n');
            }
        }

        /// Append raw output, which may end mid-line.
        pub fn push_output(&self, task_id: &str, output: &str) {
            self.inner.lock().logs.entry(task_id.to_string()).or_default().push_str(output);
        }

        pub fn set_status(&self, task_id: &str, status: TaskStatus) {
            self.inner.lock().status.insert(task_id.to_string(), status);
        }

        /// Environment of the most recent launch.
        pub fn last_run_env(&self) -> Option<Vec<(String, String)>> {
            self.inner.lock().calls.iter().rev().find_map(|c| match c {
                ContainerCall::Run { env, .. } => Some(env.clone()),
                _ => None,
            })
        }
    }

    #[async_trait]
    impl ContainerPlatform for FakeContainerPlatform {
        async fn run_task(&self, request: &TaskRequest) -> Result<TaskHandle, ContainerError> {
            let mut inner = self.inner.lock();
            inner.calls.push(ContainerCall::Run { name: request.name.clone(), env: request.env.clone() });
            if let Some(error) = inner.launch_failures.pop_front() {
                return Err(ContainerError::LaunchFailed(error));
            }
            inner.next_task += 1;
            let task_id = format!("task-{}", inner.next_task);
            inner.status.insert(task_id.clone(), TaskStatus::Running);
            Ok(TaskHandle {
                task_id,
                log_group: request.log_group.clone(),
                log_stream: request.name.clone(),
            })
        }

        async fn stop_task(&self, handle: &TaskHandle, reason: &str) -> Result<(), ContainerError> {
            let mut inner = self.inner.lock();
            inner.calls.push(ContainerCall::Stop {
                task_id: handle.task_id.clone(),
                reason: reason.to_string(),
            });
            inner.status.insert(handle.task_id.clone(), TaskStatus::Stopped { exit_code: Some(137) });
            Ok(())
        }

        async fn describe_task(&self, handle: &TaskHandle) -> Result<TaskStatus, ContainerError> {
            let mut inner = self.inner.lock();
            inner.calls.push(ContainerCall::Describe { task_id: handle.task_id.clone() });
            Ok(inner.status.get(&handle.task_id).copied().unwrap_or(TaskStatus::Missing))
        }

        async fn fetch_logs(
            &self,
            handle: &TaskHandle,
            offset: u64,
            exited: bool,
        ) -> Result<Vec<String>, ContainerError> {
            let mut inner = self.inner.lock();
            inner.calls.push(ContainerCall::FetchLogs {
                task_id: handle.task_id.clone(),
                offset,
                exited,
            });
            if let Some(error) = inner.log_failures.pop_front() {
                return Err(ContainerError::Platform(error));
            }
            let output = inner.logs.get(&handle.task_id).map(String::as_str).unwrap_or_default();
            Ok(lines_after(output, offset, exited))
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
pub use fake::{ContainerCall, FakeContainerPlatform};

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
