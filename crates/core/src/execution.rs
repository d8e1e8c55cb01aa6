// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Execution record and its lifecycle state machine.

use crate::queue::QueueEntryId;
use serde::{Deserialize, Serialize};

crate::define_id! {
    /// Unique identifier for one submitted run of an agent.
    pub struct ExecutionId("exe-");
}

/// Lifecycle status of an execution.
///
/// Transitions only move forward along `Queued → Building → Running`, and
/// nothing leaves `Completed` or `Failed` except an explicit requeue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExecutionStatus {
    Queued,
    Building,
    Running,
    Completed,
    Failed,
}

impl ExecutionStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, ExecutionStatus::Completed | ExecutionStatus::Failed)
    }

    /// BUILDING and RUNNING count against the concurrency cap.
    pub fn is_active(self) -> bool {
        matches!(self, ExecutionStatus::Building | ExecutionStatus::Running)
    }

    fn rank(self) -> u8 {
        match self {
            ExecutionStatus::Queued => 0,
            ExecutionStatus::Building => 1,
            ExecutionStatus::Running => 2,
            ExecutionStatus::Completed | ExecutionStatus::Failed => 3,
        }
    }

    /// Whether moving from `self` to `next` respects forward-only ordering.
    pub fn can_advance_to(self, next: ExecutionStatus) -> bool {
        !self.is_terminal() && next.rank() > self.rank()
    }
}

crate::simple_display! {
    ExecutionStatus {
        Queued => "QUEUED",
        Building => "BUILDING",
        Running => "RUNNING",
        Completed => "COMPLETED",
        Failed => "FAILED",
    }
}

/// Where in the pipeline a failure happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorStage {
    /// Failed to launch or provision
    Build,
    /// Timeout or in-flight failure
    Runtime,
    /// Adapter call failed
    Execution,
    /// Internal queue fault or abandonment
    Service,
}

crate::simple_display! {
    ErrorStage {
        Build => "build",
        Runtime => "runtime",
        Execution => "execution",
        Service => "service",
    }
}

/// Serialized agent artifact carried into the sandbox.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentBundle {
    pub code: String,
    #[serde(default)]
    pub requirements: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dockerfile: Option<String>,
}

/// Opaque identifiers returned by whichever backend ran the execution.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendHandles {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_group: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_stream: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub runtime_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
}

/// Timing and resource figures, all in epoch milliseconds or durations in ms.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionMetrics {
    pub submitted_at_ms: u64,
    #[serde(default)]
    pub started_at_ms: Option<u64>,
    #[serde(default)]
    pub running_at_ms: Option<u64>,
    #[serde(default)]
    pub completed_at_ms: Option<u64>,
    #[serde(default)]
    pub queue_wait_ms: Option<u64>,
    #[serde(default)]
    pub build_time_ms: Option<u64>,
    #[serde(default)]
    pub execution_time_ms: Option<u64>,
    #[serde(default)]
    pub memory_mb: Option<u32>,
    #[serde(default)]
    pub cpu_units: Option<u32>,
    #[serde(default)]
    pub usage: Option<TokenUsage>,
    #[serde(default)]
    pub last_log_at_ms: Option<u64>,
}

/// Input accepted from a submitter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Submission {
    pub agent_id: String,
    pub user_id: String,
    pub query: String,
    #[serde(default)]
    pub system_prompt: Option<String>,
    pub timeout_ms: u64,
    #[serde(default = "default_priority")]
    pub priority: u32,
    pub provider: String,
    #[serde(default)]
    pub model_config: serde_json::Value,
    #[serde(default)]
    pub bundle: AgentBundle,
}

fn default_priority() -> u32 {
    1
}

impl Submission {
    pub fn new(agent_id: impl Into<String>, provider: impl Into<String>) -> Self {
        Self {
            agent_id: agent_id.into(),
            user_id: String::new(),
            query: String::new(),
            system_prompt: None,
            timeout_ms: 300_000,
            priority: default_priority(),
            provider: provider.into(),
            model_config: serde_json::Value::Null,
            bundle: AgentBundle::default(),
        }
    }

    crate::setters! {
        into { user_id: String, query: String }
        set { timeout_ms: u64, priority: u32, model_config: serde_json::Value, bundle: AgentBundle }
        option { system_prompt: String }
    }
}

/// One submitted run and its full lifecycle record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Execution {
    pub id: ExecutionId,
    pub agent_id: String,
    pub user_id: String,
    pub status: ExecutionStatus,
    pub timeout_ms: u64,
    pub bundle: AgentBundle,
    pub query: String,
    #[serde(default)]
    pub system_prompt: Option<String>,
    pub provider: String,
    #[serde(default)]
    pub model_config: serde_json::Value,
    #[serde(default)]
    pub response: Option<String>,
    #[serde(default)]
    pub logs: Vec<String>,
    /// Number of lines consumed from the backend log sink so far
    #[serde(default)]
    pub log_offset: u64,
    #[serde(default)]
    pub poll_failures: u32,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub error_stage: Option<ErrorStage>,
    #[serde(default)]
    pub handles: BackendHandles,
    #[serde(default)]
    pub metrics: ExecutionMetrics,
    /// Failed attempts so far; mirrors the live queue entry
    #[serde(default)]
    pub attempts: u32,
    /// Queue entry that currently references this execution
    #[serde(default)]
    pub entry_id: Option<QueueEntryId>,
}

impl Execution {
    pub fn from_submission(id: ExecutionId, submission: &Submission, now_ms: u64) -> Self {
        Self {
            id,
            agent_id: submission.agent_id.clone(),
            user_id: submission.user_id.clone(),
            status: ExecutionStatus::Queued,
            timeout_ms: submission.timeout_ms,
            bundle: submission.bundle.clone(),
            query: submission.query.clone(),
            system_prompt: submission.system_prompt.clone(),
            provider: submission.provider.clone(),
            model_config: submission.model_config.clone(),
            response: None,
            logs: Vec::new(),
            log_offset: 0,
            poll_failures: 0,
            error: None,
            error_stage: None,
            handles: BackendHandles::default(),
            metrics: ExecutionMetrics { submitted_at_ms: now_ms, ..Default::default() },
            attempts: 0,
            entry_id: None,
        }
    }

    /// Display mirror of status.
    pub fn phase(&self) -> String {
        self.status.to_string().to_lowercase()
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Move to `next`, stamping timing metrics. Returns false if the move
    /// would go backwards or leave a terminal state.
    pub fn advance(&mut self, next: ExecutionStatus, at_ms: u64) -> bool {
        if !self.status.can_advance_to(next) {
            return false;
        }
        let m = &mut self.metrics;
        if next.is_active() && m.started_at_ms.is_none() {
            m.started_at_ms = Some(at_ms);
            m.queue_wait_ms = Some(at_ms.saturating_sub(m.submitted_at_ms));
        }
        if next == ExecutionStatus::Running {
            m.running_at_ms = Some(at_ms);
            if self.status == ExecutionStatus::Building {
                m.build_time_ms = m.started_at_ms.map(|s| at_ms.saturating_sub(s));
            }
        }
        if next.is_terminal() {
            m.completed_at_ms = Some(at_ms);
            m.execution_time_ms = m.running_at_ms.map(|r| at_ms.saturating_sub(r));
        }
        self.status = next;
        true
    }

    /// Deadline after which a started execution can be considered stuck.
    pub fn deadline_ms(&self, grace_ms: u64) -> Option<u64> {
        self.metrics
            .started_at_ms
            .map(|s| s.saturating_add(self.timeout_ms).saturating_add(grace_ms))
    }

    /// Clear outcome fields before a retry.
    pub fn reset_for_retry(&mut self, attempts: u32) {
        self.status = ExecutionStatus::Queued;
        self.attempts = attempts;
        self.response = None;
        self.error = None;
        self.error_stage = None;
        self.handles = BackendHandles::default();
        self.log_offset = 0;
        self.poll_failures = 0;
        let m = &mut self.metrics;
        m.started_at_ms = None;
        m.running_at_ms = None;
        m.completed_at_ms = None;
        m.build_time_ms = None;
        m.execution_time_ms = None;
    }
}

crate::builder! {
    ExecutionBuilder => Execution,
    seed: Execution {
        timeout_ms: 60_000,
        bundle: AgentBundle { code: "print('hi')".to_string(), ..Default::default() },
        ..Execution::from_submission(
            ExecutionId::from_string("exe-test"),
            &Submission::new("agent-1", "managed-container").user_id("user-1").query("hello"),
            1_000_000,
        )
    },
    into { id: ExecutionId, agent_id: String, user_id: String, query: String, provider: String }
    set {
        status: ExecutionStatus,
        timeout_ms: u64,
        model_config: serde_json::Value,
        logs: Vec<String>,
        handles: BackendHandles,
        attempts: u32,
    }
    option { system_prompt: String, entry_id: QueueEntryId }
}

#[cfg(test)]
#[path = "execution_tests.rs"]
mod tests;
