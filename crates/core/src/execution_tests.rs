// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::test_support::strategies::arb_status;
use proptest::prelude::*;

#[yare::parameterized(
    queued_to_building = { ExecutionStatus::Queued, ExecutionStatus::Building, true },
    queued_to_running = { ExecutionStatus::Queued, ExecutionStatus::Running, true },
    building_to_running = { ExecutionStatus::Building, ExecutionStatus::Running, true },
    running_to_completed = { ExecutionStatus::Running, ExecutionStatus::Completed, true },
    queued_to_failed = { ExecutionStatus::Queued, ExecutionStatus::Failed, true },
    running_to_building = { ExecutionStatus::Running, ExecutionStatus::Building, false },
    running_to_running = { ExecutionStatus::Running, ExecutionStatus::Running, false },
    completed_to_failed = { ExecutionStatus::Completed, ExecutionStatus::Failed, false },
    failed_to_queued = { ExecutionStatus::Failed, ExecutionStatus::Queued, false },
)]
fn status_ordering(from: ExecutionStatus, to: ExecutionStatus, allowed: bool) {
    assert_eq!(from.can_advance_to(to), allowed);
}

proptest! {
    #[test]
    fn terminal_states_never_advance(from in arb_status(), to in arb_status()) {
        if from.is_terminal() {
            prop_assert!(!from.can_advance_to(to));
        }
    }
}

#[test]
fn status_serializes_uppercase() {
    assert_eq!(serde_json::to_string(&ExecutionStatus::Running).unwrap(), "\"RUNNING\"");
    assert_eq!(serde_json::to_string(&ErrorStage::Runtime).unwrap(), "\"runtime\"");
}

#[test]
fn phase_mirrors_status() {
    let exe = Execution::builder().status(ExecutionStatus::Building).build();
    assert_eq!(exe.phase(), "building");
}

#[test]
fn from_submission_starts_queued() {
    let sub = Submission::new("agent-7", "local-model")
        .user_id("u-1")
        .query("what is 2+2")
        .timeout_ms(5_000)
        .priority(0)
        .system_prompt("be terse");
    let exe = Execution::from_submission(ExecutionId::from_string("exe-1"), &sub, 42);
    assert_eq!(exe.status, ExecutionStatus::Queued);
    assert_eq!(exe.agent_id, "agent-7");
    assert_eq!(exe.system_prompt.as_deref(), Some("be terse"));
    assert_eq!(exe.metrics.submitted_at_ms, 42);
    assert_eq!(exe.timeout_ms, 5_000);
}

#[test]
fn advance_stamps_timing_metrics() {
    let mut exe = Execution::builder().build();
    let submitted = exe.metrics.submitted_at_ms;

    assert!(exe.advance(ExecutionStatus::Building, submitted + 100));
    assert!(exe.advance(ExecutionStatus::Running, submitted + 400));
    assert!(exe.advance(ExecutionStatus::Completed, submitted + 1_400));

    assert_eq!(exe.metrics.queue_wait_ms, Some(100));
    assert_eq!(exe.metrics.build_time_ms, Some(300));
    assert_eq!(exe.metrics.execution_time_ms, Some(1_000));
    assert_eq!(exe.metrics.completed_at_ms, Some(submitted + 1_400));
}

#[test]
fn advance_rejects_leaving_terminal() {
    let mut exe = Execution::builder().status(ExecutionStatus::Completed).build();
    assert!(!exe.advance(ExecutionStatus::Failed, 5));
    assert_eq!(exe.status, ExecutionStatus::Completed);
}

#[test]
fn reset_for_retry_clears_outcome() {
    let mut exe = Execution::builder().status(ExecutionStatus::Failed).build();
    exe.error = Some("boom".into());
    exe.error_stage = Some(ErrorStage::Build);
    exe.handles.task_id = Some("task-1".into());
    exe.log_offset = 9;

    exe.reset_for_retry(1);

    assert_eq!(exe.status, ExecutionStatus::Queued);
    assert_eq!(exe.attempts, 1);
    assert!(exe.error.is_none());
    assert!(exe.handles.task_id.is_none());
    assert_eq!(exe.log_offset, 0);
}

#[test]
fn deadline_requires_start() {
    let mut exe = Execution::builder().timeout_ms(1_000).build();
    assert_eq!(exe.deadline_ms(500), None);
    exe.advance(ExecutionStatus::Running, 2_000_000);
    assert_eq!(exe.deadline_ms(500), Some(2_001_500));
}
