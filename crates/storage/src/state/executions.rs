// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Execution event handlers.

use arq_core::{Event, ExecutionStatus};

use super::MaterializedState;

pub(crate) fn apply(state: &mut MaterializedState, event: &Event) {
    match event {
        Event::ExecutionSubmitted { execution } => {
            state
                .executions
                .entry(execution.id.to_string())
                .or_insert_with(|| execution.as_ref().clone());
        }

        Event::ExecutionStatusChanged { id, status, at_ms } => {
            if let Some(exe) = state.executions.get_mut(id.as_str()) {
                exe.advance(*status, *at_ms);
            }
        }

        Event::ExecutionBackendAttached { id, handles, cpu_units, memory_mb } => {
            if let Some(exe) = state.executions.get_mut(id.as_str()) {
                if exe.is_terminal() {
                    return;
                }
                let h = &mut exe.handles;
                h.task_id = handles.task_id.clone().or(h.task_id.take());
                h.log_group = handles.log_group.clone().or(h.log_group.take());
                h.log_stream = handles.log_stream.clone().or(h.log_stream.take());
                h.runtime_id = handles.runtime_id.clone().or(h.runtime_id.take());
                h.session_id = handles.session_id.clone().or(h.session_id.take());
                if cpu_units.is_some() {
                    exe.metrics.cpu_units = *cpu_units;
                }
                if memory_mb.is_some() {
                    exe.metrics.memory_mb = *memory_mb;
                }
            }
        }

        Event::ExecutionCompleted { id, response, usage, at_ms } => {
            if let Some(exe) = state.executions.get_mut(id.as_str()) {
                if exe.advance(ExecutionStatus::Completed, *at_ms) {
                    exe.response = response.clone();
                    exe.metrics.usage = *usage;
                }
            }
        }

        Event::ExecutionFailed { id, stage, error, at_ms } => {
            if let Some(exe) = state.executions.get_mut(id.as_str()) {
                if exe.advance(ExecutionStatus::Failed, *at_ms) {
                    exe.error = Some(error.clone());
                    exe.error_stage = Some(*stage);
                }
            }
        }

        Event::ExecutionRequeued { id, entry_id, attempts } => {
            if let Some(exe) = state.executions.get_mut(id.as_str()) {
                // A completed run is never retried
                if exe.status == ExecutionStatus::Completed {
                    return;
                }
                exe.reset_for_retry(*attempts);
                exe.entry_id = Some(entry_id.clone());
            }
        }

        Event::LogsAppended { id, lines, source_offset, at_ms } => {
            if let Some(exe) = state.executions.get_mut(id.as_str()) {
                match source_offset {
                    Some(offset) if *offset != exe.log_offset => return,
                    Some(_) => exe.log_offset += lines.len() as u64,
                    None => {}
                }
                exe.logs.extend(lines.iter().cloned());
                exe.metrics.last_log_at_ms = Some(*at_ms);
            }
        }

        Event::PollFailuresSet { id, count } => {
            if let Some(exe) = state.executions.get_mut(id.as_str()) {
                exe.poll_failures = *count;
            }
        }

        _ => {}
    }
}
