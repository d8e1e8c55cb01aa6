// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Queue entry event handlers.

use arq_core::{Event, QueueEntryStatus};

use super::MaterializedState;

pub(crate) fn apply(state: &mut MaterializedState, event: &Event) {
    match event {
        Event::QueueEntryCreated { entry } => {
            // Idempotency: skip if the entry already exists
            if state.queue.contains_key(entry.id.as_str()) {
                return;
            }
            if let Some(exe) = state.executions.get_mut(entry.execution_id.as_str()) {
                exe.entry_id = Some(entry.id.clone());
                exe.attempts = entry.attempts;
            }
            state.queue.insert(entry.id.to_string(), entry.clone());
        }

        Event::QueueEntryClaimed { id, at_ms } => {
            if let Some(entry) = state.queue.get_mut(id.as_str()) {
                if entry.status == QueueEntryStatus::Pending {
                    entry.status = QueueEntryStatus::Claimed;
                    entry.claimed_at_ms = Some(*at_ms);
                }
            }
        }

        Event::QueueEntryDeleted { id } => {
            if let Some(entry) = state.queue.remove(id.as_str()) {
                if let Some(exe) = state.executions.get_mut(entry.execution_id.as_str()) {
                    if exe.entry_id.as_ref() == Some(&entry.id) {
                        exe.entry_id = None;
                    }
                }
            }
        }

        _ => {}
    }
}
