// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Deadline timers for deferred work

use arq_core::TimerId;
use std::collections::HashMap;
use std::time::{Duration, Instant};

/// One-shot timers keyed by id. Setting an existing id replaces its deadline.
#[derive(Debug, Default)]
pub struct Scheduler {
    timers: HashMap<TimerId, Instant>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_timer(&mut self, id: TimerId, duration: Duration, now: Instant) {
        self.timers.insert(id, now + duration);
    }

    pub fn cancel_timer(&mut self, id: &TimerId) {
        self.timers.remove(id);
    }

    /// Remove and return every timer due at `now`, earliest first.
    pub fn fired_timers(&mut self, now: Instant) -> Vec<TimerId> {
        let mut due: Vec<(Instant, TimerId)> = self
            .timers
            .iter()
            .filter(|(_, deadline)| **deadline <= now)
            .map(|(id, deadline)| (*deadline, id.clone()))
            .collect();
        due.sort();
        for (_, id) in &due {
            self.timers.remove(id);
        }
        due.into_iter().map(|(_, id)| id).collect()
    }

    pub fn has_timers(&self) -> bool {
        !self.timers.is_empty()
    }

    pub fn is_set(&self, id: &TimerId) -> bool {
        self.timers.contains_key(id)
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.timers.values().min().copied()
    }
}

#[cfg(test)]
#[path = "scheduler_tests.rs"]
mod tests;
