// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Timer identifiers for delayed callbacks.
//!
//! Timer ids are plain strings of the form `kind:execution` so they survive
//! serialization; [`TimerKind`] gives them a typed shape for routing.

use crate::execution::ExecutionId;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TimerId(SmolStr);

impl TimerId {
    pub fn from_string(id: impl Into<SmolStr>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn log_poll(execution: &ExecutionId) -> Self {
        TimerKind::LogPoll(execution.clone()).to_timer_id()
    }

    pub fn timeout(execution: &ExecutionId) -> Self {
        TimerKind::Timeout(execution.clone()).to_timer_id()
    }

    pub fn sweep() -> Self {
        TimerKind::Sweep.to_timer_id()
    }

    pub fn reclaim() -> Self {
        TimerKind::Reclaim.to_timer_id()
    }

    pub fn checkpoint() -> Self {
        TimerKind::Checkpoint.to_timer_id()
    }

    /// Parse this timer ID into a typed `TimerKind`.
    pub fn kind(&self) -> Option<TimerKind> {
        TimerKind::parse(self.as_str())
    }
}

impl std::fmt::Display for TimerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TimerId {
    fn from(s: &str) -> Self {
        Self::from_string(s)
    }
}

/// Parsed representation of a timer ID for type-safe routing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimerKind {
    LogPoll(ExecutionId),
    Timeout(ExecutionId),
    Sweep,
    Reclaim,
    Checkpoint,
}

impl TimerKind {
    /// Returns `None` for unrecognized formats.
    pub fn parse(id: &str) -> Option<TimerKind> {
        match id {
            "sweep" => return Some(TimerKind::Sweep),
            "reclaim" => return Some(TimerKind::Reclaim),
            "checkpoint" => return Some(TimerKind::Checkpoint),
            _ => {}
        }
        let (kind, rest) = id.split_once(':')?;
        if rest.is_empty() {
            return None;
        }
        let execution = ExecutionId::from_string(rest);
        match kind {
            "log-poll" => Some(TimerKind::LogPoll(execution)),
            "timeout" => Some(TimerKind::Timeout(execution)),
            _ => None,
        }
    }

    pub fn to_timer_id(&self) -> TimerId {
        match self {
            TimerKind::LogPoll(id) => TimerId::from_string(format!("log-poll:{id}")),
            TimerKind::Timeout(id) => TimerId::from_string(format!("timeout:{id}")),
            TimerKind::Sweep => TimerId::from_string("sweep"),
            TimerKind::Reclaim => TimerId::from_string("reclaim"),
            TimerKind::Checkpoint => TimerId::from_string("checkpoint"),
        }
    }
}

#[cfg(test)]
#[path = "timer_tests.rs"]
mod tests;
