// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! arq-core: data model for the agent run queue

pub mod macros;

pub mod backend;
pub mod clock;
pub mod event;
pub mod execution;
pub mod id;
pub mod queue;
pub mod timer;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use backend::{
    BackendConfig, BackendConfigError, ContainerJobConfig, LocalModelConfig, SandboxJobConfig,
};
pub use clock::{Clock, FakeClock, SystemClock};
pub use event::Event;
#[cfg(any(test, feature = "test-support"))]
pub use execution::ExecutionBuilder;
pub use execution::{
    AgentBundle, BackendHandles, ErrorStage, Execution, ExecutionId, ExecutionMetrics,
    ExecutionStatus, Submission, TokenUsage,
};
pub use id::short;
#[cfg(any(test, feature = "test-support"))]
pub use queue::QueueEntryBuilder;
pub use queue::{next_attempt, QueueEntry, QueueEntryId, QueueEntryStatus, MAX_ATTEMPTS};
pub use timer::{TimerId, TimerKind};
