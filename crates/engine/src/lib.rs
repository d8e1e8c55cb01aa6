// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! arq-engine: admission, routing and supervision of agent executions

mod backends;
pub mod config;
pub mod error;
pub mod recorder;
mod runtime;
pub mod scheduler;

pub use backends::{scan_markers, Completion, TIMEOUT_ERROR};
pub use config::{ContainerSettings, RuntimeConfig, FAILURE_MARKER, SUCCESS_MARKER};
pub use error::{DispatchError, RuntimeError};
pub use recorder::Recorder;
pub use runtime::{
    CancelOutcome, ReclaimReport, Runtime, RuntimeDeps, SweepReport, ABANDONED_ERROR,
    CANCELLED_ERROR,
};
pub use scheduler::Scheduler;
