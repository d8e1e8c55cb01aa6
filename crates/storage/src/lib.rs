// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! arq-storage: durable job store for the agent run queue

mod snapshot;
mod state;
mod store;
mod wal;

pub use snapshot::{Snapshot, SnapshotError, CURRENT_SNAPSHOT_VERSION};
pub use state::MaterializedState;
pub use store::{ClaimOutcome, JobStore, StoreError};
pub use wal::{Wal, WalEntry, WalError};
