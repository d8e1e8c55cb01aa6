// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Engine loop: sleeps until the next timer deadline and runs whatever fired.

use std::time::Instant;

use arq_core::Clock;
use arq_engine::Runtime;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Drive the runtime's timers until `shutdown` is cancelled.
///
/// Each fired timer runs on its own task, so one slow container poll
/// never holds up a sweep.
pub(crate) async fn run<C: Clock>(runtime: Runtime<C>, shutdown: CancellationToken) {
    loop {
        for id in runtime.take_fired_timers() {
            let runtime = runtime.clone();
            tokio::spawn(async move {
                if let Err(e) = runtime.handle_timer(id.clone()).await {
                    warn!(timer = %id, error = %e, "timer handler failed");
                }
            });
        }

        let deadline = runtime.next_deadline();
        tokio::select! {
            _ = sleep_until(deadline) => {}
            _ = runtime.timers_changed() => {}
            _ = shutdown.cancelled() => break,
        }
    }
    debug!("engine loop stopped");
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline.into()).await,
        None => std::future::pending().await,
    }
}

#[cfg(test)]
#[path = "engine_loop_tests.rs"]
mod tests;
