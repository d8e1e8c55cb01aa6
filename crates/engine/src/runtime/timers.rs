// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Timer dispatch and periodic triggers

use super::Runtime;
use crate::error::RuntimeError;
use arq_core::{Clock, TimerId, TimerKind};
use std::time::Duration;

impl<C: Clock> Runtime<C> {
    /// Arm the periodic triggers. The first sweep and reclaim run at once.
    pub fn arm_periodic(&self) {
        self.schedule(TimerId::sweep(), Duration::ZERO);
        self.schedule(TimerId::reclaim(), Duration::ZERO);
        self.schedule(TimerId::checkpoint(), self.config.checkpoint_interval());
    }

    /// Run the work a fired timer stands for. Periodic timers re-arm
    /// before running, so a slow sweep never delays the next one.
    pub async fn handle_timer(&self, id: TimerId) -> Result<(), RuntimeError> {
        let Some(kind) = id.kind() else {
            tracing::warn!(timer = %id, "unknown timer");
            return Ok(());
        };
        match kind {
            TimerKind::LogPoll(exe) => self.poll_logs(&exe).await,
            TimerKind::Timeout(exe) => self.handle_timeout(&exe).await.map(|_| ()),
            TimerKind::Sweep => {
                self.schedule(TimerId::sweep(), self.config.sweep_interval());
                self.sweep().await;
                Ok(())
            }
            TimerKind::Reclaim => {
                self.schedule(TimerId::reclaim(), self.config.reclaim_interval());
                self.reclaim().map(|_| ())
            }
            TimerKind::Checkpoint => {
                self.schedule(TimerId::checkpoint(), self.config.checkpoint_interval());
                self.store.checkpoint()?;
                Ok(())
            }
        }
    }
}
