// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared fixtures for daemon tests

use std::future::Future;
use std::path::Path;
use std::sync::Arc;

use arq_adapters::{FakeContainerPlatform, FakeModelClient, FakeSandboxClient};
use arq_core::{Clock, Submission};
use arq_engine::{Runtime, RuntimeConfig, RuntimeDeps};
use arq_storage::JobStore;

use crate::lifecycle::{Adapters, Config, LifecycleError};

#[derive(Clone, Default)]
pub(crate) struct Fakes {
    pub containers: FakeContainerPlatform,
    pub models: FakeModelClient,
    pub sandbox: FakeSandboxClient,
}

impl Fakes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn adapters(&self) -> Adapters {
        Adapters {
            containers: Arc::new(self.containers.clone()),
            models: Arc::new(self.models.clone()),
            sandbox: Arc::new(self.sandbox.clone()),
        }
    }

    /// Adapter future for `startup_with`
    pub fn ready(&self) -> impl Future<Output = Result<Adapters, LifecycleError>> {
        std::future::ready(Ok(self.adapters()))
    }

    pub fn runtime<C: Clock>(&self, store: JobStore, config: RuntimeConfig, clock: C) -> Runtime<C> {
        let Adapters { containers, models, sandbox } = self.adapters();
        Runtime::new(RuntimeDeps { store, containers, models, sandbox }, config, clock)
    }
}

pub(crate) fn test_config(dir: &Path) -> Config {
    Config::for_state_dir(dir.to_path_buf())
}

pub(crate) fn container_job() -> Submission {
    Submission::new("agent-1", "managed-container")
        .user_id("user-1")
        .query("what is 6*7?")
        .timeout_ms(60_000)
}
