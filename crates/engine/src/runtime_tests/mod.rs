// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Runtime tests driven through fake adapters and a fake clock

mod admission;
mod cancel;
mod container;
mod local;
mod properties;
mod reclaim;
mod sandbox;
mod timers;

use super::*;
use arq_adapters::{FakeContainerPlatform, FakeModelClient, FakeSandboxClient};
use arq_core::{Execution, ExecutionStatus, FakeClock, Submission};
use serde_json::json;

pub(super) struct TestContext {
    pub runtime: Runtime<FakeClock>,
    pub clock: FakeClock,
    pub containers: FakeContainerPlatform,
    pub models: FakeModelClient,
    pub sandbox: FakeSandboxClient,
}

pub(super) fn setup() -> TestContext {
    setup_with(RuntimeConfig::default())
}

pub(super) fn setup_with(config: RuntimeConfig) -> TestContext {
    let clock = FakeClock::new();
    let containers = FakeContainerPlatform::new();
    let models = FakeModelClient::new();
    let sandbox = FakeSandboxClient::new();
    let deps = RuntimeDeps {
        store: JobStore::in_memory(),
        containers: Arc::new(containers.clone()),
        models: Arc::new(models.clone()),
        sandbox: Arc::new(sandbox.clone()),
    };
    TestContext {
        runtime: Runtime::new(deps, config, clock.clone()),
        clock,
        containers,
        models,
        sandbox,
    }
}

pub(super) fn container_job() -> Submission {
    Submission::new("agent-1", "managed-container")
        .user_id("user-1")
        .query("what is 6*7?")
        .timeout_ms(60_000)
}

pub(super) fn local_job() -> Submission {
    Submission::new("agent-1", "local-model")
        .user_id("user-1")
        .query("what is 6*7?")
        .timeout_ms(30_000)
        .model_config(json!({ "model": "llama3", "temperature": 0.2 }))
}

pub(super) fn sandbox_job() -> Submission {
    Submission::new("agent-1", "managed-sandbox")
        .user_id("user-1")
        .query("what is 6*7?")
        .timeout_ms(30_000)
        .model_config(json!({ "endpoint": "http://sandbox.test", "runtimeId": "rt-1" }))
}

impl TestContext {
    pub fn submit(&self, submission: Submission) -> ExecutionId {
        self.runtime.submit(submission).unwrap().id
    }

    pub fn exe(&self, id: &ExecutionId) -> Execution {
        self.runtime.get(id.as_str()).unwrap()
    }

    pub fn status(&self, id: &ExecutionId) -> ExecutionStatus {
        self.exe(id).status
    }

    pub fn queue_len(&self) -> usize {
        self.runtime.store().read(|s| s.queue.len())
    }

    /// Run every timer that is due, including ones armed while running.
    pub async fn fire(&self) {
        loop {
            let fired = self.runtime.take_fired_timers();
            if fired.is_empty() {
                break;
            }
            for id in fired {
                self.runtime.handle_timer(id).await.unwrap();
            }
        }
    }

    pub async fn advance(&self, by: Duration) {
        self.clock.advance(by);
        self.fire().await;
    }

    /// Submit a container job and dispatch it; returns its id once RUNNING.
    pub async fn running_container(&self) -> ExecutionId {
        let id = self.submit(container_job());
        self.runtime.sweep().await;
        assert_eq!(self.status(&id), ExecutionStatus::Running);
        id
    }
}
