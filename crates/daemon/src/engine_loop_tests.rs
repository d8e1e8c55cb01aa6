// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::test_helpers::*;
use arq_core::{ExecutionStatus, FakeClock, TimerId};
use arq_engine::RuntimeConfig;
use arq_storage::JobStore;
use std::time::Duration;

#[tokio::test]
async fn periodic_sweep_dispatches_queued_work() {
    let fakes = Fakes::new();
    let runtime = fakes.runtime(JobStore::in_memory(), RuntimeConfig::default(), FakeClock::new());
    let id = runtime.submit(container_job()).unwrap().id;
    runtime.arm_periodic();

    let shutdown = CancellationToken::new();
    let task = tokio::spawn(run(runtime.clone(), shutdown.clone()));

    let dispatched = tokio::time::timeout(Duration::from_secs(2), async {
        while runtime.get(id.as_str()).map(|e| e.status) != Some(ExecutionStatus::Running) {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await;
    assert!(dispatched.is_ok(), "sweep never dispatched the queued execution");
    assert!(runtime.is_scheduled(&TimerId::sweep()), "sweep re-arms itself");

    shutdown.cancel();
    tokio::time::timeout(Duration::from_secs(2), task).await.unwrap().unwrap();
}

#[tokio::test]
async fn loop_wakes_when_a_timer_is_armed() {
    let fakes = Fakes::new();
    let runtime = fakes.runtime(JobStore::in_memory(), RuntimeConfig::default(), FakeClock::new());
    let id = runtime.submit(container_job()).unwrap().id;

    let shutdown = CancellationToken::new();
    let task = tokio::spawn(run(runtime.clone(), shutdown.clone()));
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(runtime.get(id.as_str()).unwrap().status, ExecutionStatus::Queued);

    // Nothing was scheduled; arming a due sweep must wake the idle loop
    runtime.schedule(TimerId::sweep(), Duration::ZERO);

    let dispatched = tokio::time::timeout(Duration::from_secs(2), async {
        while runtime.get(id.as_str()).map(|e| e.status) != Some(ExecutionStatus::Running) {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await;
    assert!(dispatched.is_ok());

    shutdown.cancel();
    tokio::time::timeout(Duration::from_secs(2), task).await.unwrap().unwrap();
}

#[tokio::test]
async fn shutdown_stops_an_idle_loop() {
    let runtime =
        Fakes::new().runtime(JobStore::in_memory(), RuntimeConfig::default(), FakeClock::new());
    let shutdown = CancellationToken::new();
    let task = tokio::spawn(run(runtime, shutdown.clone()));

    shutdown.cancel();
    tokio::time::timeout(Duration::from_secs(1), task).await.unwrap().unwrap();
}
