// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::test_helpers::*;
use arq_core::{ExecutionId, ExecutionStatus, FakeClock};
use arq_engine::{RuntimeConfig, CANCELLED_ERROR};
use arq_storage::JobStore;
use std::time::Duration;
use tempfile::tempdir;

fn ctx() -> (ListenCtx<FakeClock>, Fakes) {
    let fakes = Fakes::new();
    let runtime = fakes.runtime(JobStore::in_memory(), RuntimeConfig::default(), FakeClock::new());
    (ListenCtx { runtime, shutdown: CancellationToken::new() }, fakes)
}

async fn submit(ctx: &ListenCtx<FakeClock>) -> ExecutionId {
    let request = Request::Submit { submission: Box::new(container_job()) };
    match handle_request(request, ctx).await {
        Response::Submitted { execution } => execution.id,
        other => panic!("expected Submitted, got {other:?}"),
    }
}

async fn wait_for_status(ctx: &ListenCtx<FakeClock>, id: &ExecutionId, status: ExecutionStatus) {
    let waited = tokio::time::timeout(Duration::from_secs(2), async {
        while ctx.runtime.get(id.as_str()).map(|e| e.status) != Some(status) {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await;
    assert!(waited.is_ok(), "execution never reached {status}");
}

#[tokio::test]
async fn ping_answers_pong() {
    let (ctx, _) = ctx();
    assert_eq!(handle_request(Request::Ping, &ctx).await, Response::Pong);
}

#[tokio::test]
async fn submit_returns_queued_execution_then_dispatches() {
    let (ctx, fakes) = ctx();

    let request = Request::Submit { submission: Box::new(container_job()) };
    let Response::Submitted { execution } = handle_request(request, &ctx).await else {
        panic!("expected Submitted");
    };
    assert_eq!(execution.status, ExecutionStatus::Queued);

    wait_for_status(&ctx, &execution.id, ExecutionStatus::Running).await;
    assert_eq!(fakes.containers.run_count(), 1);
}

#[tokio::test]
async fn invalid_submission_is_an_error_response() {
    let (ctx, _) = ctx();
    let submission = arq_core::Submission::new("  ", "managed-container");

    let response = handle_request(Request::Submit { submission: Box::new(submission) }, &ctx).await;

    let Response::Error { message } = response else {
        panic!("expected Error, got {response:?}");
    };
    assert!(message.contains("agent_id"), "{message}");
    assert!(ctx.runtime.list().is_empty());
}

#[tokio::test]
async fn cancel_then_cancel_again() {
    let (ctx, _) = ctx();
    let id = ctx.runtime.submit(container_job()).unwrap().id;

    let first = handle_request(Request::Cancel { id: id.to_string() }, &ctx).await;
    assert_eq!(first, Response::Cancelled { id: id.to_string() });
    let exe = ctx.runtime.get(id.as_str()).unwrap();
    assert_eq!(exe.error.as_deref(), Some(CANCELLED_ERROR));

    let second = handle_request(Request::Cancel { id: id.to_string() }, &ctx).await;
    assert_eq!(
        second,
        Response::AlreadyTerminal { id: id.to_string(), status: ExecutionStatus::Failed }
    );
}

#[tokio::test]
async fn cancel_unknown_is_an_error() {
    let (ctx, _) = ctx();
    let response = handle_request(Request::Cancel { id: "exe-missing".to_string() }, &ctx).await;
    assert!(matches!(response, Response::Error { .. }), "got {response:?}");
}

#[tokio::test]
async fn get_by_prefix_and_missing() {
    let (ctx, _) = ctx();
    let id = ctx.runtime.submit(container_job()).unwrap().id;
    let prefix = id.as_str()[..10].to_string();

    let Response::Execution { execution: Some(found) } =
        handle_request(Request::Get { id: prefix }, &ctx).await
    else {
        panic!("expected a match");
    };
    assert_eq!(found.id, id);

    let missing = handle_request(Request::Get { id: "exe-nope".to_string() }, &ctx).await;
    assert_eq!(missing, Response::Execution { execution: None });
}

#[tokio::test]
async fn list_returns_summaries_in_submission_order() {
    let (ctx, _) = ctx();
    let first = ctx.runtime.submit(container_job()).unwrap().id;
    ctx.runtime.clock().advance(Duration::from_millis(1));
    let second = ctx.runtime.submit(container_job().priority(2)).unwrap().id;

    let Response::Executions { executions } = handle_request(Request::List, &ctx).await else {
        panic!("expected Executions");
    };
    let ids: Vec<&str> = executions.iter().map(|e| e.id.as_str()).collect();
    assert_eq!(ids, vec![first.as_str(), second.as_str()]);
    assert!(executions.iter().all(|e| e.status == ExecutionStatus::Queued && e.attempts == 0));
}

#[tokio::test]
async fn sandbox_status_reports_remote_state() {
    let (ctx, fakes) = ctx();
    fakes.sandbox.set_state("PROVISIONING");

    let request = Request::SandboxStatus {
        endpoint: "http://sandbox.test".to_string(),
        runtime_id: "rt-1".to_string(),
    };
    let Response::SandboxStatus { status } = handle_request(request, &ctx).await else {
        panic!("expected SandboxStatus");
    };
    assert_eq!(status.state, "PROVISIONING");
    assert!(!status.is_ready());
}

#[tokio::test]
async fn shutdown_cancels_the_token() {
    let (ctx, _) = ctx();
    assert_eq!(handle_request(Request::Shutdown, &ctx).await, Response::ShuttingDown);
    assert!(ctx.shutdown.is_cancelled());
}

#[tokio::test]
async fn connection_reads_request_and_writes_response() {
    let (ctx, _) = ctx();
    let (mut client, server) = tokio::io::duplex(4096);
    let (reader, writer) = tokio::io::split(server);

    protocol::write_request(&mut client, &Request::Ping, Duration::from_secs(1)).await.unwrap();
    handle_connection(reader, writer, &ctx).await.unwrap();
    let response = protocol::read_response(&mut client, Duration::from_secs(1)).await.unwrap();

    assert_eq!(response, Response::Pong);
}

#[tokio::test]
async fn closed_connection_is_reported_as_closed() {
    let (ctx, _) = ctx();
    let (client, server) = tokio::io::duplex(64);
    drop(client);
    let (reader, writer) = tokio::io::split(server);

    let err = handle_connection(reader, writer, &ctx).await.unwrap_err();
    assert!(matches!(err, ConnectionError::Protocol(protocol::ProtocolError::ConnectionClosed)));
}

#[tokio::test]
async fn listener_serves_unix_socket_until_shutdown() {
    let dir = tempdir().unwrap();
    let socket = dir.path().join("arqd.sock");
    let (ctx, _) = ctx();
    let ctx = Arc::new(ctx);
    let listener = Listener::new(UnixListener::bind(&socket).unwrap(), Arc::clone(&ctx));
    let task = tokio::spawn(listener.run());

    let exchanges = [(Request::Ping, Response::Pong), (Request::Shutdown, Response::ShuttingDown)];
    for (request, expected) in exchanges {
        let mut stream = tokio::net::UnixStream::connect(&socket).await.unwrap();
        protocol::write_request(&mut stream, &request, Duration::from_secs(1)).await.unwrap();
        let response = protocol::read_response(&mut stream, Duration::from_secs(1)).await.unwrap();
        assert_eq!(response, expected);
    }

    tokio::time::timeout(Duration::from_secs(2), task).await.unwrap().unwrap();
}
