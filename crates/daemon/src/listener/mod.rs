// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Listener task for handling socket I/O.
//!
//! The Listener runs in a spawned task, accepting connections and handling
//! each one on its own task so a slow client never blocks the engine loop.

use std::sync::Arc;

use arq_core::Clock;
use arq_engine::{CancelOutcome, Runtime, RuntimeError};
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::UnixListener;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::env::ipc_timeout;
use arq_daemon::protocol::{self, ExecutionSummary, Request, Response};

/// Shared daemon context for all request handlers.
pub(crate) struct ListenCtx<C: Clock> {
    pub runtime: Runtime<C>,
    pub shutdown: CancellationToken,
}

/// Listener task for accepting socket connections.
pub(crate) struct Listener<C: Clock> {
    unix: UnixListener,
    ctx: Arc<ListenCtx<C>>,
}

/// Errors from connection handling.
#[derive(Debug, Error)]
pub(crate) enum ConnectionError {
    #[error("Protocol error: {0}")]
    Protocol(#[from] protocol::ProtocolError),
}

impl<C: Clock> Listener<C> {
    pub fn new(unix: UnixListener, ctx: Arc<ListenCtx<C>>) -> Self {
        Self { unix, ctx }
    }

    /// Accept connections until shutdown, spawning a task for each.
    pub async fn run(self) {
        loop {
            tokio::select! {
                result = self.unix.accept() => match result {
                    Ok((stream, _)) => {
                        let ctx = Arc::clone(&self.ctx);
                        tokio::spawn(async move {
                            let (reader, writer) = stream.into_split();
                            if let Err(e) = handle_connection(reader, writer, &ctx).await {
                                log_connection_error(e);
                            }
                        });
                    }
                    Err(e) => error!("Unix accept error: {}", e),
                },
                _ = self.ctx.shutdown.cancelled() => break,
            }
        }
        debug!("listener stopped");
    }
}

fn log_connection_error(e: ConnectionError) {
    match e {
        ConnectionError::Protocol(protocol::ProtocolError::ConnectionClosed) => {
            debug!("Client disconnected")
        }
        ConnectionError::Protocol(protocol::ProtocolError::Timeout) => {
            warn!("Connection timeout")
        }
        _ => error!("Connection error: {}", e),
    }
}

/// Handle a single client connection: one request, one response.
pub(crate) async fn handle_connection<R, W, C>(
    mut reader: R,
    mut writer: W,
    ctx: &ListenCtx<C>,
) -> Result<(), ConnectionError>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
    C: Clock,
{
    let request = protocol::read_request(&mut reader, ipc_timeout()).await?;

    // Status polling is frequent; mutations are worth an info line
    if matches!(request, Request::Ping | Request::Get { .. } | Request::List) {
        debug!(request = %request.summary(), "received request");
    } else {
        info!(request = %request.summary(), "received request");
    }

    let response = handle_request(request, ctx).await;
    protocol::write_response(&mut writer, &response, ipc_timeout()).await?;
    Ok(())
}

/// Handle a single request and return a response.
pub(crate) async fn handle_request<C: Clock>(request: Request, ctx: &ListenCtx<C>) -> Response {
    match request {
        Request::Ping => Response::Pong,

        Request::Submit { submission } => match ctx.runtime.submit(*submission) {
            Ok(execution) => {
                spawn_sweep(&ctx.runtime);
                Response::Submitted { execution: Box::new(execution) }
            }
            Err(e) => error_response(e),
        },

        Request::Cancel { id } => match ctx.runtime.cancel(&id).await {
            Ok(CancelOutcome::Cancelled) => Response::Cancelled { id },
            Ok(CancelOutcome::AlreadyTerminal(status)) => Response::AlreadyTerminal { id, status },
            Err(e) => error_response(e),
        },

        Request::Get { id } => {
            Response::Execution { execution: ctx.runtime.get(&id).map(Box::new) }
        }

        Request::List => Response::Executions {
            executions: ctx.runtime.list().iter().map(ExecutionSummary::from).collect(),
        },

        Request::SandboxStatus { endpoint, runtime_id } => {
            match ctx.runtime.sandbox_status(&endpoint, &runtime_id).await {
                Ok(status) => Response::SandboxStatus { status },
                Err(e) => error_response(e),
            }
        }

        Request::Shutdown => {
            ctx.shutdown.cancel();
            Response::ShuttingDown
        }
    }
}

/// Admission runs off the request path so the submitter gets its ID at once.
fn spawn_sweep<C: Clock>(runtime: &Runtime<C>) {
    let runtime = runtime.clone();
    tokio::spawn(async move {
        let report = runtime.sweep().await;
        debug!(claimed = report.claimed, errors = report.errors, "submission sweep finished");
    });
}

fn error_response(e: RuntimeError) -> Response {
    Response::Error { message: e.to_string() }
}

#[cfg(test)]
#[path = "../listener_tests.rs"]
mod tests;
