// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! arqd: agent run queue daemon

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod config;
mod engine_loop;
mod env;
mod lifecycle;
mod listener;
#[cfg(test)]
mod test_helpers;

use std::process::ExitCode;
use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use crate::config::DaemonConfig;
use crate::lifecycle::{Config, LifecycleError};
use crate::listener::{ListenCtx, Listener};

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("daemon failed: {}", e);
            eprintln!("arqd: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<(), LifecycleError> {
    let config = Config::load()?;
    std::fs::create_dir_all(&config.state_dir)?;
    // Held until exit so buffered log lines are flushed
    let _log_guard = init_logging(&config);

    let settings = DaemonConfig::load(&config.config_path)?;
    let started = lifecycle::startup(&config, settings).await?;
    let mut daemon = started.daemon;

    let shutdown = CancellationToken::new();
    let ctx = Arc::new(ListenCtx { runtime: daemon.runtime.clone(), shutdown: shutdown.clone() });
    let listener = tokio::spawn(Listener::new(started.listener, ctx).run());
    let engine = tokio::spawn(engine_loop::run(daemon.runtime.clone(), shutdown.clone()));

    info!(socket = %config.socket_path.display(), reconciled = started.reconciled, "READY");
    println!("READY");

    tokio::select! {
        result = tokio::signal::ctrl_c() => match result {
            Ok(()) => info!("interrupt received"),
            Err(e) => error!("failed to listen for ctrl-c: {}", e),
        },
        _ = shutdown.cancelled() => info!("shutdown requested"),
    }
    shutdown.cancel();
    join_tasks(vec![("listener", listener), ("engine loop", engine)]).await;

    daemon.shutdown()
}

/// Wait for the daemon's tasks and log any that panicked or were aborted.
/// Returns the names of those.
async fn join_tasks(tasks: Vec<(&'static str, JoinHandle<()>)>) -> Vec<&'static str> {
    let mut failed = Vec::new();
    for (task, handle) in tasks {
        if let Err(e) = handle.await {
            error!(task, error = %e, "task ended abnormally");
            failed.push(task);
        }
    }
    failed
}

fn init_logging(config: &Config) -> WorkerGuard {
    let dir = config.log_path.parent().unwrap_or(&config.state_dir);
    let file_name = config.log_path.file_name().unwrap_or_else(|| "arqd.log".as_ref());
    let appender = tracing_appender::rolling::never(dir, file_name);
    let (writer, guard) = tracing_appender::non_blocking(appender);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(writer).with_ansi(false).init();
    guard
}

#[cfg(test)]
#[path = "main_tests.rs"]
mod tests;
