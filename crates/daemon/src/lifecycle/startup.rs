// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon startup and initialization logic.

use std::future::Future;
use std::io::Write;
use std::sync::Arc;
use std::time::Instant;

use arq_adapters::{
    ContainerPlatform, DockerPlatform, HttpModelClient, HttpSandboxClient, KubernetesPlatform,
    ModelClient, SandboxClient,
};
use arq_core::SystemClock;
use arq_engine::{Runtime, RuntimeDeps};
use arq_storage::JobStore;
use fs2::FileExt;
use tokio::net::UnixListener;
use tracing::info;

use super::{Config, DaemonState, LifecycleError, StartupResult};
use crate::config::{ContainerRuntime, DaemonConfig};

/// Platform clients the runtime is wired to
pub(crate) struct Adapters {
    pub containers: Arc<dyn ContainerPlatform>,
    pub models: Arc<dyn ModelClient>,
    pub sandbox: Arc<dyn SandboxClient>,
}

/// Start the daemon
pub async fn startup(
    config: &Config,
    settings: DaemonConfig,
) -> Result<StartupResult, LifecycleError> {
    let runtime = settings.container_runtime();
    startup_with(config, settings, connect_adapters(runtime)).await
}

/// Start with caller-supplied adapters. They are built after the lock is
/// held so a second daemon never reaches the container platform.
pub(crate) async fn startup_with(
    config: &Config,
    settings: DaemonConfig,
    adapters: impl Future<Output = Result<Adapters, LifecycleError>>,
) -> Result<StartupResult, LifecycleError> {
    match startup_inner(config, settings, adapters).await {
        Ok(result) => Ok(result),
        Err(e) => {
            // Don't clean up if we failed to acquire the lock;
            // those files belong to the already-running daemon.
            if !matches!(e, LifecycleError::LockFailed(_)) {
                cleanup_on_failure(config);
            }
            Err(e)
        }
    }
}

async fn startup_inner(
    config: &Config,
    settings: DaemonConfig,
    adapters: impl Future<Output = Result<Adapters, LifecycleError>>,
) -> Result<StartupResult, LifecycleError> {
    // 1. State directory holds the socket, lock and store
    std::fs::create_dir_all(&config.state_dir)?;

    // 2. Acquire lock file FIRST. OpenOptions avoids truncating the
    // running daemon's PID before we hold the lock.
    let mut lock_file = std::fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(false)
        .open(&config.lock_path)?;
    lock_file.try_lock_exclusive().map_err(LifecycleError::LockFailed)?;
    lock_file.set_len(0)?;
    writeln!(lock_file, "{}", std::process::id())?;

    // 3. Recover the job store (snapshot + WAL replay)
    let store = JobStore::open(&config.state_dir)?;

    // 4. Wire the runtime
    let Adapters { containers, models, sandbox } = adapters.await?;
    let runtime = Runtime::new(
        RuntimeDeps { store, containers, models, sandbox },
        settings.runtime,
        SystemClock,
    );

    // 5. Resume supervision of containers that were running at shutdown
    let reconciled = runtime.reconcile();
    runtime.arm_periodic();

    // 6. Remove stale socket and bind (LAST - only after all validation passes)
    if config.socket_path.exists() {
        std::fs::remove_file(&config.socket_path)?;
    }
    let listener = UnixListener::bind(&config.socket_path)
        .map_err(|e| LifecycleError::BindFailed(config.socket_path.clone(), e))?;

    info!(
        state_dir = %config.state_dir.display(),
        reconciled,
        max_concurrent = runtime.config().max_concurrent,
        "daemon started"
    );

    Ok(StartupResult {
        daemon: DaemonState {
            config: config.clone(),
            lock_file,
            runtime,
            start_time: Instant::now(),
        },
        listener,
        reconciled,
    })
}

async fn connect_adapters(runtime: ContainerRuntime) -> Result<Adapters, LifecycleError> {
    let containers: Arc<dyn ContainerPlatform> = match runtime {
        ContainerRuntime::Docker => Arc::new(DockerPlatform::new()),
        ContainerRuntime::Kubernetes => Arc::new(KubernetesPlatform::new().await?),
    };
    info!(container_runtime = %runtime, "container platform ready");
    Ok(Adapters {
        containers,
        models: Arc::new(HttpModelClient::new()),
        sandbox: Arc::new(HttpSandboxClient::new()),
    })
}

/// Clean up resources on startup failure
fn cleanup_on_failure(config: &Config) {
    if config.socket_path.exists() {
        let _ = std::fs::remove_file(&config.socket_path);
    }
    if config.lock_path.exists() {
        let _ = std::fs::remove_file(&config.lock_path);
    }
}

#[cfg(test)]
#[path = "startup_tests.rs"]
mod tests;
