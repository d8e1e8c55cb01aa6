// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::startup::startup_with;
use super::*;
use crate::config::DaemonConfig;
use crate::test_helpers::*;
use tempfile::tempdir;

#[test]
fn config_paths_live_under_state_dir() {
    let config = Config::for_state_dir(PathBuf::from("/var/arq"));

    assert_eq!(config.socket_path, PathBuf::from("/var/arq/arqd.sock"));
    assert_eq!(config.lock_path, PathBuf::from("/var/arq/arqd.pid"));
    assert_eq!(config.log_path, PathBuf::from("/var/arq/arqd.log"));
    assert_eq!(config.config_path, PathBuf::from("/var/arq/arq.toml"));
}

#[tokio::test]
async fn shutdown_removes_runtime_files_and_snapshots() {
    let dir = tempdir().unwrap();
    let config = test_config(dir.path());
    let mut result =
        startup_with(&config, DaemonConfig::default(), Fakes::new().ready()).await.unwrap();
    result.daemon.runtime.submit(container_job()).unwrap();

    result.daemon.shutdown().unwrap();

    assert!(!config.socket_path.exists());
    assert!(!config.lock_path.exists());
    assert!(dir.path().join("snapshot.zst").exists());
}

#[tokio::test]
async fn restart_after_shutdown_recovers_queue() {
    let dir = tempdir().unwrap();
    let config = test_config(dir.path());

    let id = {
        let mut result =
            startup_with(&config, DaemonConfig::default(), Fakes::new().ready()).await.unwrap();
        let exe = result.daemon.runtime.submit(container_job()).unwrap();
        result.daemon.shutdown().unwrap();
        exe.id
    };

    let result = startup_with(&config, DaemonConfig::default(), Fakes::new().ready()).await.unwrap();
    let exe = result.daemon.runtime.get(id.as_str()).unwrap();
    assert_eq!(exe.status, arq_core::ExecutionStatus::Queued);
    assert_eq!(result.daemon.runtime.store().read(|s| s.queue.len()), 1);
}
