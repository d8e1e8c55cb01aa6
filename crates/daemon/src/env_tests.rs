// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serial_test::serial;

fn clear() {
    for name in ["ARQ_STATE_DIR", "XDG_STATE_HOME", "ARQ_CONFIG", "ARQ_IPC_TIMEOUT_MS"] {
        std::env::remove_var(name);
    }
}

#[test]
#[serial]
fn state_dir_prefers_explicit_override() {
    clear();
    std::env::set_var("ARQ_STATE_DIR", "/tmp/arq-explicit");
    std::env::set_var("XDG_STATE_HOME", "/tmp/xdg");

    assert_eq!(state_dir().unwrap(), PathBuf::from("/tmp/arq-explicit"));
    clear();
}

#[test]
#[serial]
fn state_dir_falls_back_to_xdg() {
    clear();
    std::env::set_var("XDG_STATE_HOME", "/tmp/xdg");

    assert_eq!(state_dir().unwrap(), PathBuf::from("/tmp/xdg/arq"));
    clear();
}

#[test]
#[serial]
fn blank_override_is_ignored() {
    clear();
    std::env::set_var("ARQ_STATE_DIR", "  ");
    std::env::set_var("XDG_STATE_HOME", "/tmp/xdg");

    assert_eq!(state_dir().unwrap(), PathBuf::from("/tmp/xdg/arq"));
    clear();
}

#[test]
#[serial]
fn config_path_defaults_into_state_dir() {
    clear();
    assert_eq!(config_path(Path::new("/s")), PathBuf::from("/s/arq.toml"));

    std::env::set_var("ARQ_CONFIG", "/etc/arq.toml");
    assert_eq!(config_path(Path::new("/s")), PathBuf::from("/etc/arq.toml"));
    clear();
}

#[test]
#[serial]
fn ipc_timeout_ignores_garbage() {
    clear();
    std::env::set_var("ARQ_IPC_TIMEOUT_MS", "soon");
    assert_eq!(ipc_timeout(), Duration::from_secs(5));

    std::env::set_var("ARQ_IPC_TIMEOUT_MS", "250");
    assert_eq!(ipc_timeout(), Duration::from_millis(250));
    clear();
}

#[test]
#[serial]
fn parse_reports_raw_value_on_failure() {
    clear();
    std::env::set_var("ARQ_IPC_TIMEOUT_MS", "abc");
    assert_eq!(parse::<u64>("ARQ_IPC_TIMEOUT_MS"), Some(Err("abc".to_string())));
    clear();
    assert_eq!(parse::<u64>("ARQ_IPC_TIMEOUT_MS"), None);
}
