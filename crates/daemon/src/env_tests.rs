// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serial_test::serial;

fn clear_vars() {
    std::env::remove_var("ROAM_STATE_DIR");
    std::env::remove_var("XDG_STATE_HOME");
    std::env::remove_var("ROAM_LOG");
    std::env::remove_var("ROAM_PROBE_TIMEOUT_MS");
}

#[test]
#[serial]
fn explicit_state_dir_wins() {
    clear_vars();
    std::env::set_var("ROAM_STATE_DIR", "/tmp/roam-here");
    std::env::set_var("XDG_STATE_HOME", "/tmp/xdg");
    assert_eq!(state_dir().unwrap(), PathBuf::from("/tmp/roam-here"));
    clear_vars();
}

#[test]
#[serial]
fn xdg_state_home_is_the_fallback() {
    clear_vars();
    std::env::set_var("XDG_STATE_HOME", "/tmp/xdg");
    assert_eq!(state_dir().unwrap(), PathBuf::from("/tmp/xdg/roam"));
    clear_vars();
}

#[test]
#[serial]
fn home_is_the_last_resort() {
    clear_vars();
    let dir = state_dir().unwrap();
    assert!(dir.ends_with(".local/state/roam"), "got {}", dir.display());
}

#[test]
#[serial]
fn log_filter_defaults_to_info() {
    clear_vars();
    assert_eq!(log_filter(), "info");
    std::env::set_var("ROAM_LOG", "roam_engine=debug");
    assert_eq!(log_filter(), "roam_engine=debug");
    clear_vars();
}

#[test]
#[serial]
fn probe_timeout_parses_or_is_ignored() {
    clear_vars();
    assert_eq!(probe_timeout_ms(), None);
    std::env::set_var("ROAM_PROBE_TIMEOUT_MS", "250");
    assert_eq!(probe_timeout_ms(), Some(250));
    std::env::set_var("ROAM_PROBE_TIMEOUT_MS", "soon");
    assert_eq!(probe_timeout_ms(), None);
    clear_vars();
}
