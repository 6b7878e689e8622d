// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the daemon crate.

use std::path::PathBuf;

use crate::lifecycle::LifecycleError;

/// Resolve state directory: ROAM_STATE_DIR > XDG_STATE_HOME/roam >
/// ~/.local/state/roam
pub fn state_dir() -> Result<PathBuf, LifecycleError> {
    if let Ok(dir) = std::env::var("ROAM_STATE_DIR") {
        return Ok(PathBuf::from(dir));
    }
    if let Ok(xdg) = std::env::var("XDG_STATE_HOME") {
        return Ok(PathBuf::from(xdg).join("roam"));
    }
    dirs::home_dir()
        .map(|home| home.join(".local/state/roam"))
        .ok_or(LifecycleError::NoStateDir)
}

/// Log filter directives, `ROAM_LOG` or a plain `info` default.
pub fn log_filter() -> String {
    std::env::var("ROAM_LOG").unwrap_or_else(|_| "info".to_string())
}

/// Probe/connect timeout override in milliseconds.
pub fn probe_timeout_ms() -> Option<u64> {
    std::env::var("ROAM_PROBE_TIMEOUT_MS").ok().and_then(|s| s.parse::<u64>().ok())
}

#[cfg(test)]
#[path = "env_tests.rs"]
mod tests;
