// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Place configuration.
//!
//! One struct carries everything a place needs at construction time: the
//! listen port, the optional gateway used when a hop target is not directly
//! reachable, tunnel bindings for NAT'd peers, and the substrate timing
//! knobs. Loaded from a TOML file, then overridden by CLI flags.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Port places listen on unless configured otherwise.
pub const DEFAULT_PORT: u16 = 65432;

/// Branching factor used when an injector does not specify one.
pub const DEFAULT_MAX_CHILDREN: i32 = 10;

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_probe_timeout_ms() -> u64 {
    5_000
}

fn default_kill_grace_ms() -> u64 {
    2_000
}

fn default_registration_wait_ms() -> u64 {
    10_000
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PlaceConfig {
    /// Display name for logs and status output. Defaults to the hostname.
    #[serde(default)]
    pub name: Option<String>,
    /// TCP listen port.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Gateway host tried when a hop destination fails the direct probe.
    #[serde(default)]
    pub gateway: Option<String>,
    /// Destination host -> local relay port. Connections to a tunneled host
    /// are redirected to `localhost:<port>` at connect time.
    #[serde(default)]
    pub tunnels: HashMap<String, u16>,
    /// Bound on the reachability probe and outbound connects.
    #[serde(default = "default_probe_timeout_ms")]
    pub probe_timeout_ms: u64,
    /// How long a killed agent group gets to wind down before a hard abort.
    #[serde(default = "default_kill_grace_ms")]
    pub kill_grace_ms: u64,
    /// Bound on the wait for a not-yet-registered child during forwarding.
    #[serde(default = "default_registration_wait_ms")]
    pub registration_wait_ms: u64,
}

impl Default for PlaceConfig {
    fn default() -> Self {
        Self {
            name: None,
            port: default_port(),
            gateway: None,
            tunnels: HashMap::new(),
            probe_timeout_ms: default_probe_timeout_ms(),
            kill_grace_ms: default_kill_grace_ms(),
            registration_wait_ms: default_registration_wait_ms(),
        }
    }
}

impl PlaceConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let config: Self = toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.port == 0 {
            return Err(ConfigError::Invalid("port must be non-zero".into()));
        }
        if self.probe_timeout_ms == 0 {
            return Err(ConfigError::Invalid("probe_timeout_ms must be non-zero".into()));
        }
        if let Some(gateway) = &self.gateway {
            if gateway.is_empty() {
                return Err(ConfigError::Invalid("gateway must not be empty".into()));
            }
        }
        Ok(())
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }

    pub fn kill_grace(&self) -> Duration {
        Duration::from_millis(self.kill_grace_ms)
    }

    pub fn registration_wait(&self) -> Duration {
        Duration::from_millis(self.registration_wait_ms)
    }

    /// Local relay port for a tunneled destination, if bound.
    pub fn tunnel_port(&self, host: &str) -> Option<u16> {
        self.tunnels.get(host).copied()
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
