// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Globally unique agent identity.
//!
//! An identity is fixed at injection time and survives every hop: the origin
//! host that injected the lineage, the epoch-ms timestamp of that injection,
//! and the agent's id within the lineage tree. Children share the origin and
//! timestamp of their root; only the id differs. The triple keys all
//! per-agent server-side state (unit tables, loaders, resident lookup).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::{IpAddr, Ipv4Addr};
use std::time::{SystemTime, UNIX_EPOCH};

/// Epoch-ms capture used when minting a lineage timestamp.
pub fn now_epoch_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AgentIdentity {
    /// Host that injected the lineage's root.
    pub origin: IpAddr,
    /// Epoch-ms capture at injection, shared by the whole lineage.
    pub spawned_at_ms: u64,
    /// Position in the lineage tree. 0 is the root.
    pub agent_id: i32,
}

impl AgentIdentity {
    pub fn new(origin: IpAddr, spawned_at_ms: u64, agent_id: i32) -> Self {
        Self { origin, spawned_at_ms, agent_id }
    }

    /// Identity of another member of the same lineage.
    pub fn sibling(&self, agent_id: i32) -> Self {
        Self { agent_id, ..*self }
    }

    pub fn is_root(&self) -> bool {
        self.agent_id == 0
    }
}

impl Default for AgentIdentity {
    fn default() -> Self {
        Self {
            origin: IpAddr::V4(Ipv4Addr::LOCALHOST),
            spawned_at_ms: 0,
            agent_id: 0,
        }
    }
}

impl fmt::Display for AgentIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}+{}", self.agent_id, self.origin, self.spawned_at_ms)
    }
}

#[cfg(test)]
#[path = "identity_tests.rs"]
mod tests;
