// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The part of an agent that travels.
//!
//! `AgentState` is everything a hop serializes: identity, lineage
//! bookkeeping, the address directory, and the pending itinerary. The inbox
//! never travels; a transferred agent starts with an empty one and the
//! zombie left behind relays anything that arrives late.

use crate::directory::AgentDirectory;
use roam_core::hierarchy::{effective_fanout, parent_of};
use roam_core::{now_epoch_ms, AgentIdentity};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::net::IpAddr;

/// Entry point invoked when an agent first runs.
pub const INIT_ENTRY: &str = "init";

/// Reserved entry point the runtime dispatches itself to advance a gateway
/// itinerary. Behaviors never see it.
pub const HOP_RELAY_ENTRY: &str = "hop-relay";

fn default_entry() -> String {
    INIT_ENTRY.to_string()
}

fn default_cache_enabled() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentState {
    pub identity: AgentIdentity,
    /// Name of the code unit this agent executes.
    pub unit: String,
    /// Session tag shared by a whole injection, for status listings.
    #[serde(default)]
    pub client: String,
    /// Branching factor of the lineage tree.
    pub max_children: i32,
    #[serde(default)]
    pub next_child_id: i32,
    #[serde(default)]
    pub child_ids: BTreeSet<i32>,
    /// Children started and not yet exited, tracked by notices.
    #[serde(default)]
    pub alive_children: i32,
    #[serde(default)]
    pub directory: AgentDirectory,
    /// Set on the copy left behind by a successful hop.
    #[serde(default)]
    pub forwarding_addr: Option<IpAddr>,
    /// Set by a hop that lands on the host it left; the arrival skips its
    /// start notice and the cell left behind winds down silently.
    #[serde(default)]
    pub local_hop: bool,
    /// Pending itinerary while traversing gateways.
    #[serde(default)]
    pub dest_host: Option<String>,
    #[serde(default)]
    pub dest_gateways: Vec<String>,
    #[serde(default)]
    pub dest_gateway_pos: i32,
    #[serde(default = "default_entry")]
    pub dest_entry: String,
    #[serde(default)]
    pub dest_args: Vec<String>,
    /// Entry point to invoke on next arrival.
    #[serde(default = "default_entry")]
    pub next_entry: String,
    #[serde(default)]
    pub next_args: Vec<String>,
    /// Whether this agent learns shortcuts from message trails.
    #[serde(default = "default_cache_enabled")]
    pub cache_enabled: bool,
}

impl AgentState {
    /// A lineage root, minted at the injecting host.
    pub fn root(
        origin: IpAddr,
        unit: impl Into<String>,
        client: impl Into<String>,
        max_children: i32,
    ) -> Self {
        Self::with_identity(
            AgentIdentity::new(origin, now_epoch_ms(), 0),
            unit,
            client,
            max_children,
        )
    }

    pub fn with_identity(
        identity: AgentIdentity,
        unit: impl Into<String>,
        client: impl Into<String>,
        max_children: i32,
    ) -> Self {
        Self {
            identity,
            unit: unit.into(),
            client: client.into(),
            max_children,
            next_child_id: 0,
            child_ids: BTreeSet::new(),
            alive_children: 0,
            directory: AgentDirectory::new(),
            forwarding_addr: None,
            local_hop: false,
            dest_host: None,
            dest_gateways: Vec::new(),
            dest_gateway_pos: 0,
            dest_entry: default_entry(),
            dest_args: Vec::new(),
            next_entry: default_entry(),
            next_args: Vec::new(),
            cache_enabled: true,
        }
    }

    /// State for a child being spawned from this agent. The child shares the
    /// lineage identity and branching; its entry point is `init`.
    pub fn child(&self, child_id: i32, unit: impl Into<String>, args: &[String]) -> Self {
        let mut child = Self::with_identity(
            self.identity.sibling(child_id),
            unit,
            self.client.clone(),
            self.max_children,
        );
        child.next_args = args.to_vec();
        child
    }

    pub fn agent_id(&self) -> i32 {
        self.identity.agent_id
    }

    pub fn parent_id(&self) -> Option<i32> {
        parent_of(self.identity.agent_id, self.max_children)
    }

    /// Child slots available to this agent.
    pub fn fanout(&self) -> i32 {
        effective_fanout(self.identity.agent_id, self.max_children)
    }

    pub fn is_zombie(&self) -> bool {
        self.forwarding_addr.is_some()
    }

    /// Lowest and highest legal child id for this agent.
    pub fn child_id_bounds(&self) -> (i32, i32) {
        let fanout = self.fanout();
        let low = self.identity.agent_id * fanout + self.root_shift();
        (low, low + fanout - 1)
    }

    fn root_shift(&self) -> i32 {
        if self.identity.agent_id == 0 {
            1
        } else {
            0
        }
    }

    /// Claim the next unused child id, rotating through the legal slots.
    /// `None` when the agent is at capacity.
    pub fn assign_child_id(&mut self) -> Option<i32> {
        let fanout = self.fanout();
        if self.child_ids.len() >= fanout as usize {
            return None;
        }
        let base = self.identity.agent_id * fanout + self.root_shift();
        for _ in 0..fanout {
            let candidate = base + self.next_child_id.rem_euclid(fanout);
            self.next_child_id += 1;
            if !self.child_ids.contains(&candidate) {
                return Some(candidate);
            }
        }
        None
    }

    /// Validate a caller-chosen child id. `None` when it is the root id,
    /// outside this agent's range, or already taken.
    pub fn accept_child_id(&self, id: i32) -> Option<i32> {
        if id == 0 {
            return None;
        }
        let (low, high) = self.child_id_bounds();
        if id < low || id > high || self.child_ids.contains(&id) {
            return None;
        }
        Some(id)
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }
}

#[cfg(test)]
#[path = "state_tests.rs"]
mod tests;
