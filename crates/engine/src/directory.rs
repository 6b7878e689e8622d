// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-agent address bookkeeping.
//!
//! Two tiers travel with every agent. The directory is authoritative and
//! holds relatives (parent and children); registrations overwrite it
//! unconditionally. The cache holds opportunistic shortcuts to anyone else
//! and is wholly discardable: flushing it can cost a longer route, never a
//! wrong one. A parallel table records the gateway chain needed to reach an
//! id that is not directly connected.

use roam_core::hierarchy::{is_child_of, parent_of};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::net::IpAddr;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AgentDirectory {
    #[serde(default)]
    directory: HashMap<i32, IpAddr>,
    #[serde(default)]
    cache: HashMap<i32, IpAddr>,
    #[serde(default)]
    gateways: HashMap<i32, Vec<String>>,
}

impl AgentDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Authoritative registration. Overwrites any previous address; the
    /// gateway chain is replaced only when one is supplied.
    pub fn register(&mut self, id: i32, addr: IpAddr, gateways: &[String]) {
        self.directory.insert(id, addr);
        if !gateways.is_empty() {
            self.gateways.insert(id, gateways.to_vec());
        }
    }

    /// Directory hit first, cache second.
    pub fn lookup(&self, id: i32) -> Option<IpAddr> {
        self.directory
            .get(&id)
            .or_else(|| self.cache.get(&id))
            .copied()
    }

    pub fn lookup_directory(&self, id: i32) -> Option<IpAddr> {
        self.directory.get(&id).copied()
    }

    /// Remove the directory entry for `id` only while it still carries
    /// `addr`. A fresher registration survives an out-of-date removal.
    pub fn remove_if_at(&mut self, id: i32, addr: IpAddr) -> bool {
        if self.directory.get(&id) == Some(&addr) {
            self.directory.remove(&id);
            true
        } else {
            false
        }
    }

    /// Cache a shortcut, or drop it when no address is supplied.
    pub fn cache_put(&mut self, id: i32, addr: Option<IpAddr>) {
        match addr {
            Some(addr) => {
                self.cache.insert(id, addr);
            }
            None => {
                self.cache.remove(&id);
            }
        }
    }

    /// True when the cache already holds exactly this pair.
    pub fn cache_holds(&self, id: i32, addr: IpAddr) -> bool {
        self.cache.get(&id) == Some(&addr)
    }

    /// Ids currently cached, in no particular order.
    pub fn cached_ids(&self) -> Vec<i32> {
        self.cache.keys().copied().collect()
    }

    pub fn cached_entries(&self) -> Vec<(i32, IpAddr)> {
        self.cache.iter().map(|(id, addr)| (*id, *addr)).collect()
    }

    /// Gateway chain recorded for `id`, outermost first.
    pub fn gateway_chain(&self, id: i32) -> Vec<String> {
        self.gateways.get(&id).cloned().unwrap_or_default()
    }

    pub fn flush_cache(&mut self) {
        self.cache.clear();
    }

    /// Drop every directory entry except the owner's relatives. Gateway
    /// chains are kept; they are only ever replaced by a registration.
    pub fn retain_relatives(&mut self, owner: i32, branching: i32) {
        let parent = parent_of(owner, branching);
        self.directory
            .retain(|id, _| Some(*id) == parent || is_child_of(owner, *id, branching));
    }

    pub fn directory_len(&self) -> usize {
        self.directory.len()
    }

    pub fn cache_len(&self) -> usize {
        self.cache.len()
    }
}

#[cfg(test)]
#[path = "directory_tests.rs"]
mod tests;
