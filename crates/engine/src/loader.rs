// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-agent unit resolution.
//!
//! Each resident agent gets a fresh loader on arrival, built from the unit
//! blobs it carried. Resolution order: a binding this loader already
//! materialized (exact name, then suffix), then a carried-blob name (exact,
//! then suffix) bound against the process registry, then the registry
//! directly for units native to this host. A name is materialized at most
//! once per loader; later lookups reuse the cached binding.

use crate::error::UnitError;
use crate::registry::{Behavior, UnitRegistry};
use parking_lot::Mutex;
use roam_core::UnitTable;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

pub struct UnitLoader {
    registry: Arc<UnitRegistry>,
    carried: UnitTable,
    materialized: Mutex<HashMap<String, Arc<dyn Behavior>>>,
}

impl UnitLoader {
    pub fn new(registry: Arc<UnitRegistry>, carried: UnitTable) -> Self {
        Self {
            registry,
            carried,
            materialized: Mutex::new(HashMap::new()),
        }
    }

    /// Names of the unit blobs this loader arrived with.
    pub fn carried_names(&self) -> Vec<String> {
        self.carried.names()
    }

    /// Resolve `name` to runnable behavior.
    pub fn resolve(&self, name: &str) -> Result<Arc<dyn Behavior>, UnitError> {
        if let Some(behavior) = self.lookup_materialized(name) {
            return Ok(behavior);
        }

        if let Some(resolved) = self.carried.resolve_name(name) {
            let resolved = resolved.to_string();
            if let Some(behavior) = self.materialize(&resolved, name) {
                return Ok(behavior);
            }
            debug!(unit = %resolved, "carried unit has no registry binding here");
        }

        // Host-local environment: units that never traveled with the agent.
        self.registry
            .instantiate(name)
            .ok_or_else(|| UnitError::Unknown(name.to_string()))
    }

    fn lookup_materialized(&self, name: &str) -> Option<Arc<dyn Behavior>> {
        let materialized = self.materialized.lock();
        if let Some(behavior) = materialized.get(name) {
            return Some(Arc::clone(behavior));
        }
        materialized
            .iter()
            .find(|(bound, _)| bound.ends_with(name))
            .map(|(_, behavior)| Arc::clone(behavior))
    }

    /// Bind a carried name to its registry entry and cache the binding. The
    /// carried name wins the cache key so suffix lookups keep hitting it.
    fn materialize(&self, resolved: &str, requested: &str) -> Option<Arc<dyn Behavior>> {
        let behavior = self
            .registry
            .instantiate(resolved)
            .or_else(|| self.registry.instantiate(requested))?;
        let mut materialized = self.materialized.lock();
        let entry = materialized
            .entry(resolved.to_string())
            .or_insert_with(|| Arc::clone(&behavior));
        Some(Arc::clone(entry))
    }
}

impl std::fmt::Debug for UnitLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UnitLoader")
            .field("carried", &self.carried.names())
            .field("materialized", &self.materialized.lock().len())
            .finish()
    }
}

#[cfg(test)]
#[path = "loader_tests.rs"]
mod tests;
