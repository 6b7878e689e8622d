// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Process-wide dispatch table from code-unit names to runnable behavior.
//!
//! Carried code is a named reference, not executable bytes: every host
//! builds its registry at startup, and an arriving agent's unit name binds
//! to the local entry of the same name. A name that is registered nowhere an
//! agent travels cannot run there.

use crate::agent::AgentHandle;
use crate::error::EntryError;
use async_trait::async_trait;
use indexmap::IndexMap;
use std::sync::Arc;

/// Code a mobile agent executes at each place it visits.
///
/// `entry` is invoked with the entry-point name the agent arrived with
/// (`"init"` on first injection, whatever the previous `hop` named after
/// that) and the argument strings recorded for it. Implementations hold no
/// host-local state across hops; anything that must travel belongs in the
/// agent's own state or its envelope traffic.
#[async_trait]
pub trait Behavior: Send + Sync {
    async fn entry(
        &self,
        agent: &AgentHandle,
        entry: &str,
        args: &[String],
    ) -> Result<(), EntryError>;
}

impl std::fmt::Debug for dyn Behavior {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("dyn Behavior")
    }
}

type Factory = Arc<dyn Fn() -> Arc<dyn Behavior> + Send + Sync>;

/// Registered behaviors, keyed by unit name. Built once at startup and
/// shared read-only by every loader on the place.
#[derive(Clone)]
pub struct UnitRegistry {
    factories: IndexMap<String, Factory>,
}

impl UnitRegistry {
    pub fn new() -> Self {
        Self { factories: IndexMap::new() }
    }

    /// A registry preloaded with the units every place ships: currently the
    /// management unit under [`crate::monitor::MONITOR_UNIT`].
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(crate::monitor::MONITOR_UNIT, || {
            Arc::new(crate::monitor::MonitorUnit)
        });
        registry
    }

    /// Bind `name` to a behavior factory. Re-registering a name replaces the
    /// previous binding.
    pub fn register<F, B>(&mut self, name: impl Into<String>, factory: F)
    where
        F: Fn() -> Arc<B> + Send + Sync + 'static,
        B: Behavior + 'static,
    {
        let factory: Factory = Arc::new(move || factory() as Arc<dyn Behavior>);
        self.factories.insert(name.into(), factory);
    }

    /// Instantiate the behavior registered under exactly `name`.
    pub fn instantiate(&self, name: &str) -> Option<Arc<dyn Behavior>> {
        self.factories.get(name).map(|factory| factory())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Registered names in registration order.
    pub fn names(&self) -> Vec<String> {
        self.factories.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}

impl Default for UnitRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for UnitRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UnitRegistry")
            .field("names", &self.names())
            .finish()
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
