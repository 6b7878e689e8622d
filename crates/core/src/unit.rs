// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Named, opaque code units carried with an agent.
//!
//! A unit's bytes travel on the wire next to the agent state and land in
//! the receiving place's per-lineage table. Execution resolves names
//! against the process-wide behavior registry; the bytes themselves stay
//! opaque to the substrate.

use std::collections::HashMap;
use std::sync::Arc;

/// One named blob as read off the wire or from a file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeUnit {
    pub name: String,
    pub bytes: Arc<[u8]>,
}

impl CodeUnit {
    pub fn new(name: impl Into<String>, bytes: impl Into<Arc<[u8]>>) -> Self {
        Self { name: name.into(), bytes: bytes.into() }
    }
}

/// Per-lineage table of carried units, keyed by unit name.
#[derive(Debug, Clone, Default)]
pub struct UnitTable {
    units: HashMap<String, Arc<[u8]>>,
}

impl UnitTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep the first blob registered under a name; later arrivals for the
    /// same lineage carry the same unit again.
    pub fn insert(&mut self, unit: CodeUnit) {
        self.units.entry(unit.name).or_insert(unit.bytes);
    }

    pub fn get(&self, name: &str) -> Option<&Arc<[u8]>> {
        self.units.get(name)
    }

    /// Exact name match, then the suffix fallback for callers that pass a
    /// short name.
    pub fn resolve_name<'a>(&'a self, name: &'a str) -> Option<&'a str> {
        if self.units.contains_key(name) {
            return Some(name);
        }
        self.units.keys().find(|full| full.ends_with(name)).map(String::as_str)
    }

    pub fn names(&self) -> Vec<String> {
        self.units.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = CodeUnit> + '_ {
        self.units.iter().map(|(name, bytes)| CodeUnit {
            name: name.clone(),
            bytes: Arc::clone(bytes),
        })
    }
}

impl FromIterator<CodeUnit> for UnitTable {
    fn from_iter<I: IntoIterator<Item = CodeUnit>>(iter: I) -> Self {
        let mut table = Self::new();
        for unit in iter {
            table.insert(unit);
        }
        table
    }
}

#[cfg(test)]
#[path = "unit_tests.rs"]
mod tests;
