// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! roam-core: shared types for the roam mobile-agent substrate

pub mod config;
pub mod envelope;
pub mod hierarchy;
pub mod identity;
pub mod unit;

pub use config::{ConfigError, PlaceConfig, DEFAULT_MAX_CHILDREN, DEFAULT_PORT};
pub use envelope::{
    MessageEnvelope, SystemNotice, TrailEntry, NOTICE_CHILD_EXITING, NOTICE_CHILD_STARTING,
};
pub use hierarchy::{
    child_range, effective_fanout, is_child_of, next_hop, parent_of, NextHop, MIN_BRANCHING,
};
pub use identity::{now_epoch_ms, AgentIdentity};
pub use unit::{CodeUnit, UnitTable};
