// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! roam-engine: the place runtime and the agent cells resident on it

pub mod agent;
pub mod directory;
pub mod error;
pub mod gate;
pub mod loader;
pub mod mailbox;
pub mod monitor;
pub mod place;
pub mod registry;
pub mod state;

pub use agent::AgentHandle;
pub use directory::AgentDirectory;
pub use error::{EntryError, HopError, ReceiveError, TalkError, UnitError};
pub use gate::SuspendGate;
pub use loader::UnitLoader;
pub use mailbox::Mailbox;
pub use monitor::{MonitorUnit, MONITOR_UNIT};
pub use place::{AgentPhase, Place, ResidentStatus};
pub use registry::{Behavior, UnitRegistry};
pub use state::{AgentState, HOP_RELAY_ENTRY, INIT_ENTRY};
