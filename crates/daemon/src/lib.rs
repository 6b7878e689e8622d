// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! roam-daemon: the place daemon behind `roamd`.
//!
//! The binary wires a [`Place`](roam_engine::Place) to a TCP listener,
//! drives the executor loop, and reads operator commands from stdin. The
//! library half exposes startup, shutdown and the listener so integration
//! tests can run a whole place in-process.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod env;
pub mod lifecycle;
pub mod listener;

pub use lifecycle::{init_tracing, startup, Daemon, LifecycleError, StartupResult};
pub use listener::Listener;
