// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-agent suspend gate.
//!
//! Suspension is cooperative: the gate is checked at the agent's suspension
//! points (entry dispatch, inbox receive, outbound send). An agent in the
//! middle of its own computation keeps running until it next crosses one.

use parking_lot::Mutex;
use std::pin::pin;
use tokio::sync::Notify;

#[derive(Debug, Default)]
pub struct SuspendGate {
    paused: Mutex<bool>,
    reopened: Notify,
}

impl SuspendGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Close the gate. Returns false when it was already closed.
    pub fn suspend(&self) -> bool {
        !std::mem::replace(&mut *self.paused.lock(), true)
    }

    /// Open the gate, releasing every task parked in [`pass`](Self::pass).
    /// Returns false when it was already open.
    pub fn resume(&self) -> bool {
        let was_closed = std::mem::replace(&mut *self.paused.lock(), false);
        if was_closed {
            self.reopened.notify_waiters();
        }
        was_closed
    }

    pub fn is_suspended(&self) -> bool {
        *self.paused.lock()
    }

    /// Wait until the gate is open. Returns immediately when it already is.
    pub async fn pass(&self) {
        loop {
            let mut reopened = pin!(self.reopened.notified());
            reopened.as_mut().enable();
            if !*self.paused.lock() {
                return;
            }
            reopened.await;
        }
    }
}

#[cfg(test)]
#[path = "gate_tests.rs"]
mod tests;
