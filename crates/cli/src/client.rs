// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Wire-client plumbing shared by the commands.

use anyhow::{Context, Result};
use roam_core::CodeUnit;
use roam_engine::AgentState;
use roam_wire::{WireConn, WirePool, WireRequest};
use std::collections::HashMap;
use std::time::Duration;

/// How long to wait for a place to accept the connection.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

fn pool(port: u16) -> WirePool {
    WirePool::new(port, HashMap::new(), CONNECT_TIMEOUT)
}

/// Open a one-shot exchange with the place at `host:port`.
pub async fn open(host: &str, port: u16) -> Result<WireConn> {
    pool(port).open(host).await.with_context(|| format!("cannot reach {host}:{port}"))
}

/// A completed detect exchange proves the place is listening.
pub async fn probe(host: &str, port: u16) -> bool {
    pool(port).probe(host).await
}

/// Session name stamped on injected agents.
pub fn invoking_user() -> String {
    std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .unwrap_or_else(|_| "anonymous".to_string())
}

/// Everything a fresh root agent is born with.
pub struct Injection {
    pub unit: String,
    pub client: String,
    pub max_children: i32,
    pub entry_args: Vec<String>,
    pub units: Vec<CodeUnit>,
}

impl Injection {
    /// Mint the agent and transfer it. The origin recorded in its identity
    /// is the address the place sees this connection come from.
    pub async fn send_to(self, host: &str, port: u16) -> Result<()> {
        let mut conn = open(host, port).await?;
        let origin = conn.local_addr().context("local address of the exchange")?.ip();

        let mut state =
            AgentState::root(origin, self.unit.as_str(), self.client.as_str(), self.max_children);
        state.next_args = self.entry_args;
        let agent = state.to_bytes().context("serialize the agent")?;

        conn.send(&WireRequest::ReceiveAgent { agent, units: self.units })
            .await
            .with_context(|| format!("transfer to {host}:{port}"))?;
        conn.finish();
        Ok(())
    }
}

#[cfg(test)]
#[path = "client_tests.rs"]
mod tests;
