// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Builtin management unit.
//!
//! Registered on every place under [`MONITOR_UNIT`]. The CLI reaches a
//! remote place's management surface by injecting this unit there with the
//! command as its arguments; results are logged at the target place, where
//! an operator watches the daemon log.

use crate::error::EntryError;
use crate::registry::Behavior;
use crate::AgentHandle;
use async_trait::async_trait;
use tracing::{info, warn};

/// Unit name the management behavior is registered under.
pub const MONITOR_UNIT: &str = "monitor";

/// Behavior behind [`MONITOR_UNIT`]: one command per injection.
///
/// Commands: `as` (alias `status`) lists residents, `kill <id>`,
/// `suspend <id>` and `resume <id>` act on one resident, `help` prints the
/// command list. A malformed command logs usage and exits cleanly.
pub struct MonitorUnit;

#[async_trait]
impl Behavior for MonitorUnit {
    async fn entry(
        &self,
        agent: &AgentHandle,
        _entry: &str,
        args: &[String],
    ) -> Result<(), EntryError> {
        let place = agent.place().clone();
        match args.first().map(String::as_str) {
            Some("as") | Some("status") => {
                let residents = place.status();
                info!(residents = residents.len(), "agent status");
                for resident in &residents {
                    info!(
                        agent = resident.agent_id,
                        unit = %resident.unit,
                        client = %resident.client,
                        origin = %resident.origin,
                        spawned = resident.spawned_at_ms,
                        phase = %resident.phase,
                        "resident"
                    );
                }
            }
            Some("kill") => match target_id(args) {
                Some(id) => {
                    let killed = place.kill_agent(id).await;
                    info!(agent = id, killed, "kill command handled");
                }
                None => log_usage(args),
            },
            Some("suspend") => match target_id(args) {
                Some(id) => {
                    let suspended = place.suspend_agent(id);
                    info!(agent = id, suspended, "suspend command handled");
                }
                None => log_usage(args),
            },
            Some("resume") => match target_id(args) {
                Some(id) => {
                    let resumed = place.resume_agent(id);
                    info!(agent = id, resumed, "resume command handled");
                }
                None => log_usage(args),
            },
            _ => log_usage(args),
        }
        Ok(())
    }
}

fn target_id(args: &[String]) -> Option<i32> {
    args.get(1)?.parse().ok()
}

fn log_usage(args: &[String]) {
    warn!(
        ?args,
        "usage: as | status | kill <agent-id> | suspend <agent-id> | resume <agent-id> | help"
    );
}

#[cfg(test)]
#[path = "monitor_tests.rs"]
mod tests;
