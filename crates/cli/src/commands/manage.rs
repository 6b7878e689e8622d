// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `roam status` / `kill` / `suspend` / `resume` - a place's management surface
//!
//! Management rides the same wire as any agent: each command injects the
//! builtin monitor unit at the target place, where it runs against the
//! local residents and logs the outcome into the place's log.

use crate::client::{self, Injection};
use anyhow::Result;
use clap::Args;
use roam_core::{DEFAULT_MAX_CHILDREN, DEFAULT_PORT};
use roam_engine::MONITOR_UNIT;

#[derive(Args)]
pub struct TargetArgs {
    /// Place to manage
    #[arg(long, default_value = "127.0.0.1")]
    pub host: String,

    /// Wire port of the place
    #[arg(long, default_value_t = DEFAULT_PORT)]
    pub port: u16,
}

#[derive(Args)]
pub struct ResidentArgs {
    #[command(flatten)]
    pub target: TargetArgs,

    /// Resident agent id
    pub id: i32,
}

pub async fn status(target: TargetArgs) -> Result<()> {
    run_monitor(&target, vec!["status".to_string()]).await?;
    println!("status requested; {} logs the listing", target.host);
    Ok(())
}

pub async fn kill(args: ResidentArgs) -> Result<()> {
    run_monitor(&args.target, vec!["kill".to_string(), args.id.to_string()]).await?;
    println!("kill of agent {} sent to {}", args.id, args.target.host);
    Ok(())
}

pub async fn suspend(args: ResidentArgs) -> Result<()> {
    run_monitor(&args.target, vec!["suspend".to_string(), args.id.to_string()]).await?;
    println!("suspend of agent {} sent to {}", args.id, args.target.host);
    Ok(())
}

pub async fn resume(args: ResidentArgs) -> Result<()> {
    run_monitor(&args.target, vec!["resume".to_string(), args.id.to_string()]).await?;
    println!("resume of agent {} sent to {}", args.id, args.target.host);
    Ok(())
}

async fn run_monitor(target: &TargetArgs, command: Vec<String>) -> Result<()> {
    Injection {
        unit: MONITOR_UNIT.to_string(),
        client: client::invoking_user(),
        max_children: DEFAULT_MAX_CHILDREN,
        entry_args: command,
        units: Vec::new(),
    }
    .send_to(&target.host, target.port)
    .await
}
