// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `roam inject` - mint a root agent and hand it to a place

use crate::client::{self, Injection};
use anyhow::{bail, Context, Result};
use clap::Args;
use roam_core::{CodeUnit, DEFAULT_MAX_CHILDREN, DEFAULT_PORT, MIN_BRANCHING};

#[derive(Args)]
pub struct InjectArgs {
    /// Place that receives the agent
    #[arg(long)]
    pub host: String,

    /// Wire port of the place
    #[arg(long, default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Behavior unit the agent starts in
    #[arg(long)]
    pub unit: String,

    /// Argument for the agent's init entry (repeatable)
    #[arg(long = "arg", value_name = "VALUE")]
    pub args: Vec<String>,

    /// Carried code unit as name=path (repeatable)
    #[arg(long = "attach", value_name = "NAME=PATH")]
    pub attachments: Vec<String>,

    /// Session name recorded on the agent
    #[arg(long, default_value_t = client::invoking_user())]
    pub client: String,

    /// Branching factor of the agent's lineage
    #[arg(long, value_name = "N", default_value_t = DEFAULT_MAX_CHILDREN)]
    pub max_children: i32,
}

pub async fn inject(args: InjectArgs) -> Result<()> {
    if args.max_children < MIN_BRANCHING {
        bail!("--max-children must be at least {MIN_BRANCHING}");
    }
    let units = load_attachments(&args.attachments)?;

    Injection {
        unit: args.unit.clone(),
        client: args.client.clone(),
        max_children: args.max_children,
        entry_args: args.args,
        units,
    }
    .send_to(&args.host, args.port)
    .await?;

    println!("injected {} at {}:{} for {}", args.unit, args.host, args.port, args.client);
    Ok(())
}

fn load_attachments(raw: &[String]) -> Result<Vec<CodeUnit>> {
    let mut units = Vec::with_capacity(raw.len());
    for attachment in raw {
        let (name, path) = split_attachment(attachment)?;
        let bytes = std::fs::read(path)
            .with_context(|| format!("read attachment `{name}` from {path}"))?;
        units.push(CodeUnit::new(name, bytes));
    }
    Ok(units)
}

fn split_attachment(raw: &str) -> Result<(&str, &str)> {
    match raw.split_once('=') {
        Some((name, path)) if !name.is_empty() && !path.is_empty() => Ok((name, path)),
        _ => bail!("--attach wants name=path, got `{raw}`"),
    }
}

#[cfg(test)]
#[path = "inject_tests.rs"]
mod tests;
