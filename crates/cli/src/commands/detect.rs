// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `roam detect` - liveness probe of a place

use crate::client;
use anyhow::{bail, Result};
use clap::Args;
use roam_core::DEFAULT_PORT;

#[derive(Args)]
pub struct DetectArgs {
    /// Host to probe
    #[arg(long)]
    pub host: String,

    /// Wire port of the place
    #[arg(long, default_value_t = DEFAULT_PORT)]
    pub port: u16,
}

pub async fn detect(args: DetectArgs) -> Result<()> {
    if client::probe(&args.host, args.port).await {
        println!("{}:{} answers", args.host, args.port);
        Ok(())
    } else {
        bail!("{}:{} is unreachable", args.host, args.port)
    }
}
