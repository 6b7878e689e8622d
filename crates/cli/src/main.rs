// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! roam: inject mobile agents into places and manage their residents.

mod client;
mod commands;

use clap::{Parser, Subcommand};
use std::process::ExitCode;

const VERSION: &str = concat!(env!("CARGO_PKG_VERSION"), " (", env!("BUILD_GIT_HASH"), ")");

#[derive(Parser)]
#[command(name = "roam", version = VERSION, about = "Mobile agent injector and place management")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Mint a root agent and hand it to a place
    Inject(commands::inject::InjectArgs),
    /// Ask a place to log its resident listing
    Status(commands::manage::TargetArgs),
    /// Terminate a resident and its task group
    Kill(commands::manage::ResidentArgs),
    /// Pause a resident at its next suspension point
    Suspend(commands::manage::ResidentArgs),
    /// Let a suspended resident run again
    Resume(commands::manage::ResidentArgs),
    /// Check whether a place answers on the wire
    Detect(commands::detect::DetectArgs),
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Inject(args) => commands::inject::inject(args).await,
        Command::Status(args) => commands::manage::status(args).await,
        Command::Kill(args) => commands::manage::kill(args).await,
        Command::Suspend(args) => commands::manage::suspend(args).await,
        Command::Resume(args) => commands::manage::resume(args).await,
        Command::Detect(args) => commands::detect::detect(args).await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("roam: {error:#}");
            ExitCode::FAILURE
        }
    }
}
