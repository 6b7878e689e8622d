// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! roamd: the place daemon.
//!
//! Binds the configured port, serves wire traffic, and reads operator
//! commands from stdin until told to quit or detach. The builtin registry
//! carries the management unit; embedders hosting their own units use
//! `roam-daemon` as a library and register them before startup.

use clap::Parser;
use roam_core::{ConfigError, PlaceConfig};
use roam_daemon::{env, init_tracing, startup, Listener, StartupResult};
use roam_engine::UnitRegistry;
use std::path::PathBuf;
use std::process::ExitCode;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;

/// Place daemon for mobile agents.
#[derive(Parser)]
#[command(name = "roamd", version)]
struct Args {
    /// TOML place config file.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Listen port override.
    #[arg(long)]
    port: Option<u16>,
    /// Host name peers use to reach this place.
    #[arg(long)]
    name: Option<String>,
    /// Gateway host for destinations that fail the direct probe.
    #[arg(long)]
    gateway: Option<String>,
    /// Run without the stdin command loop.
    #[arg(long)]
    background: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    let config = match load_config(&args) {
        Ok(config) => config,
        Err(error) => {
            eprintln!("roamd: {error}");
            return ExitCode::FAILURE;
        }
    };
    let state_dir = match env::state_dir() {
        Ok(dir) => dir,
        Err(error) => {
            eprintln!("roamd: {error}");
            return ExitCode::FAILURE;
        }
    };
    let _log_guard = init_tracing(&state_dir);

    let registry = UnitRegistry::with_builtins();
    let StartupResult { daemon, listener } = match startup(config, registry, &state_dir).await {
        Ok(result) => result,
        Err(error) => {
            eprintln!("roamd: {error}");
            return ExitCode::FAILURE;
        }
    };

    let place = daemon.place().clone();
    tokio::spawn(Listener::new(listener, place.clone()).run());
    let runner = place.clone();
    tokio::spawn(async move { runner.run().await });

    if !args.background {
        if let StdinOutcome::Quit = stdin_commands().await {
            daemon.shutdown();
            return ExitCode::SUCCESS;
        }
        info!("detached from stdin");
    }
    place.shutdown_token().cancelled().await;
    daemon.shutdown();
    ExitCode::SUCCESS
}

fn load_config(args: &Args) -> Result<PlaceConfig, ConfigError> {
    let mut config = match &args.config {
        Some(path) => PlaceConfig::load(path)?,
        None => PlaceConfig::default(),
    };
    if let Some(port) = args.port {
        config.port = port;
    }
    if let Some(name) = &args.name {
        config.name = Some(name.clone());
    }
    if let Some(gateway) = &args.gateway {
        config.gateway = Some(gateway.clone());
    }
    if let Some(timeout) = env::probe_timeout_ms() {
        config.probe_timeout_ms = timeout;
    }
    config.validate()?;
    Ok(config)
}

enum StdinOutcome {
    Quit,
    Background,
}

/// `quit` stops the daemon, `background` detaches from stdin. EOF means
/// there was never a terminal to read from and behaves like `background`.
async fn stdin_commands() -> StdinOutcome {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => match line.trim() {
                "quit" | "QUIT" => return StdinOutcome::Quit,
                "background" => return StdinOutcome::Background,
                "" => {}
                other => eprintln!("unknown command `{other}` (quit | background)"),
            },
            Ok(None) | Err(_) => return StdinOutcome::Background,
        }
    }
}
