// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon startup and shutdown.
//!
//! Startup order matters: the pid lock is taken before anything else so a
//! second `roamd` fails fast without touching the running daemon's files,
//! and the listen socket is bound last, after everything that can fail has
//! passed. A bind failure is the only fatal startup error the operator
//! should ever see in practice.

use std::fs::File;
use std::io::{self, Write};
use std::net::{IpAddr, Ipv4Addr};
use std::path::{Path, PathBuf};

use fs2::FileExt;
use roam_core::PlaceConfig;
use roam_engine::{Place, UnitRegistry};
use thiserror::Error;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use crate::env;

/// Lifecycle errors
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("could not determine a state directory")]
    NoStateDir,

    #[error("failed to acquire the pid lock: another roamd running?")]
    LockFailed(#[source] io::Error),

    #[error("failed to bind {addr}: {source}")]
    BindFailed {
        addr: String,
        #[source]
        source: io::Error,
    },

    #[error("failed to resolve place name {host}: {source}")]
    Resolve {
        host: String,
        #[source]
        source: io::Error,
    },

    #[error("i/o error: {0}")]
    Io(#[from] io::Error),
}

/// A started place plus the files pinning it to this process.
pub struct Daemon {
    place: Place,
    lock_path: PathBuf,
    // NOTE(lifetime): held to maintain the exclusive pid lock; released on drop
    #[allow(dead_code)]
    lock_file: File,
}

impl Daemon {
    pub fn place(&self) -> &Place {
        &self.place
    }

    /// Stop the place and release the pid file. Open connections finish on
    /// their own; their tasks die with the runtime.
    pub fn shutdown(&self) {
        info!("shutting down");
        self.place.shutdown();
        if self.lock_path.exists() {
            if let Err(error) = std::fs::remove_file(&self.lock_path) {
                warn!(%error, "failed to remove the pid file");
            }
        }
        info!("shutdown complete");
    }
}

/// Result of daemon startup: the daemon plus the socket to serve.
pub struct StartupResult {
    pub daemon: Daemon,
    pub listener: TcpListener,
}

/// Start the place: lock the state dir, resolve the advertised address,
/// bind the listen socket, and construct the runtime.
pub async fn startup(
    config: PlaceConfig,
    registry: UnitRegistry,
    state_dir: &Path,
) -> Result<StartupResult, LifecycleError> {
    let lock_path = state_dir.join("roamd.pid");
    match startup_inner(config, registry, state_dir, &lock_path).await {
        Ok(result) => Ok(result),
        Err(error) => {
            // A lock failure means those files belong to the running
            // daemon; leave them alone.
            if !matches!(error, LifecycleError::LockFailed(_)) {
                cleanup_on_failure(&lock_path);
            }
            Err(error)
        }
    }
}

async fn startup_inner(
    config: PlaceConfig,
    registry: UnitRegistry,
    state_dir: &Path,
    lock_path: &Path,
) -> Result<StartupResult, LifecycleError> {
    std::fs::create_dir_all(state_dir)?;

    // Take the lock before truncating so a losing second daemon never
    // wipes the winner's recorded pid.
    let lock_file = std::fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(false)
        .open(lock_path)?;
    lock_file.try_lock_exclusive().map_err(LifecycleError::LockFailed)?;
    let mut lock_file = lock_file;
    lock_file.set_len(0)?;
    writeln!(lock_file, "{}", std::process::id())?;

    let local_addr = local_address(&config).await?;

    // Bind last, after everything else that can fail has passed.
    let bind_addr = (Ipv4Addr::UNSPECIFIED, config.port);
    let listener = TcpListener::bind(bind_addr).await.map_err(|source| {
        LifecycleError::BindFailed { addr: format!("0.0.0.0:{}", config.port), source }
    })?;

    let port = config.port;
    let place = Place::new(config, local_addr, registry);
    info!(addr = %local_addr, port, "place is up");

    Ok(StartupResult {
        daemon: Daemon { place, lock_path: lock_path.to_path_buf(), lock_file },
        listener,
    })
}

/// The address peers will see in directories and identities. An unnamed
/// place advertises loopback, which is right for single-host work and for
/// tunnel-only reachability.
async fn local_address(config: &PlaceConfig) -> Result<IpAddr, LifecycleError> {
    let Some(name) = &config.name else {
        return Ok(IpAddr::V4(Ipv4Addr::LOCALHOST));
    };
    if let Ok(addr) = name.parse::<IpAddr>() {
        return Ok(addr);
    }
    let resolve_err = |source| LifecycleError::Resolve { host: name.clone(), source };
    let addrs: Vec<_> = tokio::net::lookup_host((name.as_str(), config.port))
        .await
        .map_err(resolve_err)?
        .collect();
    addrs
        .iter()
        .find(|addr| addr.is_ipv4())
        .or_else(|| addrs.first())
        .map(|addr| addr.ip())
        .ok_or_else(|| {
            resolve_err(io::Error::new(io::ErrorKind::NotFound, "no address for host"))
        })
}

fn cleanup_on_failure(lock_path: &Path) {
    if lock_path.exists() {
        let _ = std::fs::remove_file(lock_path);
    }
}

/// Route logs to stderr and a file under the state dir. The returned guard
/// flushes the file writer and must outlive all logging.
pub fn init_tracing(state_dir: &Path) -> tracing_appender::non_blocking::WorkerGuard {
    let _ = std::fs::create_dir_all(state_dir);
    let appender = tracing_appender::rolling::never(state_dir, "roamd.log");
    let (file_writer, guard) = tracing_appender::non_blocking(appender);
    let filter =
        EnvFilter::try_new(env::log_filter()).unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(file_writer)
                .with_ansi(false),
        )
        .try_init();
    guard
}

#[cfg(test)]
#[path = "lifecycle_tests.rs"]
mod tests;
