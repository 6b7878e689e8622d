// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::net::TcpListener as StdTcpListener;

fn free_port() -> u16 {
    let probe = StdTcpListener::bind("127.0.0.1:0").expect("bind probe");
    let port = probe.local_addr().expect("addr").port();
    drop(probe);
    port
}

fn config(port: u16) -> PlaceConfig {
    PlaceConfig { port, ..PlaceConfig::default() }
}

#[tokio::test]
async fn pid_file_names_the_running_process() {
    let dir = tempfile::tempdir().expect("tempdir");
    let port = free_port();
    let started = startup(config(port), UnitRegistry::with_builtins(), dir.path())
        .await
        .expect("startup");

    let pid = std::fs::read_to_string(dir.path().join("roamd.pid")).expect("pid file");
    assert_eq!(pid.trim(), std::process::id().to_string());
    assert_eq!(started.listener.local_addr().expect("addr").port(), port);
}

#[tokio::test]
async fn second_startup_loses_the_lock() {
    let dir = tempfile::tempdir().expect("tempdir");
    let _held = startup(config(free_port()), UnitRegistry::with_builtins(), dir.path())
        .await
        .expect("first startup");
    let before = std::fs::read_to_string(dir.path().join("roamd.pid")).expect("pid file");

    let second = startup(config(free_port()), UnitRegistry::with_builtins(), dir.path()).await;
    assert!(matches!(second, Err(LifecycleError::LockFailed(_))));

    // The loser must not have wiped the winner's recorded pid.
    let after = std::fs::read_to_string(dir.path().join("roamd.pid")).expect("pid file");
    assert_eq!(before, after);
}

#[tokio::test]
async fn bind_conflict_fails_and_cleans_up() {
    let dir = tempfile::tempdir().expect("tempdir");
    let occupied = StdTcpListener::bind("0.0.0.0:0").expect("bind");
    let port = occupied.local_addr().expect("addr").port();

    let result = startup(config(port), UnitRegistry::with_builtins(), dir.path()).await;
    assert!(matches!(result, Err(LifecycleError::BindFailed { .. })));
    assert!(!dir.path().join("roamd.pid").exists());
}

#[tokio::test]
async fn shutdown_releases_the_place_and_the_pid_file() {
    let dir = tempfile::tempdir().expect("tempdir");
    let started = startup(config(free_port()), UnitRegistry::with_builtins(), dir.path())
        .await
        .expect("startup");

    started.daemon.shutdown();
    assert!(!dir.path().join("roamd.pid").exists());
    assert!(started.daemon.place().shutdown_token().is_cancelled());
}

#[tokio::test]
async fn unnamed_place_advertises_loopback() {
    let dir = tempfile::tempdir().expect("tempdir");
    let started = startup(config(free_port()), UnitRegistry::with_builtins(), dir.path())
        .await
        .expect("startup");
    assert_eq!(started.daemon.place().local_addr(), IpAddr::V4(Ipv4Addr::LOCALHOST));
}

#[tokio::test]
async fn literal_place_name_is_used_verbatim() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = PlaceConfig {
        name: Some("127.0.0.5".to_string()),
        port: free_port(),
        ..PlaceConfig::default()
    };
    let started = startup(config, UnitRegistry::with_builtins(), dir.path())
        .await
        .expect("startup");
    assert_eq!(started.daemon.place().local_addr(), "127.0.0.5".parse::<IpAddr>().unwrap());
}
