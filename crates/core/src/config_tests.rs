// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::io::Write;

#[test]
fn defaults_match_the_substrate_constants() {
    let config = PlaceConfig::default();
    assert_eq!(config.port, DEFAULT_PORT);
    assert_eq!(config.probe_timeout(), Duration::from_secs(5));
    assert_eq!(config.kill_grace(), Duration::from_secs(2));
    assert_eq!(config.registration_wait(), Duration::from_secs(10));
    assert!(config.gateway.is_none());
    assert!(config.tunnels.is_empty());
}

#[test]
fn load_reads_partial_toml_with_defaults() {
    let mut file = tempfile::NamedTempFile::new().expect("tempfile");
    writeln!(
        file,
        r#"
port = 7001
gateway = "relay.example.org"

[tunnels]
"inner.example.org" = 7002
"#
    )
    .expect("write");

    let config = PlaceConfig::load(file.path()).expect("load");
    assert_eq!(config.port, 7001);
    assert_eq!(config.gateway.as_deref(), Some("relay.example.org"));
    assert_eq!(config.tunnel_port("inner.example.org"), Some(7002));
    assert_eq!(config.tunnel_port("other.example.org"), None);
    assert_eq!(config.probe_timeout_ms, 5_000);
}

#[test]
fn load_rejects_unknown_keys() {
    let mut file = tempfile::NamedTempFile::new().expect("tempfile");
    writeln!(file, "listen_port = 7001").expect("write");

    let err = PlaceConfig::load(file.path()).expect_err("unknown key");
    assert!(matches!(err, ConfigError::Parse { .. }));
}

#[test]
fn load_rejects_missing_file() {
    let err = PlaceConfig::load(Path::new("/nonexistent/roam.toml")).expect_err("missing");
    assert!(matches!(err, ConfigError::Read { .. }));
}

#[test]
fn validate_rejects_zero_port_and_empty_gateway() {
    let mut config = PlaceConfig { port: 0, ..Default::default() };
    assert!(config.validate().is_err());

    config.port = DEFAULT_PORT;
    config.gateway = Some(String::new());
    assert!(config.validate().is_err());

    config.gateway = Some("relay".into());
    assert!(config.validate().is_ok());
}
