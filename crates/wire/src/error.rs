// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Wire protocol errors.

use std::net::IpAddr;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WireError {
    #[error("wire i/o: {0}")]
    Io(#[from] std::io::Error),

    #[error("unknown wire function `{0}`")]
    UnknownFunction(String),

    #[error("unexpected message type {0}")]
    BadMessageType(i32),

    #[error("{what} length {len} outside wire limits")]
    BadLength { what: &'static str, len: i64 },

    #[error("malformed {what}: {detail}")]
    Malformed { what: &'static str, detail: String },

    #[error("peer addresses travel as IPv4 on the wire, got {0}")]
    NotIpv4(IpAddr),

    #[error("connect to {host}:{port} timed out after {timeout:?}")]
    ConnectTimeout { host: String, port: u16, timeout: Duration },

    #[error("envelope codec: {0}")]
    Envelope(#[from] serde_json::Error),
}

impl WireError {
    pub(crate) fn malformed(what: &'static str, detail: impl Into<String>) -> Self {
        WireError::Malformed { what, detail: detail.into() }
    }
}
