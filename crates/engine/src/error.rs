// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Engine error types.
//!
//! Transport problems never escape as panics: `talk` and `hop` surface them
//! as typed errors the caller treats as "try another path", and the daemon
//! maps them to a failure ack or a log line. Validation failures (spawn over
//! capacity, bad child id) are not errors at all; those APIs return `None`.

use roam_wire::WireError;
use thiserror::Error;

/// Boxed error a behavior entry point may return. The runtime logs it and
/// winds the agent down; it never takes the place down.
pub type EntryError = Box<dyn std::error::Error + Send + Sync>;

/// A code-unit name could not be resolved to runnable behavior.
#[derive(Debug, Error)]
pub enum UnitError {
    #[error("unknown code unit `{0}`")]
    Unknown(String),
}

/// Failure to deliver a message toward a peer agent.
#[derive(Debug, Error)]
pub enum TalkError {
    /// No route: the id is invalid, points above the root, or the next hop
    /// never registered within the wait bound.
    #[error("agent {target} is unreachable from agent {from}")]
    Unreachable { target: i32, from: i32 },

    /// The next hop's address is unknown and cannot be derived.
    #[error("no address recorded for relay agent {hop} toward agent {target}")]
    UnknownHop { hop: i32, target: i32 },

    #[error(transparent)]
    Wire(#[from] WireError),
}

/// Failure to migrate an agent to another place.
#[derive(Debug, Error)]
pub enum HopError {
    /// A relay step ran with no pending destination recorded.
    #[error("relay entry invoked without a pending destination")]
    NoDestination,

    #[error("agent state could not be serialized: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("destination host `{host}` could not be resolved: {source}")]
    Resolve {
        host: String,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Wire(#[from] WireError),
}

/// Failure to admit an inbound agent transfer.
#[derive(Debug, Error)]
pub enum ReceiveError {
    #[error("agent state could not be deserialized: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("place is shutting down")]
    ShuttingDown,
}
