// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The message envelope exchanged between agents.
//!
//! An envelope is created by the sending agent, mutated by every relay on
//! the way (routing-trail append, gateway-chain consumption), and consumed
//! by the final recipient. `receiving_id` names the final recipient even
//! while the envelope travels hop by hop through intermediate relatives.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::net::IpAddr;

/// Header tag carried by a child's first system notice to its parent.
pub const NOTICE_CHILD_STARTING: &str = "child-starting";
/// Header tag carried by a child's final system notice to its parent.
pub const NOTICE_CHILD_EXITING: &str = "child-exiting";

/// One relay hop recorded in an envelope's routing trail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrailEntry {
    pub id: i32,
    pub addr: IpAddr,
}

/// Engine-internal notices delivered through the same envelope path as user
/// messages but handled by the recipient's runtime instead of its inbox.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SystemNotice {
    ChildStarting,
    ChildExiting,
}

impl SystemNotice {
    pub fn tag(self) -> &'static str {
        match self {
            SystemNotice::ChildStarting => NOTICE_CHILD_STARTING,
            SystemNotice::ChildExiting => NOTICE_CHILD_EXITING,
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            NOTICE_CHILD_STARTING => Some(SystemNotice::ChildStarting),
            NOTICE_CHILD_EXITING => Some(SystemNotice::ChildExiting),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageEnvelope {
    /// Id of the agent that created the envelope.
    pub sending_id: i32,
    /// Final recipient id. Relays never rewrite this.
    pub receiving_id: i32,
    #[serde(default)]
    pub sending_addr: Option<IpAddr>,
    /// Address of the next hop the sender chose, not of the final recipient.
    #[serde(default)]
    pub receiving_addr: Option<IpAddr>,
    /// Gateway chain needed to reach the receiving address, outermost first.
    #[serde(default)]
    pub gateways: Vec<String>,
    /// Ordered tags; `header[0]` is the conventional subject line.
    #[serde(default)]
    pub header: Vec<String>,
    #[serde(default)]
    pub body: HashMap<String, Value>,
    /// Engine notices bypass the inbox and are never acked on the wire.
    #[serde(default)]
    pub system: bool,
    /// Relay hops appended en route, oldest first.
    #[serde(default)]
    pub trail: Vec<TrailEntry>,
}

impl MessageEnvelope {
    /// A user-level envelope. Sender/receiver ids and addresses are filled
    /// in by `talk` at send time.
    pub fn user(header: Vec<String>, body: HashMap<String, Value>) -> Self {
        Self {
            sending_id: -1,
            receiving_id: -1,
            sending_addr: None,
            receiving_addr: None,
            gateways: Vec::new(),
            header,
            body,
            system: false,
            trail: Vec::new(),
        }
    }

    /// A single-subject user envelope with an empty body.
    pub fn subject(subject: impl Into<String>) -> Self {
        Self::user(vec![subject.into()], HashMap::new())
    }

    /// An engine notice from `sending_id`.
    pub fn notice(notice: SystemNotice, sending_id: i32) -> Self {
        Self {
            sending_id,
            system: true,
            ..Self::user(vec![notice.tag().to_string()], HashMap::new())
        }
    }

    /// The notice this envelope carries, when it is one.
    pub fn as_notice(&self) -> Option<SystemNotice> {
        if !self.system {
            return None;
        }
        self.header.first().and_then(|tag| SystemNotice::from_tag(tag))
    }

    /// Record a relay hop at the end of the trail.
    pub fn push_route(&mut self, id: i32, addr: IpAddr) {
        self.trail.push(TrailEntry { id, addr });
    }

    pub fn route_count(&self) -> usize {
        self.trail.len()
    }

    /// Bounds-checked trail read, oldest hop first.
    pub fn route_at(&self, index: usize) -> Option<TrailEntry> {
        self.trail.get(index).copied()
    }

    pub fn subject_tag(&self) -> Option<&str> {
        self.header.first().map(String::as_str)
    }
}

#[cfg(test)]
#[path = "envelope_tests.rs"]
mod tests;
