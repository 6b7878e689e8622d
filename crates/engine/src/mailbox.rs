// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-agent inbox and outbound wire traffic.
//!
//! The inbox lock is the hop critical section: delivery pushes under it and
//! migration serializes under it, so an envelope can never slip into an
//! agent mid-transfer. Outbound helpers mirror the peer protocol's three
//! delivery families: message transfer (acked unless the envelope is a
//! system notice), location registration, and cache pushes (both
//! fire-and-forget).

use roam_core::MessageEnvelope;
use roam_wire::{encode_envelope, Ack, WireError, WirePool, WireRequest};
use std::collections::VecDeque;
use std::net::{IpAddr, Ipv4Addr};
use tokio::sync::{Mutex, MutexGuard, Notify};
use tracing::debug;

/// Queue state guarded by the inbox lock.
#[derive(Debug, Default)]
pub(crate) struct Inbox {
    pub queue: VecDeque<MessageEnvelope>,
    /// One-shot "no more messages" signal consumed by the next `recv`.
    pub wake: bool,
}

pub struct Mailbox {
    inbox: Mutex<Inbox>,
    arrived: Notify,
    pool: WirePool,
    local: IpAddr,
}

impl Mailbox {
    pub fn new(pool: WirePool, local: IpAddr) -> Self {
        Self {
            inbox: Mutex::new(Inbox::default()),
            arrived: Notify::new(),
            pool,
            local,
        }
    }

    /// Address this agent advertises as its own.
    pub fn local_addr(&self) -> IpAddr {
        self.local
    }

    pub(crate) async fn lock(&self) -> MutexGuard<'_, Inbox> {
        self.inbox.lock().await
    }

    pub(crate) fn notify_arrival(&self) {
        self.arrived.notify_one();
    }

    /// Pop the next envelope, waiting for one to arrive. Returns `None`
    /// after [`wake_receiver`](Self::wake_receiver), once, then resets.
    pub async fn recv(&self) -> Option<MessageEnvelope> {
        loop {
            {
                let mut inbox = self.inbox.lock().await;
                if let Some(envelope) = inbox.queue.pop_front() {
                    return Some(envelope);
                }
                if inbox.wake {
                    inbox.wake = false;
                    return None;
                }
            }
            self.arrived.notified().await;
        }
    }

    /// Release a receiver blocked on an empty inbox with a `None`.
    pub async fn wake_receiver(&self) {
        self.inbox.lock().await.wake = true;
        self.arrived.notify_one();
    }

    pub async fn pending(&self) -> usize {
        self.inbox.lock().await.queue.len()
    }

    /// Transfer an envelope to the place at `dest`. `hop_id` names the
    /// resident to hand it to there, which is the final recipient only on
    /// the last leg. System notices are fire-and-forget; anything else waits
    /// for the delivery ack.
    pub async fn send_message(
        &self,
        dest: IpAddr,
        hop_id: i32,
        envelope: &MessageEnvelope,
    ) -> Result<Ack, WireError> {
        let request = WireRequest::EnqueueMessage {
            receiver_id: hop_id,
            envelope: encode_envelope(envelope)?,
        };
        let mut conn = self.pool.open(&dest.to_string()).await?;
        conn.send(&request).await?;
        let ack = if envelope.system {
            Ack::Delivered
        } else {
            conn.read_ack().await?
        };
        conn.finish();
        debug!(dest = %dest, hop = hop_id, ack = ?ack, "message sent");
        Ok(ack)
    }

    /// Transfer an envelope through a gateway chain toward `dest`. The
    /// request goes to the last gateway in the chain; each relay walks the
    /// position down and the final one delivers to `dest` directly.
    pub async fn send_message_via(
        &self,
        gateways: &[String],
        dest: IpAddr,
        hop_id: i32,
        envelope: &MessageEnvelope,
    ) -> Result<Ack, WireError> {
        let Some(first_stop) = gateways.last() else {
            return self.send_message(dest, hop_id, envelope).await;
        };
        let request = WireRequest::EnqueueMessageGateway {
            envelope: encode_envelope(envelope)?,
            gateways: gateways.to_vec(),
            dest_host: dest.to_string(),
            gateway_pos: gateways.len() as i32 - 1,
            receiver_id: hop_id,
        };
        let mut conn = self.pool.open(first_stop).await?;
        conn.send(&request).await?;
        let ack = if envelope.system {
            Ack::Delivered
        } else {
            conn.read_ack().await?
        };
        conn.finish();
        debug!(via = %first_stop, dest = %dest, hop = hop_id, ack = ?ack, "message relayed");
        Ok(ack)
    }

    /// Push this agent's current address into the directory of the agent
    /// `receiver_id` living at `dest`. When `gateways` is non-empty the
    /// notification travels the chain and the receiver records it as the
    /// return path. No ack either way.
    pub async fn register_location(
        &self,
        dest: IpAddr,
        receiver_id: i32,
        sender_id: i32,
        sender_addr: IpAddr,
        gateways: &[String],
    ) -> Result<(), WireError> {
        let sender_addr = wire_v4(sender_addr)?;
        if gateways.is_empty() {
            let request = WireRequest::RegisterAgentIp {
                sender_id,
                sender_addr,
                receiver_id,
                gateways: Vec::new(),
            };
            let mut conn = self.pool.open(&dest.to_string()).await?;
            conn.send(&request).await?;
            conn.finish();
        } else {
            let first_stop = gateways[gateways.len() - 1].clone();
            let request = WireRequest::RegisterAgentIpGateway {
                sender_id,
                sender_addr,
                gateways: gateways.to_vec(),
                dest_host: dest.to_string(),
                gateway_pos: gateways.len() as i32 - 1,
                receiver_id,
            };
            let mut conn = self.pool.open(&first_stop).await?;
            conn.send(&request).await?;
            conn.finish();
        }
        Ok(())
    }

    /// Offer this agent's address for the peer's cache. Fire-and-forget;
    /// success means the write reached the socket.
    pub async fn share_location(
        &self,
        dest: IpAddr,
        receiver_id: i32,
        sender_id: i32,
        sender_addr: IpAddr,
    ) -> Result<(), WireError> {
        self.push_cache(dest, receiver_id, sender_id, sender_addr, false).await
    }

    /// Tell the peer to drop this agent from its cache.
    pub async fn flush_location(
        &self,
        dest: IpAddr,
        receiver_id: i32,
        sender_id: i32,
    ) -> Result<(), WireError> {
        self.push_cache(dest, receiver_id, sender_id, self.local, true).await
    }

    async fn push_cache(
        &self,
        dest: IpAddr,
        receiver_id: i32,
        sender_id: i32,
        sender_addr: IpAddr,
        flush: bool,
    ) -> Result<(), WireError> {
        let request = WireRequest::CacheAgentIp {
            sender_id,
            sender_addr: wire_v4(sender_addr)?,
            receiver_id,
            flush,
        };
        let mut conn = self.pool.open(&dest.to_string()).await?;
        conn.send(&request).await?;
        conn.finish();
        Ok(())
    }
}

fn wire_v4(addr: IpAddr) -> Result<Ipv4Addr, WireError> {
    match addr {
        IpAddr::V4(v4) => Ok(v4),
        IpAddr::V6(_) => Err(WireError::NotIpv4(addr)),
    }
}

impl std::fmt::Debug for Mailbox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Mailbox").field("local", &self.local).finish()
    }
}

#[cfg(test)]
#[path = "mailbox_tests.rs"]
mod tests;
