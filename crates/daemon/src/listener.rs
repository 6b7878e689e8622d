// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Listener task for wire traffic.
//!
//! Accepts peer connections and serves exchanges on each until the peer
//! closes it; peers pool connections, so one stream usually carries many
//! requests back to back. User-level deliveries answer with one ack byte,
//! system notices and the whole registration family are fire-and-forget.
//! An undecodable envelope closes the connection, which the waiting sender
//! reads as the no-ack code.

use roam_engine::Place;
use roam_wire::{decode_envelope, write_ack, Ack, WireError, WireRequest};
use std::net::IpAddr;
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, error, warn};

/// Listener task for accepting place connections.
pub struct Listener {
    socket: TcpListener,
    place: Place,
}

impl Listener {
    pub fn new(socket: TcpListener, place: Place) -> Self {
        Self { socket, place }
    }

    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.socket.local_addr()
    }

    /// Accept until the place shuts down, one task per connection.
    pub async fn run(self) {
        let shutdown = self.place.shutdown_token();
        loop {
            tokio::select! {
                result = self.socket.accept() => match result {
                    Ok((stream, peer)) => {
                        debug!(%peer, "connection accepted");
                        let place = self.place.clone();
                        tokio::spawn(async move {
                            if let Err(error) = serve_connection(stream, place).await {
                                log_connection_error(error);
                            }
                        });
                    }
                    Err(error) => error!(%error, "accept failed"),
                },
                _ = shutdown.cancelled() => return,
            }
        }
    }
}

fn log_connection_error(error: WireError) {
    match &error {
        WireError::Io(io) if io.kind() == std::io::ErrorKind::UnexpectedEof => {
            debug!("peer disconnected");
        }
        _ => warn!(%error, "connection failed"),
    }
}

/// Serve one connection: read a request, dispatch it, repeat until the
/// peer closes the stream.
async fn serve_connection(mut stream: TcpStream, place: Place) -> Result<(), WireError> {
    loop {
        let request = WireRequest::read_from(&mut stream).await?;
        match request {
            WireRequest::ReceiveAgent { agent, units } => {
                if let Err(error) = place.receive_agent(&agent, units) {
                    warn!(%error, "agent transfer rejected");
                }
            }
            WireRequest::RegisterAgentIp { sender_id, sender_addr, receiver_id, gateways } => {
                place
                    .register_location(receiver_id, sender_id, IpAddr::V4(sender_addr), &gateways)
                    .await;
            }
            WireRequest::RegisterAgentIpGateway {
                sender_id,
                sender_addr,
                gateways,
                dest_host,
                gateway_pos,
                receiver_id,
            } => {
                let relayed = relay_registration(
                    &place,
                    sender_id,
                    sender_addr,
                    gateways,
                    dest_host,
                    gateway_pos,
                    receiver_id,
                )
                .await;
                if let Err(error) = relayed {
                    warn!(%error, sender = sender_id, "registration relay failed");
                }
            }
            WireRequest::CacheAgentIp { sender_id, sender_addr, receiver_id, flush } => {
                place
                    .cache_location(receiver_id, sender_id, IpAddr::V4(sender_addr), flush)
                    .await;
            }
            WireRequest::EnqueueMessage { receiver_id, envelope } => {
                let envelope = decode_envelope(&envelope)?;
                let system = envelope.system;
                let ack = place.deliver(receiver_id, envelope).await;
                if !system {
                    write_ack(&mut stream, ack).await?;
                }
            }
            WireRequest::EnqueueMessageGateway {
                envelope,
                gateways,
                dest_host,
                gateway_pos,
                receiver_id,
            } => {
                let system = decode_envelope(&envelope)?.system;
                let ack = match relay_message(
                    &place,
                    envelope,
                    gateways,
                    dest_host,
                    gateway_pos,
                    receiver_id,
                    system,
                )
                .await
                {
                    Ok(ack) => ack,
                    Err(error) => {
                        warn!(%error, receiver = receiver_id, "message relay failed");
                        Ack::NoResidentMatch
                    }
                };
                if !system {
                    write_ack(&mut stream, ack).await?;
                }
            }
            WireRequest::DetectHost => {}
        }
    }
}

/// Walk a registration one leg down its gateway chain; position zero means
/// this place issues the final registration at the destination, carrying
/// the chain as the receiver's return path.
async fn relay_registration(
    place: &Place,
    sender_id: i32,
    sender_addr: std::net::Ipv4Addr,
    gateways: Vec<String>,
    dest_host: String,
    gateway_pos: i32,
    receiver_id: i32,
) -> Result<(), WireError> {
    let (next_host, request) = if gateway_pos <= 0 {
        (
            dest_host,
            WireRequest::RegisterAgentIp { sender_id, sender_addr, receiver_id, gateways },
        )
    } else {
        let next = next_gateway(&gateways, gateway_pos)?;
        (
            next,
            WireRequest::RegisterAgentIpGateway {
                sender_id,
                sender_addr,
                gateways,
                dest_host,
                gateway_pos: gateway_pos - 1,
                receiver_id,
            },
        )
    };
    let mut conn = place.pool().open(&next_host).await?;
    conn.send(&request).await?;
    conn.finish();
    Ok(())
}

/// Walk a delivery one leg down its gateway chain. For user envelopes the
/// ack read from the next hop propagates backward to our own client.
async fn relay_message(
    place: &Place,
    envelope: Vec<u8>,
    gateways: Vec<String>,
    dest_host: String,
    gateway_pos: i32,
    receiver_id: i32,
    system: bool,
) -> Result<Ack, WireError> {
    let (next_host, request) = if gateway_pos <= 0 {
        (dest_host, WireRequest::EnqueueMessage { receiver_id, envelope })
    } else {
        let next = next_gateway(&gateways, gateway_pos)?;
        (
            next,
            WireRequest::EnqueueMessageGateway {
                envelope,
                gateways,
                dest_host,
                gateway_pos: gateway_pos - 1,
                receiver_id,
            },
        )
    };
    let mut conn = place.pool().open(&next_host).await?;
    conn.send(&request).await?;
    let ack = if system { Ack::Delivered } else { conn.read_ack().await? };
    conn.finish();
    Ok(ack)
}

fn next_gateway(gateways: &[String], gateway_pos: i32) -> Result<String, WireError> {
    gateways.get(gateway_pos as usize - 1).cloned().ok_or(WireError::Malformed {
        what: "gateway position",
        detail: format!("position {gateway_pos} in a chain of {}", gateways.len()),
    })
}

#[cfg(test)]
#[path = "listener_tests.rs"]
mod tests;
