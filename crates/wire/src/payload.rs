// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Payload codecs for every wire function.
//!
//! The header's two parameters fix the payload layout completely, so each
//! variant reads exactly the bytes its header announced and nothing more.
//! Length fields are validated before any allocation happens.

use crate::error::WireError;
use crate::header::{read_header, write_header, Header, WireFunction, HOST_FIELD_LEN};
use roam_core::{CodeUnit, MessageEnvelope};
use std::net::Ipv4Addr;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Upper bound on any single blob field: agent state, a code unit, or a
/// serialized envelope.
pub const MAX_BLOB_LEN: usize = 64 * 1024 * 1024;
/// Upper bound on the space-delimited gateway name string.
pub const MAX_GATEWAY_FIELD_LEN: usize = 16 * 1024;
/// Upper bound on the number of code units carried with one agent.
pub const MAX_UNITS: usize = 4096;
/// Longest unit name accepted off the wire.
pub const MAX_UNIT_NAME_LEN: usize = 4096;

/// A fully decoded request, one per connection exchange.
#[derive(Debug, Clone, PartialEq)]
pub enum WireRequest {
    /// Transfer an agent's serialized state plus the code units its
    /// lineage carries.
    ReceiveAgent { agent: Vec<u8>, units: Vec<CodeUnit> },
    /// Tell the resident `receiver_id` where agent `sender_id` now runs.
    RegisterAgentIp {
        sender_id: i32,
        sender_addr: Ipv4Addr,
        receiver_id: i32,
        gateways: Vec<String>,
    },
    /// Registration relayed across a gateway chain toward `dest_host`.
    RegisterAgentIpGateway {
        sender_id: i32,
        sender_addr: Ipv4Addr,
        gateways: Vec<String>,
        dest_host: String,
        gateway_pos: i32,
        receiver_id: i32,
    },
    /// Offer a cache entry for `sender_id` to the resident `receiver_id`,
    /// or retract one when `flush` is set.
    CacheAgentIp {
        sender_id: i32,
        sender_addr: Ipv4Addr,
        receiver_id: i32,
        flush: bool,
    },
    /// Hand a serialized envelope to the resident `receiver_id`.
    EnqueueMessage { receiver_id: i32, envelope: Vec<u8> },
    /// Delivery relayed across a gateway chain toward `dest_host`.
    EnqueueMessageGateway {
        envelope: Vec<u8>,
        gateways: Vec<String>,
        dest_host: String,
        gateway_pos: i32,
        receiver_id: i32,
    },
    /// Reachability probe; completing the exchange is the whole answer.
    DetectHost,
}

impl WireRequest {
    pub fn function(&self) -> WireFunction {
        match self {
            WireRequest::ReceiveAgent { .. } => WireFunction::ReceiveAgent,
            WireRequest::RegisterAgentIp { .. } => WireFunction::RegisterAgentIp,
            WireRequest::RegisterAgentIpGateway { .. } => WireFunction::RegisterAgentIpGateway,
            WireRequest::CacheAgentIp { .. } => WireFunction::CacheAgentIp,
            WireRequest::EnqueueMessage { .. } => WireFunction::EnqueueMessage,
            WireRequest::EnqueueMessageGateway { .. } => WireFunction::EnqueueMessageGateway,
            WireRequest::DetectHost => WireFunction::DetectHost,
        }
    }

    /// Encode the header and payload onto `writer` and flush.
    pub async fn write_to<W: AsyncWrite + Unpin>(&self, writer: &mut W) -> Result<(), WireError> {
        match self {
            WireRequest::ReceiveAgent { agent, units } => {
                let header = Header::call(
                    WireFunction::ReceiveAgent,
                    wire_len("agent state", agent.len(), MAX_BLOB_LEN)?,
                    wire_len("unit count", units.len(), MAX_UNITS)?,
                );
                write_header(writer, &header).await?;
                writer.write_all(agent).await?;
                for unit in units {
                    let name = unit.name.as_bytes();
                    let name_len = wire_len("unit name", name.len(), MAX_UNIT_NAME_LEN)?;
                    let byte_len = wire_len("unit bytes", unit.bytes.len(), MAX_BLOB_LEN)?;
                    writer.write_i32(8 + name_len + byte_len).await?;
                    writer.write_i32(name_len).await?;
                    writer.write_i32(byte_len).await?;
                    writer.write_all(name).await?;
                    writer.write_all(&unit.bytes).await?;
                }
            }
            WireRequest::RegisterAgentIp { sender_id, sender_addr, receiver_id, gateways } => {
                let gw = join_gateways(gateways);
                let header = Header::call(
                    WireFunction::RegisterAgentIp,
                    *sender_id,
                    wire_len("gateway names", gw.len(), MAX_GATEWAY_FIELD_LEN)?,
                );
                write_header(writer, &header).await?;
                writer.write_all(&sender_addr.octets()).await?;
                writer.write_i32(*receiver_id).await?;
                if gw.is_empty() {
                    // One pad byte travels when the list is empty; the peer
                    // never reads it.
                    writer.write_all(&[0u8]).await?;
                } else {
                    writer.write_all(&gw).await?;
                }
            }
            WireRequest::RegisterAgentIpGateway {
                sender_id,
                sender_addr,
                gateways,
                dest_host,
                gateway_pos,
                receiver_id,
            } => {
                let gw = join_gateways(gateways);
                let header = Header::call(
                    WireFunction::RegisterAgentIpGateway,
                    *sender_id,
                    wire_len("gateway names", gw.len(), MAX_GATEWAY_FIELD_LEN)?,
                );
                write_header(writer, &header).await?;
                writer.write_all(&sender_addr.octets()).await?;
                writer.write_all(&gw).await?;
                writer.write_all(&encode_host(dest_host)?).await?;
                writer.write_i32(*gateway_pos).await?;
                writer.write_i32(*receiver_id).await?;
            }
            WireRequest::CacheAgentIp { sender_id, sender_addr, receiver_id, flush } => {
                let param2 = if *flush { -1 } else { 0 };
                let header = Header::call(WireFunction::CacheAgentIp, *sender_id, param2);
                write_header(writer, &header).await?;
                writer.write_all(&sender_addr.octets()).await?;
                writer.write_i32(*receiver_id).await?;
            }
            WireRequest::EnqueueMessage { receiver_id, envelope } => {
                let header = Header::call(
                    WireFunction::EnqueueMessage,
                    *receiver_id,
                    wire_len("envelope", envelope.len(), MAX_BLOB_LEN)?,
                );
                write_header(writer, &header).await?;
                writer.write_all(envelope).await?;
            }
            WireRequest::EnqueueMessageGateway {
                envelope,
                gateways,
                dest_host,
                gateway_pos,
                receiver_id,
            } => {
                let gw = join_gateways(gateways);
                let header = Header::call(
                    WireFunction::EnqueueMessageGateway,
                    wire_len("envelope", envelope.len(), MAX_BLOB_LEN)?,
                    wire_len("gateway names", gw.len(), MAX_GATEWAY_FIELD_LEN)?,
                );
                write_header(writer, &header).await?;
                writer.write_all(&gw).await?;
                writer.write_all(&encode_host(dest_host)?).await?;
                writer.write_i32(*gateway_pos).await?;
                writer.write_i32(*receiver_id).await?;
                writer.write_all(envelope).await?;
            }
            WireRequest::DetectHost => {
                let header = Header::call(WireFunction::DetectHost, 0, 0);
                write_header(writer, &header).await?;
            }
        }
        writer.flush().await?;
        Ok(())
    }

    /// Decode the payload for an already-read header.
    pub async fn read_payload<R: AsyncRead + Unpin>(
        header: &Header,
        reader: &mut R,
    ) -> Result<Self, WireError> {
        match header.function {
            WireFunction::ReceiveAgent => {
                let agent_len = checked_len("agent state", header.param1, MAX_BLOB_LEN)?;
                let unit_count = checked_len("unit count", header.param2, MAX_UNITS)?;
                let agent = read_blob(reader, agent_len).await?;
                let mut units = Vec::with_capacity(unit_count);
                for _ in 0..unit_count {
                    let pair_len = reader.read_i32().await?;
                    let name_len =
                        checked_len("unit name", reader.read_i32().await?, MAX_UNIT_NAME_LEN)?;
                    let byte_len =
                        checked_len("unit bytes", reader.read_i32().await?, MAX_BLOB_LEN)?;
                    let expected = 8 + name_len as i64 + byte_len as i64;
                    if i64::from(pair_len) != expected {
                        return Err(WireError::malformed(
                            "unit pair",
                            format!("declared {pair_len} bytes, fields total {expected}"),
                        ));
                    }
                    let name = read_string(reader, name_len, "unit name").await?;
                    let bytes = read_blob(reader, byte_len).await?;
                    units.push(CodeUnit::new(name, bytes));
                }
                Ok(WireRequest::ReceiveAgent { agent, units })
            }
            WireFunction::RegisterAgentIp => {
                let gw_len = checked_len("gateway names", header.param2, MAX_GATEWAY_FIELD_LEN)?;
                let sender_addr = read_addr(reader).await?;
                let receiver_id = reader.read_i32().await?;
                let gateways = split_gateways(&read_blob(reader, gw_len).await?)?;
                Ok(WireRequest::RegisterAgentIp {
                    sender_id: header.param1,
                    sender_addr,
                    receiver_id,
                    gateways,
                })
            }
            WireFunction::RegisterAgentIpGateway => {
                let gw_len = checked_len("gateway names", header.param2, MAX_GATEWAY_FIELD_LEN)?;
                let sender_addr = read_addr(reader).await?;
                let gateways = split_gateways(&read_blob(reader, gw_len).await?)?;
                let dest_host = read_host(reader).await?;
                let gateway_pos = reader.read_i32().await?;
                let receiver_id = reader.read_i32().await?;
                Ok(WireRequest::RegisterAgentIpGateway {
                    sender_id: header.param1,
                    sender_addr,
                    gateways,
                    dest_host,
                    gateway_pos,
                    receiver_id,
                })
            }
            WireFunction::CacheAgentIp => {
                let sender_addr = read_addr(reader).await?;
                let receiver_id = reader.read_i32().await?;
                Ok(WireRequest::CacheAgentIp {
                    sender_id: header.param1,
                    sender_addr,
                    receiver_id,
                    flush: header.param2 != 0,
                })
            }
            WireFunction::EnqueueMessage => {
                let msg_len = checked_len("envelope", header.param2, MAX_BLOB_LEN)?;
                let envelope = read_blob(reader, msg_len).await?;
                Ok(WireRequest::EnqueueMessage { receiver_id: header.param1, envelope })
            }
            WireFunction::EnqueueMessageGateway => {
                let msg_len = checked_len("envelope", header.param1, MAX_BLOB_LEN)?;
                let gw_len = checked_len("gateway names", header.param2, MAX_GATEWAY_FIELD_LEN)?;
                let gateways = split_gateways(&read_blob(reader, gw_len).await?)?;
                let dest_host = read_host(reader).await?;
                let gateway_pos = reader.read_i32().await?;
                let receiver_id = reader.read_i32().await?;
                let envelope = read_blob(reader, msg_len).await?;
                Ok(WireRequest::EnqueueMessageGateway {
                    envelope,
                    gateways,
                    dest_host,
                    gateway_pos,
                    receiver_id,
                })
            }
            WireFunction::DetectHost => Ok(WireRequest::DetectHost),
        }
    }

    /// Read one complete request: header, then its payload.
    pub async fn read_from<R: AsyncRead + Unpin>(reader: &mut R) -> Result<Self, WireError> {
        let header = read_header(reader).await?;
        Self::read_payload(&header, reader).await
    }
}

pub fn encode_envelope(envelope: &MessageEnvelope) -> Result<Vec<u8>, WireError> {
    Ok(serde_json::to_vec(envelope)?)
}

pub fn decode_envelope(bytes: &[u8]) -> Result<MessageEnvelope, WireError> {
    Ok(serde_json::from_slice(bytes)?)
}

/// Validate a length read off the wire before allocating for it.
fn checked_len(what: &'static str, len: i32, cap: usize) -> Result<usize, WireError> {
    if len < 0 || len as usize > cap {
        return Err(WireError::BadLength { what, len: i64::from(len) });
    }
    Ok(len as usize)
}

/// Validate an outgoing length and narrow it to the header's i32.
fn wire_len(what: &'static str, len: usize, cap: usize) -> Result<i32, WireError> {
    if len > cap {
        return Err(WireError::BadLength { what, len: len as i64 });
    }
    Ok(len as i32)
}

async fn read_blob<R: AsyncRead + Unpin>(reader: &mut R, len: usize) -> Result<Vec<u8>, WireError> {
    let mut buf = vec![0u8; len];
    reader.read_exact(&mut buf).await?;
    Ok(buf)
}

async fn read_string<R: AsyncRead + Unpin>(
    reader: &mut R,
    len: usize,
    what: &'static str,
) -> Result<String, WireError> {
    let buf = read_blob(reader, len).await?;
    String::from_utf8(buf).map_err(|e| WireError::malformed(what, e.to_string()))
}

async fn read_addr<R: AsyncRead + Unpin>(reader: &mut R) -> Result<Ipv4Addr, WireError> {
    let mut octets = [0u8; 4];
    reader.read_exact(&mut octets).await?;
    Ok(Ipv4Addr::from(octets))
}

async fn read_host<R: AsyncRead + Unpin>(reader: &mut R) -> Result<String, WireError> {
    let mut buf = [0u8; HOST_FIELD_LEN];
    reader.read_exact(&mut buf).await?;
    let host = std::str::from_utf8(&buf)
        .map_err(|e| WireError::malformed("hostname", e.to_string()))?;
    Ok(host.trim().to_string())
}

/// Space-pad a hostname to the fixed wire field.
fn encode_host(host: &str) -> Result<[u8; HOST_FIELD_LEN], WireError> {
    let bytes = host.as_bytes();
    if bytes.len() > HOST_FIELD_LEN {
        return Err(WireError::malformed(
            "hostname",
            format!("`{host}` exceeds the {HOST_FIELD_LEN}-byte field"),
        ));
    }
    let mut buf = [b' '; HOST_FIELD_LEN];
    buf[..bytes.len()].copy_from_slice(bytes);
    Ok(buf)
}

/// Join gateway names with a trailing space after each, the peer's
/// delimiter convention.
fn join_gateways(gateways: &[String]) -> Vec<u8> {
    let mut joined = String::new();
    for gateway in gateways {
        joined.push_str(gateway);
        joined.push(' ');
    }
    joined.into_bytes()
}

fn split_gateways(buf: &[u8]) -> Result<Vec<String>, WireError> {
    let text = std::str::from_utf8(buf)
        .map_err(|e| WireError::malformed("gateway names", e.to_string()))?;
    Ok(text.split_whitespace().map(str::to_string).collect())
}

#[cfg(test)]
#[path = "payload_tests.rs"]
mod tests;
