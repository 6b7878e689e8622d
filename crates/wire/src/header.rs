// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The fixed request header every peer exchange starts with.
//!
//! 40 bytes, big-endian: message type (i32), function tag space-padded to 28
//! bytes of UTF-8, and two i32 parameters whose meaning depends on the
//! function. The parameters fully determine the payload layout that follows,
//! so a handler always knows exactly how many bytes to read.

use crate::error::WireError;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Total header size on the wire.
pub const HEADER_LEN: usize = 40;
/// Width of the padded function tag.
pub const FUNC_TAG_LEN: usize = 28;
/// Width of a padded hostname field.
pub const HOST_FIELD_LEN: usize = 255;
/// Message type tag for a function call; the only type in use.
pub const MSG_TYPE_CALL: i32 = 1;

/// Everything a place knows how to dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WireFunction {
    ReceiveAgent,
    RegisterAgentIp,
    RegisterAgentIpGateway,
    CacheAgentIp,
    EnqueueMessage,
    EnqueueMessageGateway,
    DetectHost,
}

impl WireFunction {
    pub fn tag(self) -> &'static str {
        match self {
            WireFunction::ReceiveAgent => "receiveAgent",
            WireFunction::RegisterAgentIp => "registerAgentIp",
            WireFunction::RegisterAgentIpGateway => "registerAgentIpGateway",
            WireFunction::CacheAgentIp => "cacheAgentIp",
            WireFunction::EnqueueMessage => "enqueueMessage",
            WireFunction::EnqueueMessageGateway => "enqueueMessageGateway",
            WireFunction::DetectHost => "detectHost",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "receiveAgent" => Some(WireFunction::ReceiveAgent),
            "registerAgentIp" => Some(WireFunction::RegisterAgentIp),
            "registerAgentIpGateway" => Some(WireFunction::RegisterAgentIpGateway),
            "cacheAgentIp" => Some(WireFunction::CacheAgentIp),
            "enqueueMessage" => Some(WireFunction::EnqueueMessage),
            "enqueueMessageGateway" => Some(WireFunction::EnqueueMessageGateway),
            "detectHost" => Some(WireFunction::DetectHost),
            _ => None,
        }
    }
}

impl std::fmt::Display for WireFunction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.tag())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub message_type: i32,
    pub function: WireFunction,
    pub param1: i32,
    pub param2: i32,
}

impl Header {
    pub fn call(function: WireFunction, param1: i32, param2: i32) -> Self {
        Self { message_type: MSG_TYPE_CALL, function, param1, param2 }
    }

    pub fn encode(&self) -> [u8; HEADER_LEN] {
        let mut buf = [b' '; HEADER_LEN];
        buf[0..4].copy_from_slice(&self.message_type.to_be_bytes());
        let tag = self.function.tag().as_bytes();
        buf[4..4 + tag.len()].copy_from_slice(tag);
        buf[32..36].copy_from_slice(&self.param1.to_be_bytes());
        buf[36..40].copy_from_slice(&self.param2.to_be_bytes());
        buf
    }

    pub fn decode(buf: &[u8; HEADER_LEN]) -> Result<Self, WireError> {
        let message_type = i32::from_be_bytes([buf[0], buf[1], buf[2], buf[3]]);
        if message_type != MSG_TYPE_CALL {
            return Err(WireError::BadMessageType(message_type));
        }
        let tag = std::str::from_utf8(&buf[4..4 + FUNC_TAG_LEN])
            .map_err(|e| WireError::malformed("function tag", e.to_string()))?
            .trim();
        let function = WireFunction::from_tag(tag)
            .ok_or_else(|| WireError::UnknownFunction(tag.to_string()))?;
        let param1 = i32::from_be_bytes([buf[32], buf[33], buf[34], buf[35]]);
        let param2 = i32::from_be_bytes([buf[36], buf[37], buf[38], buf[39]]);
        Ok(Self { message_type, function, param1, param2 })
    }
}

pub async fn read_header<R: AsyncRead + Unpin>(reader: &mut R) -> Result<Header, WireError> {
    let mut buf = [0u8; HEADER_LEN];
    reader.read_exact(&mut buf).await?;
    Header::decode(&buf)
}

pub async fn write_header<W: AsyncWrite + Unpin>(
    writer: &mut W,
    header: &Header,
) -> Result<(), WireError> {
    writer.write_all(&header.encode()).await?;
    Ok(())
}

#[cfg(test)]
#[path = "header_tests.rs"]
mod tests;
