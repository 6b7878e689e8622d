// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! One-byte delivery acknowledgements.
//!
//! Only the enqueue family answers with an ack, and only for user-level
//! envelopes; everything else on the wire is fire-and-forget. A peer that
//! closes the connection without answering reads as `NoResidentMatch`, the
//! original convention for "could not obtain an ack".

use crate::error::WireError;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ack {
    /// Envelope accepted by the addressed resident.
    Delivered,
    /// Addressed resident not found and the place is empty of agents... no
    /// relay possible from there.
    NoAgents,
    /// Addressed resident not found but other agents are resident, or the
    /// ack could not be read at all.
    NoResidentMatch,
    /// Addressed resident not found at the place.
    NotFound,
}

impl Ack {
    pub fn as_byte(self) -> i8 {
        match self {
            Ack::Delivered => 1,
            Ack::NotFound => -1,
            Ack::NoResidentMatch => -2,
            Ack::NoAgents => -3,
        }
    }

    pub fn from_byte(byte: i8) -> Option<Self> {
        match byte {
            1 => Some(Ack::Delivered),
            -1 => Some(Ack::NotFound),
            -2 => Some(Ack::NoResidentMatch),
            -3 => Some(Ack::NoAgents),
            _ => None,
        }
    }

    pub fn is_delivered(self) -> bool {
        self == Ack::Delivered
    }
}

/// Read the single ack byte. EOF before the byte arrives maps to
/// `NoResidentMatch` rather than an error.
pub async fn read_ack<R: AsyncRead + Unpin>(reader: &mut R) -> Result<Ack, WireError> {
    let mut buf = [0u8; 1];
    match reader.read(&mut buf).await? {
        0 => Ok(Ack::NoResidentMatch),
        _ => Ack::from_byte(buf[0] as i8)
            .ok_or_else(|| WireError::malformed("ack", format!("byte {}", buf[0] as i8))),
    }
}

pub async fn write_ack<W: AsyncWrite + Unpin>(writer: &mut W, ack: Ack) -> Result<(), WireError> {
    writer.write_all(&[ack.as_byte() as u8]).await?;
    writer.flush().await?;
    Ok(())
}

#[cfg(test)]
#[path = "ack_tests.rs"]
mod tests;
