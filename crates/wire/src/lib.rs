// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Peer protocol for agent transfer, registration, and delivery.
//!
//! Wire format: a fixed 40-byte header naming the function and two layout
//! parameters, followed by a function-specific payload. Enqueue exchanges
//! answer with a single ack byte; everything else is fire-and-forget.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod ack;
mod error;
mod header;
mod payload;
mod socket;

pub use ack::{read_ack, write_ack, Ack};
pub use error::WireError;
pub use header::{
    read_header, write_header, Header, WireFunction, FUNC_TAG_LEN, HEADER_LEN, HOST_FIELD_LEN,
    MSG_TYPE_CALL,
};
pub use payload::{
    decode_envelope, encode_envelope, WireRequest, MAX_BLOB_LEN, MAX_GATEWAY_FIELD_LEN,
    MAX_UNITS, MAX_UNIT_NAME_LEN,
};
pub use socket::{WireConn, WirePool};
