// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Pooled outbound connections, one exclusive slot per destination.
//!
//! A slot serializes every exchange bound for the same host and port, so
//! two agents on one place can never interleave bytes on a shared stream.
//! Streams stay cached between exchanges; a cached stream is probed before
//! reuse and silently replaced when the peer hung up in the meantime.

use crate::ack::{read_ack, Ack};
use crate::error::WireError;
use crate::payload::WireRequest;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tokio::time::timeout;

/// Local address tunnel relays listen on.
const TUNNEL_RELAY_HOST: &str = "127.0.0.1";

#[derive(Default)]
struct Slot {
    stream: Option<TcpStream>,
}

struct PoolInner {
    port: u16,
    tunnels: HashMap<String, u16>,
    connect_timeout: Duration,
    slots: Mutex<HashMap<(String, u16), Arc<AsyncMutex<Slot>>>>,
}

/// Shared handle to the per-destination connection slots.
#[derive(Clone)]
pub struct WirePool {
    inner: Arc<PoolInner>,
}

impl WirePool {
    pub fn new(port: u16, tunnels: HashMap<String, u16>, connect_timeout: Duration) -> Self {
        Self {
            inner: Arc::new(PoolInner {
                port,
                tunnels,
                connect_timeout,
                slots: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// The port peers listen on when no tunnel overrides it.
    pub fn port(&self) -> u16 {
        self.inner.port
    }

    /// Acquire the destination's slot and hand back a live connection.
    /// Blocks while another exchange to the same destination is in flight.
    pub async fn open(&self, host: &str) -> Result<WireConn, WireError> {
        // A tunneled destination is reached through a relay bound on this
        // host; only the slot key keeps the logical name.
        let (connect_host, port) = match self.inner.tunnels.get(host) {
            Some(&port) => (TUNNEL_RELAY_HOST, port),
            None => (host, self.inner.port),
        };
        let slot = {
            let mut slots = self.inner.slots.lock();
            Arc::clone(
                slots
                    .entry((host.to_string(), port))
                    .or_insert_with(|| Arc::new(AsyncMutex::new(Slot::default()))),
            )
        };
        let mut guard = slot.lock_owned().await;

        let stream = match guard.stream.take().filter(stream_alive) {
            Some(stream) => stream,
            None => self.connect(connect_host, port).await?,
        };
        Ok(WireConn { guard, stream: Some(stream), host: host.to_string(), port })
    }

    /// Reachability check: a completed detect exchange is the answer.
    pub async fn probe(&self, host: &str) -> bool {
        match self.open(host).await {
            Ok(mut conn) => match conn.send(&WireRequest::DetectHost).await {
                Ok(()) => {
                    conn.finish();
                    true
                }
                Err(_) => false,
            },
            Err(_) => false,
        }
    }

    async fn connect(&self, host: &str, port: u16) -> Result<TcpStream, WireError> {
        match timeout(self.inner.connect_timeout, TcpStream::connect((host, port))).await {
            Ok(result) => Ok(result?),
            Err(_) => Err(WireError::ConnectTimeout {
                host: host.to_string(),
                port,
                timeout: self.inner.connect_timeout,
            }),
        }
    }
}

/// A cached stream is reusable only while the peer holds its end open and
/// quiet.
fn stream_alive(stream: &TcpStream) -> bool {
    let mut probe = [0u8; 1];
    matches!(stream.try_read(&mut probe), Err(ref e) if e.kind() == io::ErrorKind::WouldBlock)
}

/// One exchange on a destination's slot. Dropping without `finish` discards
/// the stream; the next open reconnects.
pub struct WireConn {
    guard: OwnedMutexGuard<Slot>,
    stream: Option<TcpStream>,
    host: String,
    port: u16,
}

impl WireConn {
    pub fn peer(&self) -> (&str, u16) {
        (&self.host, self.port)
    }

    /// Local endpoint of the live stream, the address the peer sees.
    pub fn local_addr(&self) -> Result<SocketAddr, WireError> {
        let stream = self.stream.as_ref().ok_or_else(stale_conn)?;
        Ok(stream.local_addr()?)
    }

    pub async fn send(&mut self, request: &WireRequest) -> Result<(), WireError> {
        let stream = self.stream.as_mut().ok_or_else(stale_conn)?;
        match request.write_to(stream).await {
            Ok(()) => Ok(()),
            Err(err) => {
                self.stream = None;
                Err(err)
            }
        }
    }

    /// Read the delivery ack for an enqueue exchange.
    pub async fn read_ack(&mut self) -> Result<Ack, WireError> {
        let stream = self.stream.as_mut().ok_or_else(stale_conn)?;
        match read_ack(stream).await {
            Ok(ack) => Ok(ack),
            Err(err) => {
                self.stream = None;
                Err(err)
            }
        }
    }

    /// Return the stream to the slot for the next exchange.
    pub fn finish(mut self) {
        if let Some(stream) = self.stream.take() {
            self.guard.stream = Some(stream);
        }
    }
}

fn stale_conn() -> WireError {
    WireError::Io(io::Error::new(io::ErrorKind::NotConnected, "exchange already failed"))
}

#[cfg(test)]
#[path = "socket_tests.rs"]
mod tests;
