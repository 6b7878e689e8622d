//! Shared scaffolding for the scenario specs.
//!
//! Specs boot places on distinct loopback addresses sharing one port, so
//! the addresses agents record in their directories route between places
//! the way hosts on one network would. Behaviors report what happened to
//! them through a [`Trace`] the assertions poll.

pub use async_trait::async_trait;
pub use roam_core::{MessageEnvelope, SystemNotice};
pub use roam_engine::{AgentHandle, Behavior, EntryError, UnitRegistry};
pub use roam_wire::{Ack, WireRequest};
pub use std::sync::Arc;
pub use tokio::time::{sleep, Duration};

use parking_lot::Mutex;
use roam_core::{now_epoch_ms, AgentIdentity, PlaceConfig};
use roam_daemon::Listener;
use roam_engine::{AgentState, Place};
use roam_wire::{encode_envelope, read_ack};
use std::net::{IpAddr, Ipv4Addr};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::Instant;

/// Shared event log behaviors write and specs poll.
#[derive(Clone, Default)]
pub struct Trace(Arc<Mutex<Vec<String>>>);

impl Trace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, line: impl Into<String>) {
        self.0.lock().push(line.into());
    }

    /// Whether any recorded line equals `line`.
    pub fn contains(&self, line: &str) -> bool {
        self.0.lock().iter().any(|recorded| recorded == line)
    }

    pub fn count(&self, line: &str) -> usize {
        self.0.lock().iter().filter(|recorded| *recorded == line).count()
    }
}

/// Poll `check` until it holds, failing the spec after five seconds.
pub async fn wait_until(what: &str, mut check: impl FnMut() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while !check() {
        assert!(Instant::now() < deadline, "timed out waiting for {what}");
        sleep(Duration::from_millis(10)).await;
    }
}

/// A port currently free on loopback. The places of one spec share it
/// across their distinct addresses.
pub fn free_port() -> u16 {
    let probe = std::net::TcpListener::bind(("127.0.0.1", 0)).unwrap();
    probe.local_addr().unwrap().port()
}

/// Substrate timing tightened for specs: fast probes, short bounded waits.
pub fn scenario_config(port: u16) -> PlaceConfig {
    PlaceConfig {
        port,
        probe_timeout_ms: 300,
        registration_wait_ms: 250,
        kill_grace_ms: 500,
        ..PlaceConfig::default()
    }
}

/// Boot a place listening on `ip` at the configured port, with its
/// listener and executor tasks running.
pub async fn start_place(ip: &str, config: PlaceConfig, registry: UnitRegistry) -> Place {
    let addr: IpAddr = ip.parse().unwrap();
    let socket = TcpListener::bind((addr, config.port)).await.unwrap();
    spawn_place(socket, config, addr, registry)
}

/// Boot a place that advertises `ip` while actually accepting on an
/// ephemeral loopback port, the shape of a host reachable only through a
/// tunnel. Returns the place and the port a tunnel entry must point at.
pub async fn start_masked_place(
    ip: &str,
    config: PlaceConfig,
    registry: UnitRegistry,
) -> (Place, u16) {
    let socket = TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).await.unwrap();
    let port = socket.local_addr().unwrap().port();
    (spawn_place(socket, config, ip.parse().unwrap(), registry), port)
}

fn spawn_place(
    socket: TcpListener,
    config: PlaceConfig,
    addr: IpAddr,
    registry: UnitRegistry,
) -> Place {
    let place = Place::new(config, addr, registry);
    tokio::spawn(Listener::new(socket, place.clone()).run());
    let executor = place.clone();
    tokio::spawn(async move { executor.run().await });
    place
}

/// One wire connection driving a place the way a peer would. A place
/// handles the requests of one connection in order, which specs lean on
/// to sequence fire-and-forget traffic.
pub struct Control {
    stream: TcpStream,
}

impl Control {
    pub async fn connect(host: &str, port: u16) -> Self {
        let stream = TcpStream::connect((host, port)).await.unwrap();
        Self { stream }
    }

    /// Send a request that gets no answer.
    pub async fn send(&mut self, request: &WireRequest) {
        request.write_to(&mut self.stream).await.unwrap();
    }

    /// Send a request and read the one-byte delivery ack.
    pub async fn exchange(&mut self, request: &WireRequest) -> Ack {
        request.write_to(&mut self.stream).await.unwrap();
        read_ack(&mut self.stream).await.unwrap()
    }
}

/// Serialized root agent ready for injection, no carried units.
pub fn root_state(unit: &str, max_children: i32) -> AgentState {
    AgentState::root(IpAddr::V4(Ipv4Addr::LOCALHOST), unit, "tester", max_children)
}

/// Serialized non-root agent, as if a lineage member had settled here.
pub fn resident_state(id: i32, unit: &str) -> AgentState {
    let identity = AgentIdentity::new(IpAddr::V4(Ipv4Addr::LOCALHOST), now_epoch_ms(), id);
    AgentState::with_identity(identity, unit, "tester", 4)
}

pub fn transfer_request(state: &AgentState) -> WireRequest {
    WireRequest::ReceiveAgent { agent: state.to_bytes().unwrap(), units: Vec::new() }
}

/// An enqueue request addressed to the envelope's recorded recipient.
pub fn message_request(envelope: &MessageEnvelope) -> WireRequest {
    WireRequest::EnqueueMessage {
        receiver_id: envelope.receiving_id,
        envelope: encode_envelope(envelope).unwrap(),
    }
}

pub fn user_envelope(sending_id: i32, receiving_id: i32, subject: &str) -> MessageEnvelope {
    let mut envelope = MessageEnvelope::subject(subject);
    envelope.sending_id = sending_id;
    envelope.receiving_id = receiving_id;
    envelope
}

/// A lifecycle notice as the place hosting `sending_id` would emit it.
pub fn notice_envelope(
    notice: SystemNotice,
    sending_id: i32,
    sending_addr: &str,
    receiving_id: i32,
) -> MessageEnvelope {
    let mut envelope = MessageEnvelope::notice(notice, sending_id);
    envelope.sending_addr = Some(sending_addr.parse().unwrap());
    envelope.receiving_id = receiving_id;
    envelope
}
