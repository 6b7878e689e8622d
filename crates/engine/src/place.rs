// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The place: one per process, hosting every agent resident on this host.
//!
//! Admission and execution are decoupled. `receive_agent` validates a
//! transfer, stores the carried units under the agent's identity, and
//! queues the decoded state; the executor loop turns queued arrivals into
//! resident cells, each driven by its own task. The residents list is
//! chronological: management commands scan it oldest first, delivery scans
//! newest first so a re-arrived agent shadows the zombie it left behind.

use crate::agent::AgentHandle;
use crate::error::{ReceiveError, UnitError};
use crate::loader::UnitLoader;
use crate::registry::{Behavior, UnitRegistry};
use crate::state::{AgentState, HOP_RELAY_ENTRY};
use parking_lot::Mutex;
use roam_core::{AgentIdentity, CodeUnit, MessageEnvelope, PlaceConfig, UnitTable};
use roam_wire::{Ack, WireError, WirePool, WireRequest};
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::io;
use std::net::IpAddr;
use std::pin::pin;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tokio::time::{sleep, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Attempts made to find a resident that a registration or cache push
/// names, one second apart. Arrivals still in the executor queue register
/// within the window.
const RESIDENT_LOOKUP_ATTEMPTS: u32 = 3;

struct PlaceInner {
    config: PlaceConfig,
    local_addr: IpAddr,
    registry: Arc<UnitRegistry>,
    pool: WirePool,
    /// Resident cells in arrival order, newest last. Zombies stay.
    residents: Mutex<Vec<AgentHandle>>,
    units: Mutex<HashMap<AgentIdentity, UnitTable>>,
    loaders: Mutex<HashMap<AgentIdentity, Arc<UnitLoader>>>,
    arrivals: Mutex<VecDeque<AgentState>>,
    arrival_ready: Notify,
    shutdown: CancellationToken,
}

/// Shared handle to the host runtime.
#[derive(Clone)]
pub struct Place {
    inner: Arc<PlaceInner>,
}

impl Place {
    pub fn new(config: PlaceConfig, local_addr: IpAddr, registry: UnitRegistry) -> Self {
        let pool = WirePool::new(config.port, config.tunnels.clone(), config.probe_timeout());
        Self {
            inner: Arc::new(PlaceInner {
                config,
                local_addr,
                registry: Arc::new(registry),
                pool,
                residents: Mutex::new(Vec::new()),
                units: Mutex::new(HashMap::new()),
                loaders: Mutex::new(HashMap::new()),
                arrivals: Mutex::new(VecDeque::new()),
                arrival_ready: Notify::new(),
                shutdown: CancellationToken::new(),
            }),
        }
    }

    pub fn config(&self) -> &PlaceConfig {
        &self.inner.config
    }

    pub fn local_addr(&self) -> IpAddr {
        self.inner.local_addr
    }

    pub fn pool(&self) -> &WirePool {
        &self.inner.pool
    }

    pub fn resident_count(&self) -> usize {
        self.inner.residents.lock().len()
    }

    /// Stop accepting transfers and cancel every resident's task group.
    pub fn shutdown(&self) {
        self.inner.shutdown.cancel();
    }

    pub fn shutdown_token(&self) -> CancellationToken {
        self.inner.shutdown.clone()
    }

    /// Admit a serialized agent plus its carried units. The unit table and
    /// loader for the identity are replaced wholesale; a hopping agent
    /// brings its current closure with every arrival.
    pub fn receive_agent(&self, agent: &[u8], units: Vec<CodeUnit>) -> Result<(), ReceiveError> {
        if self.inner.shutdown.is_cancelled() {
            return Err(ReceiveError::ShuttingDown);
        }
        let state = AgentState::from_bytes(agent)?;
        let identity = state.identity;
        let table: UnitTable = units.into_iter().collect();
        self.inner.units.lock().insert(identity, table.clone());
        self.inner
            .loaders
            .lock()
            .insert(identity, Arc::new(UnitLoader::new(Arc::clone(&self.inner.registry), table)));
        info!(
            agent = %identity,
            unit = %state.unit,
            entry = %state.next_entry,
            "agent admitted"
        );
        self.inner.arrivals.lock().push_back(state);
        self.inner.arrival_ready.notify_one();
        Ok(())
    }

    /// The executor loop: drain queued arrivals into resident cells until
    /// shutdown. Run exactly once per place.
    pub async fn run(&self) {
        loop {
            let mut ready = pin!(self.inner.arrival_ready.notified());
            ready.as_mut().enable();
            if let Some(state) = self.inner.arrivals.lock().pop_front() {
                self.start_resident(state);
                continue;
            }
            tokio::select! {
                _ = &mut ready => {}
                _ = self.inner.shutdown.cancelled() => return,
            }
        }
    }

    fn start_resident(&self, state: AgentState) {
        let agent = AgentHandle::new(state, self.clone(), self.inner.shutdown.child_token());
        self.inner.residents.lock().push(agent.clone());
        let place = self.clone();
        let cell = agent.clone();
        let task = tokio::spawn(async move { place.run_agent(cell).await });
        agent.attach_task(task);
    }

    /// One arrival's run: announce to the parent, dispatch the pending
    /// entry, then wind down. An arrival that only moved within this host
    /// skips the announcement its departing cell never pairs.
    async fn run_agent(&self, agent: AgentHandle) {
        let identity = agent.identity();
        if !agent.take_moved_in_place() {
            agent.announce_started().await;
        }
        agent.pass_gate().await;
        let (entry, args) = agent.pending_entry();
        let cancel = agent.cancel_token();
        if entry == HOP_RELAY_ENTRY {
            tokio::select! {
                result = agent.hop_relay() => {
                    if let Err(error) = result {
                        warn!(agent = %identity, %error, "gateway relay leg failed");
                    }
                }
                _ = cancel.cancelled() => {}
            }
        } else {
            let unit = agent.unit();
            match self.behavior_for(&identity, &unit) {
                Ok(behavior) => {
                    tokio::select! {
                        result = behavior.entry(&agent, &entry, &args) => {
                            if let Err(error) = result {
                                warn!(agent = %identity, entry = %entry, %error, "entry returned an error");
                            }
                        }
                        _ = cancel.cancelled() => {
                            debug!(agent = %identity, "entry cancelled");
                        }
                    }
                }
                Err(error) => {
                    warn!(agent = %identity, unit = %unit, %error, "no runnable behavior for arrival");
                }
            }
        }
        self.wind_down(agent).await;
    }

    fn behavior_for(
        &self,
        identity: &AgentIdentity,
        unit: &str,
    ) -> Result<Arc<dyn Behavior>, UnitError> {
        let loader = self.inner.loaders.lock().get(identity).cloned();
        match loader {
            Some(loader) => loader.resolve(unit),
            None => Err(UnitError::Unknown(unit.to_string())),
        }
    }

    /// After the entry returns: a hopped agent pairs its arrival notice and
    /// stays as a relay record; anything else waits for its children, says
    /// goodbye, and leaves.
    async fn wind_down(&self, agent: AgentHandle) {
        let identity = agent.identity();
        if agent.is_zombie() {
            agent.announce_exiting().await;
            self.release_tables(&identity);
            info!(agent = %identity, "staying resident as relay record");
            return;
        }
        if agent.moved_in_place() {
            // The newer cell carries the lineage now and still needs the
            // identity-keyed unit and loader tables.
            self.remove_resident(&agent);
            info!(agent = %identity, "moved within the place, old cell dropped");
            return;
        }
        agent.wait_children().await;
        agent.announce_exiting().await;
        self.release_tables(&identity);
        self.remove_resident(&agent);
        info!(agent = %identity, "agent wound down");
    }

    fn release_tables(&self, identity: &AgentIdentity) {
        self.inner.units.lock().remove(identity);
        self.inner.loaders.lock().remove(identity);
    }

    fn remove_resident(&self, agent: &AgentHandle) {
        self.inner.residents.lock().retain(|resident| !resident.same_cell(agent));
    }

    /// Hand an envelope to the resident with id `receiver_id`. Newest
    /// match wins, so traffic reaches a re-arrived agent instead of the
    /// zombie it once left here.
    pub async fn deliver(&self, receiver_id: i32, envelope: MessageEnvelope) -> Ack {
        let target = {
            let residents = self.inner.residents.lock();
            residents.iter().rev().find(|agent| agent.id() == receiver_id).cloned()
        };
        match target {
            Some(agent) => {
                if agent.enqueue_message(envelope).await {
                    Ack::Delivered
                } else {
                    Ack::NotFound
                }
            }
            None if self.inner.residents.lock().is_empty() => Ack::NoAgents,
            None => Ack::NoResidentMatch,
        }
    }

    /// Record `sender_id` -> `sender_addr` in the named resident's
    /// directory. Waits briefly for an arrival still in the executor queue.
    pub async fn register_location(
        &self,
        receiver_id: i32,
        sender_id: i32,
        sender_addr: IpAddr,
        gateways: &[String],
    ) -> bool {
        let Some(agent) = self.find_resident(receiver_id).await else {
            warn!(receiver = receiver_id, sender = sender_id, "registration for absent resident dropped");
            return false;
        };
        agent.register_peer(sender_id, sender_addr, gateways);
        true
    }

    /// Offer or retract a cache entry on the named resident. The sender
    /// must answer a probe first; unreachable peers are never cached.
    pub async fn cache_location(
        &self,
        receiver_id: i32,
        sender_id: i32,
        sender_addr: IpAddr,
        flush: bool,
    ) -> bool {
        if !self.probe(&sender_addr.to_string()).await {
            debug!(sender = sender_id, addr = %sender_addr, "cache push from unreachable sender dropped");
            return false;
        }
        let Some(agent) = self.find_resident(receiver_id).await else {
            debug!(receiver = receiver_id, sender = sender_id, "cache push for absent resident dropped");
            return false;
        };
        agent.cache_peer(sender_id, if flush { None } else { Some(sender_addr) });
        true
    }

    async fn find_resident(&self, agent_id: i32) -> Option<AgentHandle> {
        for attempt in 0..RESIDENT_LOOKUP_ATTEMPTS {
            if attempt > 0 {
                sleep(Duration::from_secs(1)).await;
            }
            let found = self.newest_resident(agent_id);
            if found.is_some() {
                return found;
            }
        }
        None
    }

    /// Management and delivery both prefer the latest arrival when a zombie
    /// shares its id with a live instance.
    fn newest_resident(&self, agent_id: i32) -> Option<AgentHandle> {
        let residents = self.inner.residents.lock();
        residents.iter().rev().find(|agent| agent.id() == agent_id).cloned()
    }

    /// Cancel the most recently registered resident with this id, grant it
    /// the configured grace in one-second checks, then abort its task.
    /// Tables and the resident entry go regardless of how it stopped.
    pub async fn kill_agent(&self, agent_id: i32) -> bool {
        let Some(agent) = self.newest_resident(agent_id) else {
            return false;
        };
        agent.cancel_token().cancel();
        let deadline = Instant::now() + self.inner.config.kill_grace();
        loop {
            if agent.task_finished() {
                break;
            }
            let now = Instant::now();
            if now >= deadline {
                warn!(agent = agent_id, "did not stop within grace, aborting task");
                agent.abort_task();
                break;
            }
            sleep((deadline - now).min(Duration::from_secs(1))).await;
        }
        let identity = agent.identity();
        self.release_tables(&identity);
        self.remove_resident(&agent);
        info!(agent = agent_id, "agent killed");
        true
    }

    /// Gate the most recently registered resident with this id. Returns
    /// whether a running agent was actually moved into the suspended state.
    pub fn suspend_agent(&self, agent_id: i32) -> bool {
        match self.newest_resident(agent_id) {
            Some(agent) => {
                let changed = agent.suspend();
                info!(agent = agent_id, changed, "suspend requested");
                changed
            }
            None => false,
        }
    }

    pub fn resume_agent(&self, agent_id: i32) -> bool {
        match self.newest_resident(agent_id) {
            Some(agent) => {
                let changed = agent.resume();
                info!(agent = agent_id, changed, "resume requested");
                changed
            }
            None => false,
        }
    }

    /// Snapshot of every resident, oldest first.
    pub fn status(&self) -> Vec<ResidentStatus> {
        let residents = self.inner.residents.lock();
        residents
            .iter()
            .map(|agent| {
                let identity = agent.identity();
                ResidentStatus {
                    agent_id: identity.agent_id,
                    unit: agent.unit(),
                    client: agent.client(),
                    origin: identity.origin,
                    spawned_at_ms: identity.spawned_at_ms,
                    phase: if agent.is_zombie() {
                        AgentPhase::Zombie
                    } else if agent.is_suspended() {
                        AgentPhase::Suspended
                    } else {
                        AgentPhase::Running
                    },
                }
            })
            .collect()
    }

    /// Transfer a serialized agent and its unit closure to a peer place.
    pub async fn send_agent(
        &self,
        host: &str,
        agent: Vec<u8>,
        units: Vec<CodeUnit>,
    ) -> Result<(), WireError> {
        let request = WireRequest::ReceiveAgent { agent, units };
        let mut conn = self.inner.pool.open(host).await?;
        conn.send(&request).await?;
        conn.finish();
        Ok(())
    }

    pub async fn probe(&self, host: &str) -> bool {
        self.inner.pool.probe(host).await
    }

    /// Resolve a host name to the address peers will see in directories.
    /// IPv4 results win over IPv6 ones.
    pub async fn resolve_host(&self, host: &str) -> io::Result<IpAddr> {
        if let Ok(addr) = host.parse::<IpAddr>() {
            return Ok(addr);
        }
        let port = self.inner.config.tunnel_port(host).unwrap_or(self.inner.config.port);
        let addrs: Vec<_> = tokio::net::lookup_host((host, port)).await?.collect();
        addrs
            .iter()
            .find(|addr| addr.is_ipv4())
            .or_else(|| addrs.first())
            .map(|addr| addr.ip())
            .ok_or_else(|| {
                io::Error::new(io::ErrorKind::NotFound, format!("no address for host {host}"))
            })
    }

    /// Carried units for an identity, cloned for an outbound transfer.
    pub(crate) fn units_for(&self, identity: &AgentIdentity) -> Vec<CodeUnit> {
        self.inner
            .units
            .lock()
            .get(identity)
            .map(|table| table.iter().collect())
            .unwrap_or_default()
    }

    /// Whether a unit name would resolve here for this lineage, without
    /// materializing anything.
    pub(crate) fn can_resolve(&self, identity: &AgentIdentity, name: &str) -> bool {
        let carried = {
            let units = self.inner.units.lock();
            units.get(identity).is_some_and(|table| table.resolve_name(name).is_some())
        };
        carried || self.inner.registry.contains(name)
    }

    #[cfg(test)]
    pub(crate) fn loader_for(&self, identity: &AgentIdentity) -> Option<Arc<UnitLoader>> {
        self.inner.loaders.lock().get(identity).cloned()
    }
}

impl fmt::Debug for Place {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Place")
            .field("local_addr", &self.inner.local_addr)
            .field("port", &self.inner.config.port)
            .finish_non_exhaustive()
    }
}

/// One row of a status listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResidentStatus {
    pub agent_id: i32,
    pub unit: String,
    pub client: String,
    pub origin: IpAddr,
    pub spawned_at_ms: u64,
    pub phase: AgentPhase,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentPhase {
    Running,
    Suspended,
    Zombie,
}

impl AgentPhase {
    pub fn label(self) -> &'static str {
        match self {
            AgentPhase::Running => "running",
            AgentPhase::Suspended => "suspended",
            AgentPhase::Zombie => "zombie",
        }
    }
}

impl fmt::Display for AgentPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl fmt::Display for ResidentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "agent {} unit {} client {} origin {} spawned {} {}",
            self.agent_id, self.unit, self.client, self.origin, self.spawned_at_ms, self.phase
        )
    }
}

#[cfg(test)]
#[path = "place_tests.rs"]
mod tests;
