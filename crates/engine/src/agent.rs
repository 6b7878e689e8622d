// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The resident agent cell and the handle behaviors drive it through.
//!
//! A cell is created per arrival and owns the agent's mutable state, its
//! mailbox, and its suspension gate. Every public operation that can leave
//! the place (`talk`, `hop`, `spawn_child`) and the inbox read (`recv`)
//! passes the gate first, so a suspended agent halts at exactly those
//! points. Hopping serializes under the inbox lock shared with inbound
//! delivery; after a successful transfer the cell stays behind as a zombie
//! that relays traffic to the forwarding address.

use crate::error::{HopError, TalkError};
use crate::gate::SuspendGate;
use crate::mailbox::Mailbox;
use crate::place::Place;
use crate::state::{AgentState, HOP_RELAY_ENTRY, INIT_ENTRY};
use parking_lot::Mutex;
use roam_core::{next_hop, AgentIdentity, MessageEnvelope, NextHop, SystemNotice};
use roam_wire::{Ack, WireError};
use std::net::IpAddr;
use std::pin::pin;
use std::sync::Arc;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time::{timeout, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Next hop chosen for an envelope: the resident to hand it to, the place
/// address it lives at, and the gateway chain recorded for it.
struct Route {
    hop_id: i32,
    addr: IpAddr,
    gateways: Vec<String>,
}

pub(crate) struct AgentCell {
    state: Mutex<AgentState>,
    mailbox: Mailbox,
    gate: SuspendGate,
    cancel: CancellationToken,
    /// Signalled on every directory registration and child notice; routing
    /// waits and the wind-down wait both re-check their condition on it.
    children_changed: Notify,
    place: Place,
    task: Mutex<Option<JoinHandle<()>>>,
}

/// Shared handle to a resident agent. Behaviors receive one as their only
/// connection to the runtime; the place keeps a clone per resident.
#[derive(Clone)]
pub struct AgentHandle {
    cell: Arc<AgentCell>,
}

impl AgentHandle {
    pub(crate) fn new(state: AgentState, place: Place, cancel: CancellationToken) -> Self {
        let mailbox = Mailbox::new(place.pool().clone(), place.local_addr());
        Self {
            cell: Arc::new(AgentCell {
                state: Mutex::new(state),
                mailbox,
                gate: SuspendGate::new(),
                cancel,
                children_changed: Notify::new(),
                place,
                task: Mutex::new(None),
            }),
        }
    }

    pub fn id(&self) -> i32 {
        self.cell.state.lock().agent_id()
    }

    pub fn parent_id(&self) -> Option<i32> {
        self.cell.state.lock().parent_id()
    }

    pub fn identity(&self) -> AgentIdentity {
        self.cell.state.lock().identity
    }

    pub fn unit(&self) -> String {
        self.cell.state.lock().unit.clone()
    }

    pub fn client(&self) -> String {
        self.cell.state.lock().client.clone()
    }

    pub fn max_children(&self) -> i32 {
        self.cell.state.lock().max_children
    }

    pub fn alive_children(&self) -> i32 {
        self.cell.state.lock().alive_children
    }

    pub fn child_ids(&self) -> Vec<i32> {
        self.cell.state.lock().child_ids.iter().copied().collect()
    }

    /// Whether this cell is the relay record left behind by a hop.
    pub fn is_zombie(&self) -> bool {
        self.cell.state.lock().is_zombie()
    }

    /// Whether a hop moved this agent to the host it was already on.
    pub(crate) fn moved_in_place(&self) -> bool {
        self.cell.state.lock().local_hop
    }

    /// Consume the in-place marker a hop shipped with the state. True on the
    /// first arrival after such a hop, false afterwards.
    pub(crate) fn take_moved_in_place(&self) -> bool {
        std::mem::take(&mut self.cell.state.lock().local_hop)
    }

    pub fn is_suspended(&self) -> bool {
        self.cell.gate.is_suspended()
    }

    pub fn local_addr(&self) -> IpAddr {
        self.cell.mailbox.local_addr()
    }

    pub fn place(&self) -> &Place {
        &self.cell.place
    }

    pub(crate) fn with_state<R>(&self, f: impl FnOnce(&AgentState) -> R) -> R {
        f(&self.cell.state.lock())
    }

    pub(crate) fn with_state_mut<R>(&self, f: impl FnOnce(&mut AgentState) -> R) -> R {
        f(&mut self.cell.state.lock())
    }

    /// Entry point and arguments to run on the next (or current) arrival.
    pub(crate) fn pending_entry(&self) -> (String, Vec<String>) {
        let state = self.cell.state.lock();
        (state.next_entry.clone(), state.next_args.clone())
    }

    /// Hold here while the agent is suspended. Entry dispatch waits on this
    /// before invoking behavior code.
    pub(crate) async fn pass_gate(&self) {
        self.cell.gate.pass().await;
    }

    pub(crate) fn same_cell(&self, other: &AgentHandle) -> bool {
        Arc::ptr_eq(&self.cell, &other.cell)
    }

    pub(crate) fn suspend(&self) -> bool {
        self.cell.gate.suspend()
    }

    pub(crate) fn resume(&self) -> bool {
        self.cell.gate.resume()
    }

    pub(crate) fn cancel_token(&self) -> CancellationToken {
        self.cell.cancel.clone()
    }

    pub(crate) fn attach_task(&self, task: JoinHandle<()>) {
        *self.cell.task.lock() = Some(task);
    }

    pub(crate) fn task_finished(&self) -> bool {
        self.cell.task.lock().as_ref().map_or(true, JoinHandle::is_finished)
    }

    pub(crate) fn abort_task(&self) {
        if let Some(task) = self.cell.task.lock().as_ref() {
            task.abort();
        }
    }

    /// Pop the next inbox envelope, blocking while the inbox is empty and
    /// while the agent is suspended. Returns `None` once per
    /// [`wake_receiver`](Self::wake_receiver) call.
    pub async fn recv(&self) -> Option<MessageEnvelope> {
        self.cell.gate.pass().await;
        self.cell.mailbox.recv().await
    }

    /// Release a `recv` blocked on an empty inbox.
    pub async fn wake_receiver(&self) {
        self.cell.mailbox.wake_receiver().await;
    }

    pub async fn pending_messages(&self) -> usize {
        self.cell.mailbox.pending().await
    }

    /// Send an envelope to the agent `recipient` anywhere in the lineage.
    /// The envelope travels hop by hop through relatives; the returned ack
    /// reports what the first hop's place observed.
    pub async fn talk(&self, recipient: i32, envelope: MessageEnvelope) -> Result<Ack, TalkError> {
        self.cell.gate.pass().await;
        self.dispatch(recipient, envelope).await
    }

    /// Route and send without passing the suspension gate. Wind-down
    /// notices use this path so a suspended or cancelled agent can still
    /// report its exit.
    async fn dispatch(
        &self,
        recipient: i32,
        mut envelope: MessageEnvelope,
    ) -> Result<Ack, TalkError> {
        let route = self.route_to(recipient).await?;
        envelope.sending_id = self.id();
        envelope.sending_addr = Some(self.local_addr());
        envelope.receiving_id = recipient;
        envelope.receiving_addr = Some(route.addr);
        envelope.gateways = route.gateways.clone();
        Ok(self.send_routed(&route, &envelope).await?)
    }

    async fn send_routed(
        &self,
        route: &Route,
        envelope: &MessageEnvelope,
    ) -> Result<Ack, WireError> {
        if route.gateways.is_empty() {
            self.cell.mailbox.send_message(route.addr, route.hop_id, envelope).await
        } else {
            self.cell
                .mailbox
                .send_message_via(&route.gateways, route.addr, route.hop_id, envelope)
                .await
        }
    }

    /// Resolve the next hop toward `target`. When the hop is the target
    /// itself and its address is unknown, wait for a registration up to the
    /// configured bound before giving up.
    async fn route_to(&self, target: i32) -> Result<Route, TalkError> {
        let my_id = self.id();
        if target < 0 {
            return Err(TalkError::Unreachable { target, from: my_id });
        }
        let deadline = Instant::now() + self.cell.place.config().registration_wait();
        loop {
            let mut registered = pin!(self.cell.children_changed.notified());
            registered.as_mut().enable();
            if let Some(route) = self.try_route(target, my_id)? {
                return Ok(route);
            }
            let now = Instant::now();
            if now >= deadline {
                warn!(agent = my_id, target, "no registration for next hop within the wait bound");
                return Err(TalkError::Unreachable { target, from: my_id });
            }
            let _ = timeout(deadline - now, &mut registered).await;
        }
    }

    /// One routing attempt against the current directory. `Ok(None)` means
    /// the next hop is the target itself and has not registered yet.
    fn try_route(&self, target: i32, my_id: i32) -> Result<Option<Route>, TalkError> {
        let state = self.cell.state.lock();
        if let Some(addr) = state.directory.lookup(target) {
            return Ok(Some(Route {
                hop_id: target,
                addr,
                gateways: state.directory.gateway_chain(target),
            }));
        }
        let hop = match next_hop(my_id, target, state.max_children) {
            None => return Err(TalkError::Unreachable { target, from: my_id }),
            Some(NextHop::Parent(parent)) => parent,
            Some(NextHop::Child(child)) => child,
        };
        match state.directory.lookup(hop) {
            Some(addr) => Ok(Some(Route {
                hop_id: hop,
                addr,
                gateways: state.directory.gateway_chain(hop),
            })),
            None if hop == target => Ok(None),
            None => Err(TalkError::UnknownHop { hop, target }),
        }
    }

    /// Move this agent to `host` and invoke `entry(args)` there. When the
    /// place declares a gateway and the destination does not answer a probe,
    /// the trip is wrapped through the gateway automatically.
    pub async fn hop(&self, host: &str, entry: &str, args: &[String]) -> Result<(), HopError> {
        self.cell.gate.pass().await;
        if let Some(gateway) = self.cell.place.config().gateway.clone() {
            if !self.cell.place.probe(host).await {
                info!(
                    agent = self.id(),
                    host,
                    via = %gateway,
                    "destination not directly reachable, routing through gateway"
                );
                return self.hop_via(std::slice::from_ref(&gateway), host, entry, args).await;
            }
        }
        let chain = { self.cell.state.lock().dest_gateways.clone() };
        self.hop_direct(host, entry, args, chain).await
    }

    /// Move to `host` by traversing `gateways` in order, then invoke
    /// `entry(args)` at the destination.
    pub async fn hop_via(
        &self,
        gateways: &[String],
        host: &str,
        entry: &str,
        args: &[String],
    ) -> Result<(), HopError> {
        self.cell.gate.pass().await;
        {
            let mut state = self.cell.state.lock();
            state.dest_host = Some(host.to_string());
            state.dest_gateways = gateways.to_vec();
            state.dest_gateway_pos = 0;
            state.dest_entry = entry.to_string();
            state.dest_args = args.to_vec();
        }
        self.hop_relay().await
    }

    /// One leg of a gateway traversal. Invoked at each gateway arrival and
    /// once at the origin; the final position clears the itinerary and
    /// delivers the stored entry at the true destination.
    pub(crate) async fn hop_relay(&self) -> Result<(), HopError> {
        enum Leg {
            Onward { next: String, chain: Vec<String> },
            Arrive { host: String, entry: String, args: Vec<String>, chain: Vec<String> },
        }
        let leg = {
            let mut state = self.cell.state.lock();
            let pos = state.dest_gateway_pos.max(0) as usize;
            if pos < state.dest_gateways.len() {
                let next = state.dest_gateways[pos].clone();
                state.dest_gateway_pos = pos as i32 + 1;
                Leg::Onward { next, chain: state.dest_gateways.clone() }
            } else {
                let host = state.dest_host.take().ok_or(HopError::NoDestination)?;
                let chain = std::mem::take(&mut state.dest_gateways);
                state.dest_gateway_pos = 0;
                let entry = std::mem::replace(&mut state.dest_entry, INIT_ENTRY.to_string());
                let args = std::mem::take(&mut state.dest_args);
                Leg::Arrive { host, entry, args, chain }
            }
        };
        match leg {
            Leg::Onward { next, chain } => self.hop_direct(&next, HOP_RELAY_ENTRY, &[], chain).await,
            Leg::Arrive { host, entry, args, chain } => {
                self.hop_direct(&host, &entry, &args, chain).await
            }
        }
    }

    /// The transfer itself. `chain` is the gateway chain the notifications
    /// advertise as the return path; relatives always learn the new address,
    /// cached colleagues learn it on direct trips and are flushed on
    /// gateway trips.
    async fn hop_direct(
        &self,
        host: &str,
        entry: &str,
        args: &[String],
        chain: Vec<String>,
    ) -> Result<(), HopError> {
        let place = self.cell.place.clone();
        let dest_addr = place
            .resolve_host(host)
            .await
            .map_err(|source| HopError::Resolve { host: host.to_string(), source })?;
        let my_id = self.id();

        let (identity, relatives, colleagues) = {
            let mut state = self.cell.state.lock();
            state.next_entry = entry.to_string();
            state.next_args = args.to_vec();
            let mut relatives = Vec::new();
            for child in &state.child_ids {
                if let Some(addr) = state.directory.lookup_directory(*child) {
                    relatives.push((*child, addr));
                }
            }
            if let Some(parent) = state.parent_id() {
                if let Some(addr) = state.directory.lookup_directory(parent) {
                    relatives.push((parent, addr));
                }
            }
            (state.identity, relatives, state.directory.cached_entries())
        };

        for (peer, peer_addr) in &relatives {
            if let Err(error) = self
                .cell
                .mailbox
                .register_location(*peer_addr, *peer, my_id, dest_addr, &chain)
                .await
            {
                warn!(agent = my_id, peer, %error, "relative not notified of new address");
            }
        }
        if chain.is_empty() {
            for (peer, peer_addr) in &colleagues {
                if let Err(error) =
                    self.cell.mailbox.share_location(*peer_addr, *peer, my_id, dest_addr).await
                {
                    debug!(agent = my_id, peer, %error, "cached colleague not updated");
                }
            }
        } else {
            // Behind a gateway the old shortcuts are wrong both ways: flush
            // remote caches of me and keep only relatives locally.
            for (peer, peer_addr) in &colleagues {
                if let Err(error) =
                    self.cell.mailbox.flush_location(*peer_addr, *peer, my_id).await
                {
                    debug!(agent = my_id, peer, %error, "cached colleague not flushed");
                }
            }
            let mut state = self.cell.state.lock();
            let owner = state.agent_id();
            let branching = state.max_children;
            state.directory.retain_relatives(owner, branching);
            state.directory.flush_cache();
        }

        // Inbox lock held through the transfer: a delivery racing the hop
        // either lands before the serialization or meets the departed cell.
        let local_dest = dest_addr == place.local_addr();
        let mut inbox = self.cell.mailbox.lock().await;
        let agent_bytes = {
            let mut state = self.cell.state.lock();
            state.local_hop = local_dest;
            state.to_bytes()
        };
        let agent_bytes = match agent_bytes {
            Ok(bytes) => bytes,
            Err(error) => {
                self.cell.state.lock().local_hop = false;
                return Err(error.into());
            }
        };
        let units = place.units_for(&identity);
        if let Err(error) = place.send_agent(host, agent_bytes, units).await {
            self.cell.state.lock().local_hop = false;
            return Err(error.into());
        }
        inbox.queue.clear();
        if local_dest {
            info!(agent = my_id, host, entry, "hopped within the local host");
        } else {
            self.cell.state.lock().forwarding_addr = Some(dest_addr);
            info!(agent = my_id, host, dest = %dest_addr, entry, "hopped, staying as relay");
        }
        drop(inbox);
        Ok(())
    }

    /// Create a child agent running `unit` at `host`, with the next free
    /// child id. `None` when the agent is at capacity or the transfer could
    /// not be made.
    pub async fn spawn_child(&self, unit: &str, args: &[String], host: &str) -> Option<i32> {
        self.spawn_on(None, unit, args, host).await
    }

    /// Create a child agent under a caller-chosen id. `None` when the id is
    /// the root id, outside this agent's range, or already taken.
    pub async fn spawn_child_as(
        &self,
        child_id: i32,
        unit: &str,
        args: &[String],
        host: &str,
    ) -> Option<i32> {
        self.spawn_on(Some(child_id), unit, args, host).await
    }

    async fn spawn_on(
        &self,
        requested: Option<i32>,
        unit: &str,
        args: &[String],
        host: &str,
    ) -> Option<i32> {
        self.cell.gate.pass().await;
        let my_id = self.id();
        let identity = self.identity();
        if !self.cell.place.can_resolve(&identity, unit) {
            warn!(agent = my_id, unit, "spawn rejected, unit name resolves nowhere");
            return None;
        }
        let dest_addr = match self.cell.place.resolve_host(host).await {
            Ok(addr) => addr,
            Err(error) => {
                warn!(agent = my_id, host, %error, "spawn destination did not resolve");
                return None;
            }
        };
        let assigned = {
            let mut state = self.cell.state.lock();
            let id = match requested {
                Some(id) => state.accept_child_id(id),
                None => state.assign_child_id(),
            };
            id.map(|id| {
                state.child_ids.insert(id);
                let mut child = state.child(id, unit, args);
                child.directory.register(my_id, self.cell.mailbox.local_addr(), &[]);
                (id, child.to_bytes())
            })
        };
        let Some((child_id, encoded)) = assigned else {
            debug!(agent = my_id, ?requested, "no child slot granted");
            return None;
        };
        let bytes = match encoded {
            Ok(bytes) => bytes,
            Err(error) => {
                self.cell.state.lock().child_ids.remove(&child_id);
                warn!(agent = my_id, child = child_id, %error, "child state not serializable");
                return None;
            }
        };
        let units = self.cell.place.units_for(&identity);
        if let Err(error) = self.cell.place.send_agent(host, bytes, units).await {
            self.cell.state.lock().child_ids.remove(&child_id);
            warn!(agent = my_id, child = child_id, host, %error, "child transfer failed");
            return None;
        }
        self.cell.state.lock().directory.register(child_id, dest_addr, &[]);
        self.cell.children_changed.notify_waiters();
        info!(agent = my_id, child = child_id, unit, host, "child spawned");
        Some(child_id)
    }

    /// Accept an envelope delivered to this cell. Relays it when it names
    /// another recipient or when this cell is a zombie; handles notices
    /// inline; queues user envelopes after learning shortcuts from the
    /// routing trail. Returns whether the envelope was accepted or relayed
    /// with a delivered ack.
    pub(crate) async fn enqueue_message(&self, mut envelope: MessageEnvelope) -> bool {
        let my_id = self.id();
        if envelope.receiving_id != my_id {
            envelope.push_route(my_id, self.local_addr());
            return self.relay_onward(envelope).await;
        }
        let mut inbox = self.cell.mailbox.lock().await;
        let (forwarding, departed) = {
            let state = self.cell.state.lock();
            (state.forwarding_addr, state.local_hop)
        };
        if let Some(addr) = forwarding {
            drop(inbox);
            debug!(agent = my_id, dest = %addr, "relaying to forwarding address");
            return match self
                .cell
                .mailbox
                .send_message(addr, envelope.receiving_id, &envelope)
                .await
            {
                Ok(ack) => ack.is_delivered(),
                Err(error) => {
                    warn!(agent = my_id, dest = %addr, %error, "forwarding relay failed");
                    false
                }
            };
        }
        if departed {
            // Hopped within this host: the newer cell owns the identity and
            // the newest-first match finds it once admitted.
            drop(inbox);
            debug!(agent = my_id, "envelope refused by a cell that moved in place");
            return false;
        }
        if envelope.system {
            drop(inbox);
            return self.handle_notice(&envelope);
        }
        self.learn_from_trail(&envelope).await;
        inbox.queue.push_back(envelope);
        drop(inbox);
        self.cell.mailbox.notify_arrival();
        true
    }

    async fn relay_onward(&self, mut envelope: MessageEnvelope) -> bool {
        let target = envelope.receiving_id;
        let route = match self.route_to(target).await {
            Ok(route) => route,
            Err(error) => {
                warn!(agent = self.id(), target, %error, "no route to relay envelope");
                return false;
            }
        };
        envelope.receiving_addr = Some(route.addr);
        envelope.gateways = route.gateways.clone();
        match self.send_routed(&route, &envelope).await {
            Ok(ack) => ack.is_delivered(),
            Err(error) => {
                warn!(agent = self.id(), target, hop = route.hop_id, %error, "relay send failed");
                false
            }
        }
    }

    /// Walk the routing trail from the far end toward me, stop at the first
    /// peer already cached, and otherwise cache the first peer that answers
    /// a location exchange. Mutual: the peer learns my address in the same
    /// exchange.
    async fn learn_from_trail(&self, envelope: &MessageEnvelope) {
        let (enabled, my_id) = {
            let state = self.cell.state.lock();
            (state.cache_enabled, state.agent_id())
        };
        if !enabled || envelope.route_count() == 0 {
            return;
        }
        let mut peers: Vec<(i32, IpAddr)> = Vec::new();
        if let Some(addr) = envelope.sending_addr {
            peers.push((envelope.sending_id, addr));
        }
        peers.extend(envelope.trail.iter().map(|entry| (entry.id, entry.addr)));
        for (peer, peer_addr) in peers {
            if peer == my_id {
                continue;
            }
            let cached = self.cell.state.lock().directory.cache_holds(peer, peer_addr);
            if cached {
                break;
            }
            match self.cell.mailbox.share_location(peer_addr, peer, my_id, self.local_addr()).await
            {
                Ok(()) => {
                    self.cell.state.lock().directory.cache_put(peer, Some(peer_addr));
                    debug!(agent = my_id, peer, addr = %peer_addr, "shortcut learned from trail");
                    break;
                }
                Err(error) => {
                    debug!(agent = my_id, peer, %error, "trail peer unreachable, trying nearer hop");
                }
            }
        }
    }

    fn handle_notice(&self, envelope: &MessageEnvelope) -> bool {
        let Some(notice) = envelope.as_notice() else {
            warn!(agent = self.id(), subject = ?envelope.subject_tag(), "unrecognized notice dropped");
            return false;
        };
        let child = envelope.sending_id;
        {
            let mut state = self.cell.state.lock();
            match notice {
                SystemNotice::ChildStarting => {
                    state.alive_children += 1;
                    if let Some(addr) = envelope.sending_addr {
                        state.directory.register(child, addr, &[]);
                    }
                    info!(
                        agent = state.agent_id(),
                        child,
                        alive = state.alive_children,
                        "child running"
                    );
                }
                SystemNotice::ChildExiting => {
                    state.alive_children -= 1;
                    state.child_ids.remove(&child);
                    // A newer registration for the same id survives the
                    // removal; only the address the notice left from goes.
                    if let Some(addr) = envelope.sending_addr {
                        state.directory.remove_if_at(child, addr);
                    }
                    info!(
                        agent = state.agent_id(),
                        child,
                        alive = state.alive_children,
                        "child exited"
                    );
                }
            }
        }
        self.cell.children_changed.notify_waiters();
        true
    }

    /// Record a peer's announced location; wakes routing waits.
    pub(crate) fn register_peer(&self, peer: i32, addr: IpAddr, gateways: &[String]) {
        self.cell.state.lock().directory.register(peer, addr, gateways);
        self.cell.children_changed.notify_waiters();
        debug!(agent = self.id(), peer, %addr, "peer location registered");
    }

    /// Accept or retract an advisory cache entry for a peer.
    pub(crate) fn cache_peer(&self, peer: i32, addr: Option<IpAddr>) {
        self.cell.state.lock().directory.cache_put(peer, addr);
        match addr {
            Some(addr) => debug!(agent = self.id(), peer, %addr, "peer location cached"),
            None => debug!(agent = self.id(), peer, "peer location flushed from cache"),
        }
    }

    /// First notice of an arrival run: tell the parent this child runs here.
    pub(crate) async fn announce_started(&self) {
        let Some(parent) = self.parent_id() else {
            return;
        };
        let notice = MessageEnvelope::notice(SystemNotice::ChildStarting, self.id());
        if let Err(error) = self.dispatch(parent, notice).await {
            warn!(agent = self.id(), parent, %error, "start notice not delivered");
        }
    }

    /// Final notice of a run winding down at this place.
    pub(crate) async fn announce_exiting(&self) {
        let Some(parent) = self.parent_id() else {
            return;
        };
        let notice = MessageEnvelope::notice(SystemNotice::ChildExiting, self.id());
        if let Err(error) = self.dispatch(parent, notice).await {
            warn!(agent = self.id(), parent, %error, "exit notice not delivered");
        }
    }

    /// Block until every started child has reported its exit, or until the
    /// cell is cancelled.
    pub(crate) async fn wait_children(&self) {
        loop {
            let mut changed = pin!(self.cell.children_changed.notified());
            changed.as_mut().enable();
            if self.alive_children() <= 0 {
                return;
            }
            tokio::select! {
                _ = &mut changed => {}
                _ = self.cell.cancel.cancelled() => return,
            }
        }
    }
}

#[cfg(test)]
#[path = "agent_tests.rs"]
mod tests;
