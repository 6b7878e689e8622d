//! Spawn and direct messaging specs
//!
//! A root agent spawns a child on a second place and reaches it through
//! the directory entry the spawn recorded, no relaying involved.

use crate::prelude::*;

const ROOT_HOST: &str = "127.0.1.20";
const CHILD_HOST: &str = "127.0.1.21";

/// Root unit: spawn one child on the second place, wait for its start
/// notice, then greet it.
struct Seed {
    trace: Trace,
}

#[async_trait]
impl Behavior for Seed {
    async fn entry(
        &self,
        agent: &AgentHandle,
        _entry: &str,
        _args: &[String],
    ) -> Result<(), EntryError> {
        let Some(child) = agent.spawn_child("greeter", &[], CHILD_HOST).await else {
            self.trace.push("spawn refused");
            return Ok(());
        };
        self.trace.push(format!("spawned child {child}"));
        while agent.alive_children() < 1 {
            sleep(Duration::from_millis(10)).await;
        }
        let ack = agent.talk(child, MessageEnvelope::subject("ping")).await?;
        self.trace.push(format!("talk to {child}: {ack:?}"));
        Ok(())
    }
}

/// Child unit: log every envelope with where it arrived and how it got
/// there.
struct Greeter {
    trace: Trace,
}

#[async_trait]
impl Behavior for Greeter {
    async fn entry(
        &self,
        agent: &AgentHandle,
        _entry: &str,
        _args: &[String],
    ) -> Result<(), EntryError> {
        while let Some(envelope) = agent.recv().await {
            let subject = envelope.subject_tag().unwrap_or("?").to_string();
            self.trace.push(format!(
                "{} at {} got {subject} gateways={} relays={}",
                agent.id(),
                agent.local_addr(),
                envelope.gateways.len(),
                envelope.route_count(),
            ));
        }
        Ok(())
    }
}

fn seed_registry(trace: &Trace) -> UnitRegistry {
    let mut registry = UnitRegistry::with_builtins();
    let seed_trace = trace.clone();
    registry.register("seed", move || Arc::new(Seed { trace: seed_trace.clone() }));
    let greeter_trace = trace.clone();
    registry.register("greeter", move || Arc::new(Greeter { trace: greeter_trace.clone() }));
    registry
}

#[tokio::test]
async fn a_spawned_child_gets_messages_through_the_parent_directory() {
    let port = free_port();
    let trace = Trace::new();

    let place_root = start_place(ROOT_HOST, scenario_config(port), seed_registry(&trace)).await;
    let place_child = start_place(CHILD_HOST, scenario_config(port), seed_registry(&trace)).await;

    let mut control = Control::connect(ROOT_HOST, port).await;
    control.send(&transfer_request(&root_state("seed", 4))).await;

    wait_until("the child to report the greeting", || {
        trace.contains(&format!("1 at {CHILD_HOST} got ping gateways=0 relays=0"))
    })
    .await;
    assert!(trace.contains("spawned child 1"), "first child under the root takes id 1");
    wait_until("the delivery ack to come back to the root", || {
        trace.contains("talk to 1: Delivered")
    })
    .await;

    assert_eq!(place_root.resident_count(), 1, "the root is the only resident at its place");
    assert_eq!(place_child.resident_count(), 1, "the child settled at the second place");
}
