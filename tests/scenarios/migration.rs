//! Migration and forwarding specs
//!
//! An agent that moved on leaves a relay record behind: traffic sent to
//! its old place is forwarded to the new one and acked end to end, and
//! nothing queues at the old place.

use crate::prelude::*;

const OLD_HOST: &str = "127.0.2.20";
const NEW_HOST: &str = "127.0.2.21";

/// Unit that moves away from its first place on arrival, then settles and
/// logs whatever reaches it.
struct Traveler {
    trace: Trace,
}

#[async_trait]
impl Behavior for Traveler {
    async fn entry(
        &self,
        agent: &AgentHandle,
        _entry: &str,
        _args: &[String],
    ) -> Result<(), EntryError> {
        let here = agent.local_addr().to_string();
        if here == OLD_HOST {
            self.trace.push(format!("leaving {here}"));
            agent.hop(NEW_HOST, "init", &[]).await?;
            return Ok(());
        }
        self.trace.push(format!("settled at {here}"));
        while let Some(envelope) = agent.recv().await {
            let subject = envelope.subject_tag().unwrap_or("?").to_string();
            self.trace.push(format!("got {subject} at {here}"));
        }
        Ok(())
    }
}

fn traveler_registry(trace: &Trace) -> UnitRegistry {
    let mut registry = UnitRegistry::with_builtins();
    let traveler_trace = trace.clone();
    registry.register("traveler", move || Arc::new(Traveler { trace: traveler_trace.clone() }));
    registry
}

#[tokio::test]
async fn a_message_to_the_old_place_is_relayed_to_the_new_one() {
    let port = free_port();
    let trace = Trace::new();

    let place_old = start_place(OLD_HOST, scenario_config(port), traveler_registry(&trace)).await;
    let place_new = start_place(NEW_HOST, scenario_config(port), traveler_registry(&trace)).await;

    let mut control = Control::connect(OLD_HOST, port).await;
    control.send(&transfer_request(&root_state("traveler", 4))).await;
    wait_until("the traveler to settle at the new place", || {
        trace.contains(&format!("settled at {NEW_HOST}"))
    })
    .await;

    // Sent to the place the agent already left. The relay record forwards
    // and the ack walks back along the same exchange.
    let ack = control.exchange(&message_request(&user_envelope(7, 0, "follow"))).await;
    assert_eq!(ack, Ack::Delivered, "the forwarded delivery acks end to end");
    wait_until("the forwarded envelope to surface at the new place", || {
        trace.contains(&format!("got follow at {NEW_HOST}"))
    })
    .await;

    assert_eq!(place_old.resident_count(), 1, "only the relay record stays behind");
    wait_until("the old cell to settle into its relay phase", || {
        place_old.status().first().is_some_and(|cell| cell.phase.label() == "zombie")
    })
    .await;
    assert_eq!(place_new.resident_count(), 1, "the traveler lives at the new place");
}
