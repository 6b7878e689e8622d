//! Gateway hop specs
//!
//! A destination that fails the direct probe is reached by wrapping the
//! trip through the configured gateway. The agent still lands at the true
//! destination and arrives with its itinerary consumed.

use crate::prelude::*;

const ORIGIN_HOST: &str = "127.0.3.20";
const GATEWAY_HOST: &str = "127.0.3.21";
/// Documentation-range address: a direct connect to it never answers.
const FAR_HOST: &str = "203.0.113.40";

/// Unit that sets out for the far host on arrival at the origin, and
/// reports where it ended up.
struct Pilgrim {
    trace: Trace,
}

#[async_trait]
impl Behavior for Pilgrim {
    async fn entry(
        &self,
        agent: &AgentHandle,
        entry: &str,
        args: &[String],
    ) -> Result<(), EntryError> {
        let here = agent.local_addr().to_string();
        if here == ORIGIN_HOST {
            self.trace.push(format!("departing for {FAR_HOST}"));
            agent.hop(FAR_HOST, "deliver", &["relic".to_string()]).await?;
            return Ok(());
        }
        self.trace.push(format!("{entry} at {here} carrying {args:?}"));
        while agent.recv().await.is_some() {}
        Ok(())
    }
}

fn pilgrim_registry(trace: &Trace) -> UnitRegistry {
    let mut registry = UnitRegistry::with_builtins();
    let pilgrim_trace = trace.clone();
    registry.register("pilgrim", move || Arc::new(Pilgrim { trace: pilgrim_trace.clone() }));
    registry
}

#[tokio::test]
async fn an_unreachable_destination_is_reached_through_the_gateway() {
    let port = free_port();
    let trace = Trace::new();

    // The far place believes it is 203.0.113.40; only the gateway's tunnel
    // entry knows where it actually accepts.
    let (place_far, far_port) =
        start_masked_place(FAR_HOST, scenario_config(port), pilgrim_registry(&trace)).await;

    let mut gateway_config = scenario_config(port);
    gateway_config.tunnels.insert(FAR_HOST.to_string(), far_port);
    let place_gateway =
        start_place(GATEWAY_HOST, gateway_config, pilgrim_registry(&trace)).await;

    let mut origin_config = scenario_config(port);
    origin_config.gateway = Some(GATEWAY_HOST.to_string());
    let place_origin = start_place(ORIGIN_HOST, origin_config, pilgrim_registry(&trace)).await;

    let mut control = Control::connect(ORIGIN_HOST, port).await;
    control.send(&transfer_request(&root_state("pilgrim", 4))).await;

    wait_until("the pilgrim to arrive behind the gateway", || {
        trace.contains(r#"deliver at 203.0.113.40 carrying ["relic"]"#)
    })
    .await;
    assert!(trace.contains("departing for 203.0.113.40"));
    assert_eq!(place_far.resident_count(), 1, "the true destination hosts the agent");
    wait_until("the gateway to keep only a relay record of the pass-through", || {
        place_gateway.status().first().is_some_and(|cell| cell.phase.label() == "zombie")
    })
    .await;
    wait_until("the origin to keep only a relay record", || {
        place_origin.status().first().is_some_and(|cell| cell.phase.label() == "zombie")
    })
    .await;
}
