//! Child bookkeeping specs
//!
//! Lifecycle notices drive a parent's alive counter and directory: starts
//! raise the counter and record addresses, exits lower it and remove only
//! the address they left from, so a newer registration for the same id
//! survives a stale exit notice.

use crate::prelude::*;

const PARENT_HOST: &str = "127.0.4.20";
const SETTLED_HOST: &str = "127.0.4.21";

/// Root unit that logs its alive counter as it moves and probes a peer
/// whenever a `probe <id>` envelope tells it to.
struct Keeper {
    trace: Trace,
}

#[async_trait]
impl Behavior for Keeper {
    async fn entry(
        &self,
        agent: &AgentHandle,
        _entry: &str,
        _args: &[String],
    ) -> Result<(), EntryError> {
        let mut alive = agent.alive_children();
        self.trace.push(format!("alive {alive}"));
        loop {
            tokio::select! {
                envelope = agent.recv() => {
                    let Some(envelope) = envelope else { continue };
                    let command = envelope
                        .subject_tag()
                        .and_then(|subject| subject.strip_prefix("probe "))
                        .and_then(|rest| rest.parse::<i32>().ok());
                    if let Some(target) = command {
                        match agent.talk(target, MessageEnvelope::subject("hello")).await {
                            Ok(ack) => self.trace.push(format!("probe {target}: {ack:?}")),
                            Err(error) => self.trace.push(format!("probe {target}: {error}")),
                        }
                    }
                }
                _ = sleep(Duration::from_millis(10)) => {
                    let now = agent.alive_children();
                    if now != alive {
                        alive = now;
                        self.trace.push(format!("alive {alive}"));
                    }
                }
            }
        }
    }
}

/// A settled lineage member that logs what reaches it.
struct Settled {
    trace: Trace,
}

#[async_trait]
impl Behavior for Settled {
    async fn entry(
        &self,
        agent: &AgentHandle,
        _entry: &str,
        _args: &[String],
    ) -> Result<(), EntryError> {
        while let Some(envelope) = agent.recv().await {
            let subject = envelope.subject_tag().unwrap_or("?").to_string();
            self.trace.push(format!("{} received {subject}", agent.id()));
        }
        Ok(())
    }
}

fn lineage_registry(trace: &Trace) -> UnitRegistry {
    let mut registry = UnitRegistry::with_builtins();
    let keeper_trace = trace.clone();
    registry.register("keeper", move || Arc::new(Keeper { trace: keeper_trace.clone() }));
    let settled_trace = trace.clone();
    registry.register("settled", move || Arc::new(Settled { trace: settled_trace.clone() }));
    registry
}

#[tokio::test]
async fn exits_clear_the_counter_but_spare_newer_registrations() {
    let port = free_port();
    let trace = Trace::new();

    let place_parent =
        start_place(PARENT_HOST, scenario_config(port), lineage_registry(&trace)).await;
    let place_settled =
        start_place(SETTLED_HOST, scenario_config(port), lineage_registry(&trace)).await;

    let mut control = Control::connect(PARENT_HOST, port).await;
    control.send(&transfer_request(&root_state("keeper", 4))).await;
    wait_until("the keeper baseline count", || trace.contains("alive 0")).await;

    // Two lineage members report in from elsewhere.
    let start_5 = notice_envelope(SystemNotice::ChildStarting, 5, "127.0.4.50", 0);
    let start_9 = notice_envelope(SystemNotice::ChildStarting, 9, "127.0.4.90", 0);
    control.send(&message_request(&start_5)).await;
    control.send(&message_request(&start_9)).await;
    wait_until("both starts to be counted", || trace.contains("alive 2")).await;

    // Agent 9 settles at a real place and registers its new address.
    let mut settle = Control::connect(SETTLED_HOST, port).await;
    settle.send(&transfer_request(&resident_state(9, "settled"))).await;
    wait_until("agent 9 to be resident", || place_settled.resident_count() == 1).await;
    control
        .send(&WireRequest::RegisterAgentIp {
            sender_id: 9,
            sender_addr: "127.0.4.21".parse().unwrap(),
            receiver_id: 0,
            gateways: Vec::new(),
        })
        .await;
    let ack = control.exchange(&message_request(&user_envelope(99, 0, "probe 9"))).await;
    assert_eq!(ack, Ack::Delivered);
    wait_until("the probe to reach agent 9 at its new address", || {
        trace.contains("9 received hello")
    })
    .await;

    // Both exit. Agent 9's notice still names the address it started
    // from, not the one it re-registered since.
    let exit_5 = notice_envelope(SystemNotice::ChildExiting, 5, "127.0.4.50", 0);
    let exit_9 = notice_envelope(SystemNotice::ChildExiting, 9, "127.0.4.90", 0);
    control.send(&message_request(&exit_5)).await;
    control.send(&message_request(&exit_9)).await;
    wait_until("both exits to be counted", || trace.count("alive 0") == 2).await;

    let ack = control.exchange(&message_request(&user_envelope(99, 0, "probe 5"))).await;
    assert_eq!(ack, Ack::Delivered);
    wait_until("the probe toward 5 to come up empty", || {
        trace.contains("probe 5: no address recorded for relay agent 1 toward agent 5")
    })
    .await;

    let ack = control.exchange(&message_request(&user_envelope(99, 0, "probe 9"))).await;
    assert_eq!(ack, Ack::Delivered);
    wait_until("the probe to reach agent 9 once more", || {
        trace.count("9 received hello") == 2
    })
    .await;
    assert_eq!(place_parent.resident_count(), 1, "the keeper alone remains with the parent");
}
