// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::sync::Arc;
use std::time::Duration;

#[tokio::test]
async fn open_gate_passes_immediately() {
    let gate = SuspendGate::new();
    assert!(!gate.is_suspended());
    gate.pass().await;
}

#[tokio::test]
async fn suspended_gate_blocks_until_resume() {
    let gate = Arc::new(SuspendGate::new());
    assert!(gate.suspend());

    let waiter = {
        let gate = Arc::clone(&gate);
        tokio::spawn(async move {
            gate.pass().await;
        })
    };

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(!waiter.is_finished(), "pass returned through a closed gate");

    assert!(gate.resume());
    tokio::time::timeout(Duration::from_secs(1), waiter)
        .await
        .expect("waiter not released by resume")
        .expect("waiter panicked");
}

#[tokio::test]
async fn repeated_transitions_report_prior_state() {
    let gate = SuspendGate::new();
    assert!(gate.suspend());
    assert!(!gate.suspend());
    assert!(gate.resume());
    assert!(!gate.resume());
}

#[tokio::test]
async fn resume_releases_multiple_waiters() {
    let gate = Arc::new(SuspendGate::new());
    gate.suspend();

    let waiters: Vec<_> = (0..3)
        .map(|_| {
            let gate = Arc::clone(&gate);
            tokio::spawn(async move { gate.pass().await })
        })
        .collect();

    tokio::time::sleep(Duration::from_millis(20)).await;
    gate.resume();

    for waiter in waiters {
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("waiter not released")
            .expect("waiter panicked");
    }
}
