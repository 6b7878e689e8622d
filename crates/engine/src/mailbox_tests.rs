// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use roam_wire::{write_ack, WireFunction};
use std::collections::HashMap;
use std::time::Duration;
use tokio::net::TcpListener;

fn local_ip() -> IpAddr {
    IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1))
}

async fn listener_mailbox() -> (Mailbox, TcpListener) {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let port = listener.local_addr().expect("addr").port();
    let pool = WirePool::new(port, HashMap::new(), Duration::from_secs(2));
    (Mailbox::new(pool, local_ip()), listener)
}

#[tokio::test]
async fn recv_returns_pushed_envelopes_in_order() {
    let (mailbox, _listener) = listener_mailbox().await;
    {
        let mut inbox = mailbox.lock().await;
        inbox.queue.push_back(MessageEnvelope::subject("first"));
        inbox.queue.push_back(MessageEnvelope::subject("second"));
    }
    mailbox.notify_arrival();

    let first = mailbox.recv().await.expect("first envelope");
    let second = mailbox.recv().await.expect("second envelope");
    assert_eq!(first.subject_tag(), Some("first"));
    assert_eq!(second.subject_tag(), Some("second"));
    assert_eq!(mailbox.pending().await, 0);
}

#[tokio::test]
async fn recv_blocks_until_an_arrival() {
    let (mailbox, _listener) = listener_mailbox().await;
    let mailbox = std::sync::Arc::new(mailbox);

    let receiver = {
        let mailbox = std::sync::Arc::clone(&mailbox);
        tokio::spawn(async move { mailbox.recv().await })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(!receiver.is_finished(), "recv returned on an empty inbox");

    mailbox.lock().await.queue.push_back(MessageEnvelope::subject("late"));
    mailbox.notify_arrival();

    let envelope = tokio::time::timeout(Duration::from_secs(1), receiver)
        .await
        .expect("recv not woken")
        .expect("recv task panicked")
        .expect("envelope");
    assert_eq!(envelope.subject_tag(), Some("late"));
}

#[tokio::test]
async fn wake_returns_none_once_then_resets() {
    let (mailbox, _listener) = listener_mailbox().await;
    mailbox.wake_receiver().await;
    assert!(mailbox.recv().await.is_none());

    // The signal is consumed; a queued envelope is delivered normally.
    mailbox.lock().await.queue.push_back(MessageEnvelope::subject("after"));
    mailbox.notify_arrival();
    assert!(mailbox.recv().await.is_some());
}

#[tokio::test]
async fn queued_envelopes_win_over_a_pending_wake() {
    let (mailbox, _listener) = listener_mailbox().await;
    mailbox.lock().await.queue.push_back(MessageEnvelope::subject("queued"));
    mailbox.wake_receiver().await;

    // Drain order: envelope first, then the one-shot None.
    assert!(mailbox.recv().await.is_some());
    assert!(mailbox.recv().await.is_none());
}

#[tokio::test]
async fn user_message_waits_for_the_ack() {
    let (mailbox, listener) = listener_mailbox().await;

    let server = tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.expect("accept");
        let request = WireRequest::read_from(&mut stream).await.expect("request");
        assert_eq!(request.function(), WireFunction::EnqueueMessage);
        let WireRequest::EnqueueMessage { receiver_id, envelope } = request else {
            panic!("wrong request variant");
        };
        assert_eq!(receiver_id, 7);
        let envelope = roam_wire::decode_envelope(&envelope).expect("envelope");
        assert_eq!(envelope.subject_tag(), Some("ping"));
        write_ack(&mut stream, Ack::Delivered).await.expect("ack");
    });

    let envelope = MessageEnvelope::subject("ping");
    let ack = mailbox
        .send_message(local_ip(), 7, &envelope)
        .await
        .expect("send");
    assert_eq!(ack, Ack::Delivered);
    server.await.expect("server");
}

#[tokio::test]
async fn system_notice_skips_the_ack() {
    let (mailbox, listener) = listener_mailbox().await;

    let server = tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.expect("accept");
        let request = WireRequest::read_from(&mut stream).await.expect("request");
        assert!(matches!(request, WireRequest::EnqueueMessage { .. }));
        // Deliberately write nothing back.
    });

    let envelope = roam_core::MessageEnvelope::notice(roam_core::SystemNotice::ChildStarting, 3);
    let ack = mailbox
        .send_message(local_ip(), 0, &envelope)
        .await
        .expect("send");
    assert_eq!(ack, Ack::Delivered);
    server.await.expect("server");
}

#[tokio::test]
async fn gateway_send_targets_the_last_gateway() {
    // The listener plays the gateway; the "destination" is a dead address
    // the request must not touch directly.
    let (mailbox, listener) = listener_mailbox().await;
    let gateway_host = "127.0.0.1".to_string();
    let dest = IpAddr::V4(Ipv4Addr::new(203, 0, 113, 9));

    let server = tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.expect("accept");
        let request = WireRequest::read_from(&mut stream).await.expect("request");
        let WireRequest::EnqueueMessageGateway {
            gateways,
            dest_host,
            gateway_pos,
            receiver_id,
            ..
        } = request
        else {
            panic!("wrong request variant");
        };
        assert_eq!(gateways, vec!["dead-first".to_string(), "127.0.0.1".to_string()]);
        assert_eq!(dest_host, "203.0.113.9");
        assert_eq!(gateway_pos, 1);
        assert_eq!(receiver_id, 4);
        write_ack(&mut stream, Ack::Delivered).await.expect("ack");
    });

    let chain = vec!["dead-first".to_string(), gateway_host];
    let ack = mailbox
        .send_message_via(&chain, dest, 4, &MessageEnvelope::subject("via"))
        .await
        .expect("send");
    assert_eq!(ack, Ack::Delivered);
    server.await.expect("server");
}

#[tokio::test]
async fn registration_carries_the_return_chain() {
    let (mailbox, listener) = listener_mailbox().await;

    let server = tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.expect("accept");
        let request = WireRequest::read_from(&mut stream).await.expect("request");
        let WireRequest::RegisterAgentIp { sender_id, sender_addr, receiver_id, gateways } =
            request
        else {
            panic!("wrong request variant");
        };
        assert_eq!(sender_id, 5);
        assert_eq!(sender_addr, Ipv4Addr::new(10, 1, 2, 3));
        assert_eq!(receiver_id, 1);
        assert!(gateways.is_empty());
    });

    mailbox
        .register_location(local_ip(), 1, 5, IpAddr::V4(Ipv4Addr::new(10, 1, 2, 3)), &[])
        .await
        .expect("register");
    server.await.expect("server");
}

#[tokio::test]
async fn cache_push_and_flush_set_the_flag() {
    let (mailbox, listener) = listener_mailbox().await;

    let server = tokio::spawn(async move {
        // One connection serves both exchanges: the pool keeps the stream
        // alive between them as long as this side does not close it.
        let (mut stream, _) = listener.accept().await.expect("accept");
        for expect_flush in [false, true] {
            let request = WireRequest::read_from(&mut stream).await.expect("request");
            let WireRequest::CacheAgentIp { flush, sender_id, .. } = request else {
                panic!("wrong request variant");
            };
            assert_eq!(flush, expect_flush);
            assert_eq!(sender_id, 2);
        }
    });

    mailbox
        .share_location(local_ip(), 9, 2, local_ip())
        .await
        .expect("share");
    mailbox.flush_location(local_ip(), 9, 2).await.expect("flush");
    server.await.expect("server");
}

#[tokio::test]
async fn ipv6_sender_is_rejected_before_the_wire() {
    let (mailbox, _listener) = listener_mailbox().await;
    let v6 = IpAddr::V6(std::net::Ipv6Addr::LOCALHOST);
    let err = mailbox
        .register_location(local_ip(), 1, 5, v6, &[])
        .await
        .expect_err("v6 addresses do not fit the wire format");
    assert!(matches!(err, WireError::NotIpv4(_)));
}
