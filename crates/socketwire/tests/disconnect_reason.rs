//! Tests for channel closing and disconnect reasons:
//! * Local close, sequential and concurrent
//! * Peer close packets and dropped transport
//! * Invalid packets
mod fixture;
mod utils;

use std::{
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use socketwire::{
    DisconnectReason, Engine, SendError, SocketError,
    extract::SocketRef,
    transport::memory::MemoryTransport,
};

use fixture::{client, disconnect_rx};
use utils::{assert_idle, timeout_rcv};

#[tokio::test]
pub async fn close_is_idempotent() {
    let engine = Engine::new();
    let mut rx = disconnect_rx(&engine);
    let (channel, peer) = client(&engine).await;

    channel.close();
    channel.close();
    assert!(!channel.is_alive());
    assert_eq!(timeout_rcv(&mut rx, 100).await, DisconnectReason::ClosedByUser);
    assert_idle(&mut rx, 50).await;

    assert_eq!(channel.disconnect_reason(), Some(DisconnectReason::ClosedByUser));
    tokio::time::timeout(Duration::from_millis(100), peer.closed())
        .await
        .expect("transport not closed");
    tokio::time::timeout(Duration::from_millis(100), channel.closed())
        .await
        .expect("channel not closed");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
pub async fn concurrent_close_calls_disconnect_once() {
    let engine = Engine::new();
    let calls = Arc::new(AtomicUsize::new(0));
    let calls_ = calls.clone();
    engine.on_disconnect(move || {
        calls_.fetch_add(1, Ordering::SeqCst);
    });
    let (channel, peer) = client(&engine).await;

    let tasks: Vec<_> = (0..8)
        .map(|_| {
            let channel = channel.clone();
            tokio::spawn(async move { channel.close() })
        })
        .collect();
    // the peer closing at the same time must not count twice either
    drop(peer);
    for task in tasks {
        assert_ok!(task.await);
    }

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
pub async fn emit_after_close_fails() {
    let engine = Engine::new();
    let (channel, _peer) = client(&engine).await;
    channel.close();

    let err = assert_err!(channel.emit("test", &1));
    assert!(matches!(err, SendError::Socket(SocketError::Closed)));
    assert_eq!(channel.buffered(), 0);
}

#[tokio::test]
pub async fn engine_io_close_packet() {
    let engine = Engine::new();
    let mut rx = disconnect_rx(&engine);
    let (_channel, peer) = client(&engine).await;

    assert_ok!(peer.send_text("1").await);
    assert_eq!(timeout_rcv(&mut rx, 100).await, DisconnectReason::TransportClose);
}

#[tokio::test]
pub async fn socket_io_disconnect_packet() {
    let engine = Engine::new();
    let mut rx = disconnect_rx(&engine);
    let (_channel, peer) = client(&engine).await;

    assert_ok!(peer.send_text("41").await);
    assert_eq!(timeout_rcv(&mut rx, 100).await, DisconnectReason::TransportClose);
}

#[tokio::test]
pub async fn dropped_peer() {
    let engine = Engine::new();
    let mut rx = disconnect_rx(&engine);
    let (channel, peer) = client(&engine).await;

    drop(peer);
    assert_eq!(timeout_rcv(&mut rx, 100).await, DisconnectReason::TransportClose);
    assert!(!channel.is_alive());
}

#[tokio::test]
pub async fn packet_parsing_error() {
    let engine = Engine::new();
    let mut rx = disconnect_rx(&engine);
    let (_channel, peer) = client(&engine).await;

    assert_ok!(peer.send_text("4x").await);
    assert_eq!(timeout_rcv(&mut rx, 100).await, DisconnectReason::PacketParsingError);
}

#[tokio::test]
pub async fn invalid_open_packet() {
    let engine = Engine::new();
    let mut rx = disconnect_rx(&engine);
    let (transport, peer) = MemoryTransport::pair();
    let channel = engine.connect(transport);

    assert_ok!(peer.send_text("0{\"sid\":42}").await);
    assert_eq!(timeout_rcv(&mut rx, 100).await, DisconnectReason::PacketParsingError);
    assert_eq!(channel.id(), "");
}

#[tokio::test]
pub async fn unexpected_binary_frame() {
    let engine = Engine::new();
    let mut rx = disconnect_rx(&engine);
    let (_channel, peer) = client(&engine).await;

    assert_ok!(peer.send_binary(vec![1, 2, 3]).await);
    assert_eq!(timeout_rcv(&mut rx, 100).await, DisconnectReason::PacketParsingError);
}

#[tokio::test]
pub async fn disconnect_handler_can_use_channel() {
    let engine = Engine::new();
    let (tx, mut rx) = tokio::sync::mpsc::channel(1);
    engine.on_disconnect(move |s: SocketRef, reason: DisconnectReason| {
        let alive = s.is_alive();
        let err = s.emit("bye", &()).is_err();
        tx.try_send((alive, err, reason)).unwrap();
    });
    let (channel, _peer) = client(&engine).await;

    channel.close();
    let (alive, err, reason) = timeout_rcv(&mut rx, 100).await;
    assert!(!alive);
    assert!(err);
    assert_eq!(reason, DisconnectReason::ClosedByUser);
}
