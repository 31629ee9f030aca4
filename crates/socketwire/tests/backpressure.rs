//! Tests for the outbound queue limits and the backpressure tracker
mod fixture;
mod utils;

use std::time::Duration;

use socketwire::{
    DisconnectReason, Engine, SendError, SocketError, transport::memory::MemoryTransport,
};

use fixture::disconnect_rx;
use utils::timeout_rcv;

#[tokio::test]
pub async fn overflow_closes_channel() {
    let engine = Engine::builder().max_buffer_size(5).build();
    let mut rx = disconnect_rx(&engine);
    // the peer never reads and its side buffers a single frame
    let (transport, _peer) = MemoryTransport::pair_with_capacity(1);
    let channel = engine.connect(transport);

    for i in 0..5 {
        assert_ok!(channel.emit("flood", &i));
    }
    let err = assert_err!(channel.emit("flood", &5));
    assert!(matches!(err, SendError::Socket(SocketError::InternalChannelFull)));

    assert_eq!(timeout_rcv(&mut rx, 200).await, DisconnectReason::Overflow);
    assert_eq!(channel.disconnect_reason(), Some(DisconnectReason::Overflow));
    assert_eq!(channel.buffered(), 0);
    assert_eq!(engine.overflooded_count(), 0);
}

#[tokio::test]
pub async fn high_band_is_tracked_then_cleared() {
    let engine = Engine::builder().max_buffer_size(10).build();
    let (transport, mut peer) = MemoryTransport::pair_with_capacity(1);
    let channel = engine.connect(transport);

    for i in 0..8 {
        assert_ok!(channel.emit("slow", &i));
    }
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(engine.tracker().contains(&channel.local_id()));
    assert_eq!(engine.overflooded_count(), 1);

    for i in 0..8 {
        let frame = assert_some!(peer.recv_text().await);
        assert_eq!(frame, format!(r#"42["slow",{i}]"#));
    }
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(!engine.tracker().contains(&channel.local_id()));
    assert!(engine.tracker().is_empty());
    assert!(channel.is_alive());
}

#[tokio::test]
pub async fn closed_channel_leaves_tracker() {
    let engine = Engine::builder().max_buffer_size(10).build();
    let (transport, _peer) = MemoryTransport::pair_with_capacity(1);
    let channel = engine.connect(transport);

    for i in 0..8 {
        assert_ok!(channel.emit("slow", &i));
    }
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(engine.overflooded_count(), 1);

    channel.close();
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(engine.overflooded_count(), 0);
}

#[tokio::test]
pub async fn engines_have_separate_trackers() {
    let slow = Engine::builder().max_buffer_size(10).build();
    let other = Engine::new();
    let (transport, _peer) = MemoryTransport::pair_with_capacity(1);
    let channel = slow.connect(transport);

    for i in 0..8 {
        assert_ok!(channel.emit("slow", &i));
    }
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(slow.overflooded_count(), 1);
    assert_eq!(other.overflooded_count(), 0);
}
