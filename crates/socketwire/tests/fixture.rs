#![allow(dead_code)]

use std::{sync::Arc, time::Duration};

use socketwire::{
    Channel, DisconnectReason, Engine, OpenHeader, RemoteInfo,
    extract::SocketRef,
    transport::{
        Frame,
        memory::{MemoryPeer, MemoryTransport},
    },
};
use tokio::sync::mpsc;

pub const OPEN_PACKET: &str =
    r#"0{"sid":"abc","upgrades":[],"pingInterval":25000,"pingTimeout":20000}"#;

/// A client channel whose peer already sent its open packet.
pub async fn client(engine: &Engine) -> (Arc<Channel>, MemoryPeer) {
    let (transport, peer) = MemoryTransport::pair();
    let channel = engine.connect(transport);
    peer.send_text(OPEN_PACKET).await.unwrap();
    (channel, peer)
}

/// A server channel whose open packet was already read by the peer.
pub async fn server(engine: &Engine) -> (Arc<Channel>, MemoryPeer, OpenHeader) {
    let (transport, mut peer) = MemoryTransport::pair();
    let channel = engine.accept(transport, RemoteInfo::default()).unwrap();
    let open = peer.recv_text().await.unwrap();
    let header: OpenHeader = serde_json::from_str(open.strip_prefix('0').unwrap()).unwrap();
    (channel, peer, header)
}

/// Forwards every disconnect reason of `engine` to the returned receiver.
pub fn disconnect_rx(engine: &Engine) -> mpsc::Receiver<DisconnectReason> {
    let (tx, rx) = mpsc::channel(8);
    engine.on_disconnect(move |_: SocketRef, reason: DisconnectReason| {
        tx.try_send(reason).unwrap();
    });
    rx
}

/// Receives the next text frame, skipping heartbeats.
pub async fn next_text(peer: &mut MemoryPeer) -> String {
    loop {
        let frame = tokio::time::timeout(Duration::from_millis(500), peer.recv())
            .await
            .expect("no frame received in time")
            .expect("transport dropped");
        match frame {
            Frame::Text(text) if text == "2" || text == "3" => continue,
            Frame::Text(text) => return text,
            Frame::Binary(bin) => panic!("unexpected binary frame {bin:?}"),
        }
    }
}

/// Receives the next frame, which must be binary.
pub async fn next_binary(peer: &mut MemoryPeer) -> Vec<u8> {
    let frame = tokio::time::timeout(Duration::from_millis(500), peer.recv())
        .await
        .expect("no frame received in time")
        .expect("transport dropped");
    match frame {
        Frame::Binary(bin) => bin.to_vec(),
        Frame::Text(text) => panic!("unexpected text frame {text}"),
    }
}
