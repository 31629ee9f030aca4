//! End to end tests over real websockets, both sides running socketwire
mod utils;

use std::net::SocketAddr;

use socketwire::{
    DisconnectReason, Engine, ProtocolVersion,
    extract::{Data, SocketRef},
    transport::ws::{self, WsConfig, get_url},
};
use tokio::{net::TcpListener, sync::mpsc};

use utils::{init_tracing, timeout_rcv};

/// Spawns a server engine on a random port.
async fn spawn_server(engine: Engine) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        loop {
            let (stream, _) = listener.accept().await.unwrap();
            let engine = engine.clone();
            tokio::spawn(async move {
                let (transport, remote) = ws::accept(stream, WsConfig::default()).await.unwrap();
                engine.accept(transport, remote).unwrap();
            });
        }
    });
    addr
}

#[tokio::test]
pub async fn echo_over_websocket() {
    init_tracing();
    let server = Engine::new();
    let (remote_tx, mut remote_rx) = mpsc::channel::<(bool, bool)>(1);
    server.on_connect(move |s: SocketRef| {
        let remote = s.remote();
        let has_header = remote.headers.contains_key("sec-websocket-key");
        remote_tx.try_send((remote.addr.is_some(), has_header)).unwrap();
    });
    server
        .on("echo", |s: SocketRef, Data(data): Data<Vec<u32>>| {
            s.emit("echo-reply", &data).unwrap();
        })
        .unwrap();
    let addr = spawn_server(server).await;

    let client = Engine::new();
    let (tx, mut rx) = mpsc::channel::<Vec<u32>>(1);
    client.on_connect(|s: SocketRef| s.emit("echo", &"[1,2,3]").unwrap());
    client
        .on("echo-reply", move |Data(data): Data<Vec<u32>>| tx.try_send(data).unwrap())
        .unwrap();

    let url = get_url("127.0.0.1", addr.port(), false, ProtocolVersion::V4);
    let channel = assert_ok!(client.dial(&url).await);

    assert_eq!(timeout_rcv(&mut rx, 1000).await, [1, 2, 3]);
    assert_eq!(timeout_rcv(&mut remote_rx, 1000).await, (true, true));
    assert_eq!(channel.id().len(), 16);
}

#[tokio::test]
pub async fn ack_over_websocket() {
    init_tracing();
    let server = Engine::new();
    server
        .on("double", |Data(n): Data<i64>, ack: socketwire::extract::AckSender| {
            ack.send(&(n * 2)).unwrap();
        })
        .unwrap();
    let addr = spawn_server(server).await;

    let client = Engine::new();
    let url = get_url("127.0.0.1", addr.port(), false, ProtocolVersion::V4);
    let channel = assert_ok!(client.dial(&url).await);

    let doubled: i64 = assert_ok!(channel.emit_with_ack("double", &21).await);
    assert_eq!(doubled, 42);
}

#[tokio::test]
pub async fn client_close_reaches_server() {
    init_tracing();
    let server = Engine::new();
    let (tx, mut rx) = mpsc::channel::<DisconnectReason>(1);
    server.on_disconnect(move |reason: DisconnectReason| tx.try_send(reason).unwrap());
    let (connected_tx, mut connected_rx) = mpsc::channel::<()>(1);
    server.on_connect(move || connected_tx.try_send(()).unwrap());
    let addr = spawn_server(server).await;

    let client = Engine::new();
    let url = get_url("127.0.0.1", addr.port(), false, ProtocolVersion::V4);
    let channel = assert_ok!(client.dial(&url).await);
    timeout_rcv(&mut connected_rx, 1000).await;

    channel.close();
    assert_eq!(timeout_rcv(&mut rx, 1000).await, DisconnectReason::TransportClose);
}

#[tokio::test]
pub async fn dial_refused() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let url = get_url("127.0.0.1", port, false, ProtocolVersion::V4);
    assert_err!(Engine::new().dial(&url).await);
}
