//! A websocket echo server.
//!
//! Run it with `cargo run --example echo_server` and connect any socket.io
//! client to `ws://127.0.0.1:3000/socket.io/?EIO=4&transport=websocket`.
use serde_json::Value;
use socketwire::{
    DisconnectReason, Engine,
    extract::{AckSender, Bin, Data, SocketRef},
    transport::ws,
};
use tokio::net::TcpListener;
use tracing::{Level, info};
use tracing_subscriber::FmtSubscriber;

fn on_connect(socket: SocketRef) {
    info!(id = socket.id(), "connected");
    socket.emit("welcome", &socket.id()).ok();
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let subscriber = FmtSubscriber::builder()
        .with_line_number(true)
        .with_max_level(Level::TRACE)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let engine = Engine::new();
    engine.on_connect(on_connect);
    engine.on_disconnect(|s: SocketRef, reason: DisconnectReason| {
        info!(id = s.id(), %reason, "disconnected");
    });
    engine.on("message", |s: SocketRef, Data::<Value>(data)| {
        info!(?data, "received event");
        s.emit("message-back", &data).ok();
    })?;
    // keep this handler async to exercise async handlers
    engine.on(
        "message-with-ack",
        |Data::<Value>(data), ack: AckSender| async move {
            ack.send(&data).ok();
        },
    )?;
    engine.on(
        "binary",
        |s: SocketRef, Data::<Value>(data), Bin(bin): Bin| {
            s.emit_binary("binary-back", &data, bin).ok();
        },
    )?;

    let listener = TcpListener::bind("127.0.0.1:3000").await?;
    info!("listening on {}", listener.local_addr()?);
    loop {
        let (stream, _) = listener.accept().await?;
        let engine = engine.clone();
        tokio::spawn(async move {
            match ws::accept(stream, Default::default()).await {
                Ok((transport, remote)) => {
                    if let Err(e) = engine.accept(transport, remote) {
                        tracing::warn!("cannot start session: {e}");
                    }
                }
                Err(e) => tracing::warn!("websocket handshake failed: {e}"),
            }
        });
    }
}
