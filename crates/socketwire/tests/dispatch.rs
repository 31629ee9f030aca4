//! Tests for event dispatch: echo, ordering, dropped events and panicking handlers
mod fixture;
mod utils;

use std::time::Duration;

use socketwire::{
    DisconnectReason, Engine,
    extract::{Data, Event, SocketRef, TryData},
};
use tokio::sync::mpsc;

use fixture::{client, disconnect_rx, next_text};
use utils::{assert_idle, timeout_rcv};

fn echo_engine() -> Engine {
    let engine = Engine::new();
    engine
        .on("echo", |s: SocketRef, Data(data): Data<Vec<u32>>| {
            s.emit("echo-reply", &data).unwrap();
        })
        .unwrap();
    engine
}

#[tokio::test]
pub async fn echo_stringified_args() {
    let engine = echo_engine();
    let (_channel, mut peer) = client(&engine).await;

    assert_ok!(peer.send_text(r#"42["echo","[1,2,3]"]"#).await);
    assert_eq!(next_text(&mut peer).await, r#"42["echo-reply",[1,2,3]]"#);
}

#[tokio::test]
pub async fn echo_plain_args() {
    let engine = echo_engine();
    let (_channel, mut peer) = client(&engine).await;

    assert_ok!(peer.send_text(r#"42["echo",[4,5]]"#).await);
    assert_eq!(next_text(&mut peer).await, r#"42["echo-reply",[4,5]]"#);
}

#[tokio::test]
pub async fn handlers_run_in_arrival_order() {
    let engine = Engine::new();
    engine
        .on("job", |s: SocketRef, Data(n): Data<u64>| async move {
            // earlier jobs sleep longer, they must still finish first
            tokio::time::sleep(Duration::from_millis(5 * (5 - n))).await;
            s.emit("done", &n).unwrap();
        })
        .unwrap();
    let (_channel, mut peer) = client(&engine).await;

    for n in 0..5 {
        assert_ok!(peer.send_text(format!(r#"42["job",{n}]"#)).await);
    }
    for n in 0..5 {
        assert_eq!(next_text(&mut peer).await, format!(r#"42["done",{n}]"#));
    }
}

#[tokio::test]
pub async fn unknown_event_is_dropped() {
    let engine = echo_engine();
    let (channel, mut peer) = client(&engine).await;

    assert_ok!(peer.send_text(r#"42["nope",1]"#).await);
    assert_ok!(peer.send_text(r#"42["echo",[1]]"#).await);
    assert_eq!(next_text(&mut peer).await, r#"42["echo-reply",[1]]"#);
    assert!(channel.is_alive());
}

#[tokio::test]
pub async fn invalid_args_are_dropped() {
    let engine = echo_engine();
    let (channel, mut peer) = client(&engine).await;

    assert_ok!(peer.send_text(r#"42["echo",{"a":1}]"#).await);
    assert_ok!(peer.send_text(r#"42["echo","not json"]"#).await);
    assert_ok!(peer.send_text(r#"42["echo",[2]]"#).await);
    assert_eq!(next_text(&mut peer).await, r#"42["echo-reply",[2]]"#);
    assert!(channel.is_alive());
}

#[tokio::test]
pub async fn try_data_receives_errors() {
    let engine = Engine::new();
    let (tx, mut rx) = mpsc::channel::<bool>(4);
    engine
        .on("try", move |TryData(data): TryData<u32>| {
            tx.try_send(data.is_ok()).unwrap();
        })
        .unwrap();
    let (_channel, peer) = client(&engine).await;

    assert_ok!(peer.send_text(r#"42["try",1]"#).await);
    assert_ok!(peer.send_text(r#"42["try","x"]"#).await);
    assert!(timeout_rcv(&mut rx, 100).await);
    assert!(!timeout_rcv(&mut rx, 100).await);
}

#[tokio::test]
pub async fn panicking_handler_does_not_end_channel() {
    let engine = echo_engine();
    engine
        .on("boom", |Data(boom): Data<bool>| {
            if boom {
                panic!("handler failure");
            }
        })
        .unwrap();
    engine
        .on("boom-async", |Data(boom): Data<bool>| async move {
            tokio::task::yield_now().await;
            if boom {
                panic!("async handler failure");
            }
        })
        .unwrap();
    let (channel, mut peer) = client(&engine).await;

    assert_ok!(peer.send_text(r#"42["boom",true]"#).await);
    assert_ok!(peer.send_text(r#"42["boom-async",true]"#).await);
    assert_ok!(peer.send_text(r#"42["echo",[3]]"#).await);
    assert_eq!(next_text(&mut peer).await, r#"42["echo-reply",[3]]"#);
    assert!(channel.is_alive());
}

#[tokio::test]
pub async fn handler_for_many_events() {
    let engine = Engine::new();
    let (tx, mut rx) = mpsc::channel::<String>(4);
    for name in ["a", "b"] {
        let tx = tx.clone();
        engine
            .on(name, move |Event(event): Event| tx.try_send(event).unwrap())
            .unwrap();
    }
    let (_channel, peer) = client(&engine).await;

    assert_ok!(peer.send_text(r#"42["b",null]"#).await);
    assert_ok!(peer.send_text(r#"42["a",null]"#).await);
    assert_eq!(timeout_rcv(&mut rx, 100).await, "b");
    assert_eq!(timeout_rcv(&mut rx, 100).await, "a");
}

#[tokio::test]
pub async fn handlers_can_change_at_runtime() {
    let engine = Engine::new();
    let (tx, mut rx) = mpsc::channel::<u32>(4);
    let (_channel, peer) = client(&engine).await;

    assert_ok!(peer.send_text(r#"42["late",1]"#).await);
    assert_idle(&mut rx, 20).await;

    engine
        .on("late", move |Data(n): Data<u32>| tx.try_send(n).unwrap())
        .unwrap();
    assert_ok!(peer.send_text(r#"42["late",2]"#).await);
    assert_eq!(timeout_rcv(&mut rx, 100).await, 2);

    engine.registry().off("late");
    assert_ok!(peer.send_text(r#"42["late",3]"#).await);
    assert_idle(&mut rx, 20).await;
}

#[tokio::test]
pub async fn connect_handler_fires_once_on_open() {
    let engine = Engine::new();
    let (tx, mut rx) = mpsc::channel::<String>(4);
    engine.on_connect(move |s: SocketRef| {
        tx.try_send(s.id().to_owned()).unwrap();
    });
    let (channel, peer) = client(&engine).await;

    assert_eq!(timeout_rcv(&mut rx, 100).await, "abc");
    assert_eq!(channel.id(), "abc");
    let header = assert_some!(channel.header());
    assert_eq!(header.ping_interval, 25000);

    // a second open packet is ignored
    assert_ok!(peer.send_text(fixture::OPEN_PACKET.replace("abc", "xyz")).await);
    assert_idle(&mut rx, 50).await;
    assert_eq!(channel.id(), "abc");
    assert!(channel.is_alive());
}

#[tokio::test]
pub async fn dispatch_backlog_overflow_closes_channel() {
    let engine = Engine::builder().dispatch_buffer(1).build();
    engine
        .on("stuck", || async {
            tokio::time::sleep(Duration::from_secs(10)).await;
        })
        .unwrap();
    let mut rx = disconnect_rx(&engine);
    let (channel, peer) = client(&engine).await;

    for _ in 0..4 {
        assert_ok!(peer.send_text(r#"42["stuck",null]"#).await);
    }

    assert_eq!(timeout_rcv(&mut rx, 200).await, DisconnectReason::Overflow);
    assert!(!channel.is_alive());
}
