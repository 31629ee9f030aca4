#![allow(dead_code)]

use std::time::Duration;

use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

/// Logs to the test output, filtered with `RUST_LOG`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

#[macro_export]
macro_rules! assert_ok {
    ($e:expr) => {
        match $e {
            Ok(v) => v,
            Err(e) => panic!("expected Ok, got Err({e:?}) at {}:{}", file!(), line!()),
        }
    };
}

#[macro_export]
macro_rules! assert_err {
    ($e:expr) => {
        match $e {
            Ok(v) => panic!("expected Err, got Ok({v:?}) at {}:{}", file!(), line!()),
            Err(e) => e,
        }
    };
}

#[macro_export]
macro_rules! assert_some {
    ($e:expr) => {
        match $e {
            Some(v) => v,
            None => panic!("expected Some, got None at {}:{}", file!(), line!()),
        }
    };
}

/// Receives the next value or panics after `ms` milliseconds.
pub async fn timeout_rcv<T: std::fmt::Debug>(rx: &mut mpsc::Receiver<T>, ms: u64) -> T {
    tokio::time::timeout(Duration::from_millis(ms), rx.recv())
        .await
        .unwrap_or_else(|_| panic!("nothing received within {ms}ms"))
        .expect("sender dropped")
}

/// Asserts that nothing is received within `ms` milliseconds.
pub async fn assert_idle<T: std::fmt::Debug>(rx: &mut mpsc::Receiver<T>, ms: u64) {
    if let Ok(Some(v)) = tokio::time::timeout(Duration::from_millis(ms), rx.recv()).await {
        panic!("unexpected value received: {v:?}");
    }
}
