//! The transport contract a [`Channel`](crate::Channel) runs on, and its implementations.
//!
//! * [`ws`]: websocket transport on top of `tokio-tungstenite`.
//! * [`memory`]: in-process duplex transport, mostly useful for tests.
use std::{future::Future, time::Duration};

use bytes::Bytes;
use futures_core::future::BoxFuture;
use tokio::sync::watch;
use tokio_tungstenite::tungstenite;

pub mod memory;
pub mod ws;

/// One frame read from or written to a transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// A text frame, holding exactly one encoded packet.
    Text(String),
    /// A binary frame, holding one attachment.
    Binary(Bytes),
}

impl Frame {
    /// Whether this is a binary frame.
    pub fn is_binary(&self) -> bool {
        matches!(self, Frame::Binary(_))
    }
}

/// Error returned by transport operations.
#[derive(thiserror::Error, Debug)]
pub enum TransportError {
    /// The transport is closed, locally or by the peer.
    #[error("transport closed")]
    Closed,
    /// A read or write deadline elapsed.
    #[error("transport deadline elapsed")]
    Timeout,
    /// Websocket protocol error.
    #[error("websocket error: {0}")]
    Ws(#[from] Box<tungstenite::Error>),
    /// Io error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<tungstenite::Error> for TransportError {
    fn from(err: tungstenite::Error) -> Self {
        match err {
            tungstenite::Error::ConnectionClosed | tungstenite::Error::AlreadyClosed => {
                TransportError::Closed
            }
            err => TransportError::Ws(Box::new(err)),
        }
    }
}

/// A bidirectional, framed, message-oriented connection.
///
/// `recv` and the send methods may be called concurrently from different
/// tasks. After [`close`](Transport::close) every pending and future call must
/// fail with [`TransportError::Closed`].
pub trait Transport: Send + Sync + 'static {
    /// Waits for the next frame.
    fn recv(&self) -> impl Future<Output = Result<Frame, TransportError>> + Send;

    /// Writes one text frame.
    fn send_text(&self, text: String) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Writes one binary frame.
    fn send_binary(&self, data: Bytes) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Closes the transport. Calling it more than once has no effect.
    fn close(&self);

    /// The heartbeat interval and timeout of this transport.
    fn ping_params(&self) -> (Duration, Duration);
}

/// Object safe version of [`Transport`] stored by channels.
pub(crate) trait ErasedTransport: Send + Sync + 'static {
    fn recv(&self) -> BoxFuture<'_, Result<Frame, TransportError>>;
    fn send_text(&self, text: String) -> BoxFuture<'_, Result<(), TransportError>>;
    fn send_binary(&self, data: Bytes) -> BoxFuture<'_, Result<(), TransportError>>;
    fn close(&self);
    fn ping_params(&self) -> (Duration, Duration);
}

impl<T: Transport> ErasedTransport for T {
    fn recv(&self) -> BoxFuture<'_, Result<Frame, TransportError>> {
        Box::pin(Transport::recv(self))
    }
    fn send_text(&self, text: String) -> BoxFuture<'_, Result<(), TransportError>> {
        Box::pin(Transport::send_text(self, text))
    }
    fn send_binary(&self, data: Bytes) -> BoxFuture<'_, Result<(), TransportError>> {
        Box::pin(Transport::send_binary(self, data))
    }
    fn close(&self) {
        Transport::close(self)
    }
    fn ping_params(&self) -> (Duration, Duration) {
        Transport::ping_params(self)
    }
}

pub(crate) type BoxedTransport = Box<dyn ErasedTransport>;

/// Resolves once the watched flag turns `true`.
pub(crate) async fn wait_closed(mut rx: watch::Receiver<bool>) {
    // An error means the sender is gone, which is as good as closed.
    let _ = rx.wait_for(|closed| *closed).await;
}
