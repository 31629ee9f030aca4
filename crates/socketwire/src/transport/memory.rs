//! An in-process duplex transport.
//!
//! [`MemoryTransport::pair`] returns the transport to hand to the
//! [`Engine`](crate::Engine) and a [`MemoryPeer`] that plays the remote side.
//! Frames travel through bounded channels, so a peer that stops reading
//! eventually blocks the channel's writer, the same way a slow network would.
use std::time::Duration;

use bytes::Bytes;
use tokio::sync::{Mutex, mpsc, watch};

use super::{Frame, Transport, TransportError, wait_closed};

/// A [`Transport`] whose remote end is a [`MemoryPeer`].
#[derive(Debug)]
pub struct MemoryTransport {
    incoming: Mutex<mpsc::Receiver<Frame>>,
    outgoing: mpsc::Sender<Frame>,
    closed: watch::Sender<bool>,
    ping_params: (Duration, Duration),
}

/// The remote side of a [`MemoryTransport`].
#[derive(Debug)]
pub struct MemoryPeer {
    tx: mpsc::Sender<Frame>,
    rx: mpsc::Receiver<Frame>,
    closed: watch::Receiver<bool>,
}

impl MemoryTransport {
    /// Frames buffered in each direction by [`MemoryTransport::pair`].
    pub const DEFAULT_CAPACITY: usize = 1024;

    /// Creates a connected transport and peer.
    pub fn pair() -> (Self, MemoryPeer) {
        Self::pair_with_capacity(Self::DEFAULT_CAPACITY)
    }

    /// Creates a connected transport and peer buffering at most `capacity`
    /// frames in each direction.
    pub fn pair_with_capacity(capacity: usize) -> (Self, MemoryPeer) {
        let (to_peer, from_engine) = mpsc::channel(capacity);
        let (to_engine, from_peer) = mpsc::channel(capacity);
        let (closed, closed_rx) = watch::channel(false);
        let transport = MemoryTransport {
            incoming: Mutex::new(from_peer),
            outgoing: to_peer,
            closed,
            ping_params: (Duration::from_secs(30), Duration::from_secs(60)),
        };
        let peer = MemoryPeer {
            tx: to_engine,
            rx: from_engine,
            closed: closed_rx,
        };
        (transport, peer)
    }

    /// Sets the values returned by [`Transport::ping_params`].
    pub fn with_ping_params(mut self, interval: Duration, timeout: Duration) -> Self {
        self.ping_params = (interval, timeout);
        self
    }

    async fn write(&self, frame: Frame) -> Result<(), TransportError> {
        tokio::select! {
            biased;
            _ = wait_closed(self.closed.subscribe()) => Err(TransportError::Closed),
            res = self.outgoing.send(frame) => res.map_err(|_| TransportError::Closed),
        }
    }
}

impl Transport for MemoryTransport {
    async fn recv(&self) -> Result<Frame, TransportError> {
        let closed = wait_closed(self.closed.subscribe());
        tokio::pin!(closed);
        let mut incoming = tokio::select! {
            biased;
            _ = &mut closed => return Err(TransportError::Closed),
            incoming = self.incoming.lock() => incoming,
        };
        tokio::select! {
            biased;
            _ = &mut closed => Err(TransportError::Closed),
            frame = incoming.recv() => frame.ok_or(TransportError::Closed),
        }
    }

    async fn send_text(&self, text: String) -> Result<(), TransportError> {
        self.write(Frame::Text(text)).await
    }

    async fn send_binary(&self, data: Bytes) -> Result<(), TransportError> {
        self.write(Frame::Binary(data)).await
    }

    fn close(&self) {
        self.closed.send_replace(true);
    }

    fn ping_params(&self) -> (Duration, Duration) {
        self.ping_params
    }
}

impl MemoryPeer {
    /// Sends a text frame to the engine side.
    pub async fn send_text(&self, text: impl Into<String>) -> Result<(), TransportError> {
        self.send(Frame::Text(text.into())).await
    }

    /// Sends a binary frame to the engine side.
    pub async fn send_binary(&self, data: impl Into<Bytes>) -> Result<(), TransportError> {
        self.send(Frame::Binary(data.into())).await
    }

    /// Sends a frame to the engine side.
    pub async fn send(&self, frame: Frame) -> Result<(), TransportError> {
        if self.is_closed() {
            return Err(TransportError::Closed);
        }
        self.tx.send(frame).await.map_err(|_| TransportError::Closed)
    }

    /// Receives the next frame written by the engine side.
    ///
    /// Frames written before the transport was closed are still returned.
    /// Returns `None` once the transport is dropped and every frame was read.
    pub async fn recv(&mut self) -> Option<Frame> {
        self.rx.recv().await
    }

    /// Receives the next frame and returns it if it is a text frame.
    pub async fn recv_text(&mut self) -> Option<String> {
        match self.recv().await? {
            Frame::Text(text) => Some(text),
            Frame::Binary(_) => None,
        }
    }

    /// Returns a frame already written by the engine side, without waiting.
    pub fn try_recv(&mut self) -> Option<Frame> {
        self.rx.try_recv().ok()
    }

    /// Whether the engine side closed the transport.
    pub fn is_closed(&self) -> bool {
        *self.closed.borrow()
    }

    /// Resolves once the engine side closed the transport.
    pub async fn closed(&self) {
        wait_closed(self.closed.clone()).await
    }
}
