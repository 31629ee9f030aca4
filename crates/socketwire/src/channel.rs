//! A [`Channel`] is one live session over one [`Transport`](crate::transport::Transport).
//!
//! Once started, a channel runs four tasks until it closes:
//! * the inbound loop reads frames, decodes them, reassembles binary
//!   attachments, answers pings, resolves acks and queues events for dispatch;
//! * the dispatch loop runs the matching handler of each queued event, one at
//!   a time and in arrival order;
//! * the outbound loop writes the outbound queue to the transport and applies
//!   the backpressure policy;
//! * the pinger queues a ping every ping interval of the transport.
//!
//! Closing is idempotent: whichever of these tasks or the user gets there first
//! closes the transport, drains the outbound queue, fails pending acks and
//! calls the disconnect handler. Every later attempt is a no-op.
use std::{
    collections::VecDeque,
    fmt,
    future::Future,
    net::SocketAddr,
    panic::AssertUnwindSafe,
    pin::pin,
    sync::{Arc, Mutex, OnceLock, Weak},
    time::Duration,
};

use bytes::{BufMut, Bytes, BytesMut};
use futures_core::future::BoxFuture;
use futures_util::FutureExt;
use http::HeaderMap;
use serde::{Serialize, de::DeserializeOwned};
use smallvec::smallvec;
use socketwire_core::{Message, OpenHeader, PacketKind, Sid};
use tokio::sync::{
    mpsc::{self, error::TrySendError},
    watch,
};

use crate::{
    ack::{AckTable, AckWaiter},
    backpressure::{BackpressureTracker, Pressure},
    config::{EngineConfig, ProtocolVersion},
    errors::{AckError, Error, SendError, SocketError},
    extract::decode_args,
    handler::HandlerRegistry,
    queue::{Frames, Outbound, OutboundQueue},
    transport::{BoxedTransport, Frame, wait_closed},
};

/// All the possible reasons for a [`Channel`] to be closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisconnectReason {
    /// The peer closed the session (engine.io close packet, socket.io
    /// disconnect packet or websocket close), or the transport was closed.
    TransportClose,

    /// The transport failed to read or write, or a deadline elapsed.
    TransportError,

    /// The peer sent a packet that cannot be decoded, or a frame of the wrong
    /// type while binary attachments were expected.
    PacketParsingError,

    /// The outbound queue reached its capacity limit.
    Overflow,

    /// [`Channel::close`] was called.
    ClosedByUser,
}

impl fmt::Display for DisconnectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use DisconnectReason::*;
        let str: &'static str = match self {
            TransportClose => "session closed by the peer or the transport",
            TransportError => "transport error while reading or writing",
            PacketParsingError => "peer sent an invalid packet",
            Overflow => "outbound queue overflow",
            ClosedByUser => "channel closed locally",
        };
        f.write_str(str)
    }
}

/// Which side of the handshake a channel plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// The channel waits for the peer's open packet.
    Client,
    /// The channel sends the open packet.
    Server,
}

/// What is known about the remote end of a channel.
#[derive(Debug, Clone, Default)]
pub struct RemoteInfo {
    /// The peer address, when the transport has one.
    pub addr: Option<SocketAddr>,
    /// The headers of the handshake request, for server channels.
    pub headers: HeaderMap,
}

enum Dispatch {
    Connect,
    Message(Message),
}

/// A live session with a peer.
///
/// It is created by an [`Engine`](crate::Engine) and handed to handlers through
/// the [`SocketRef`](crate::extract::SocketRef) extractor.
pub struct Channel {
    me: Weak<Channel>,
    local_id: Sid,
    role: Role,
    header: OnceLock<OpenHeader>,
    transport: BoxedTransport,
    outbound: OutboundQueue,
    alive: Mutex<bool>,
    closed_tx: watch::Sender<bool>,
    reason: OnceLock<DisconnectReason>,
    ack: AckTable,
    registry: Arc<HandlerRegistry>,
    tracker: Arc<BackpressureTracker>,
    config: Arc<EngineConfig>,
    remote: RemoteInfo,
}

impl Channel {
    pub(crate) fn new(
        transport: BoxedTransport,
        role: Role,
        remote: RemoteInfo,
        registry: Arc<HandlerRegistry>,
        tracker: Arc<BackpressureTracker>,
        config: Arc<EngineConfig>,
    ) -> Arc<Self> {
        let capacity = config.max_buffer_size.max(EngineConfig::MIN_BUFFER_SIZE);
        Arc::new_cyclic(|me| Channel {
            me: me.clone(),
            local_id: Sid::new(),
            role,
            header: OnceLock::new(),
            transport,
            outbound: OutboundQueue::new(capacity),
            alive: Mutex::new(true),
            closed_tx: watch::Sender::new(false),
            reason: OnceLock::new(),
            ack: AckTable::default(),
            registry,
            tracker,
            config,
            remote,
        })
    }

    /// Stores the handshake header of a server channel and queues its open packet.
    /// Must be called before [`Channel::start`] so the open packet is written first.
    pub(crate) fn handshake(&self, header: OpenHeader) -> Result<(), SendError> {
        let msg = header.to_message()?;
        let _ = self.header.set(header);
        self.send(&msg, None)
    }

    /// Spawns the duty loops of the channel.
    pub(crate) fn start(self: &Arc<Self>) {
        let (dispatch_tx, dispatch_rx) = mpsc::channel(self.config.dispatch_buffer.max(1));
        if self.role == Role::Server {
            // The handshake is already queued, the connect handler runs first.
            let _ = dispatch_tx.try_send(Dispatch::Connect);
        }
        #[cfg(feature = "tracing")]
        tracing::debug!("[sid={}] starting {:?} channel", self.local_id, self.role);

        tokio::spawn(self.clone().dispatch_loop(dispatch_rx));
        tokio::spawn(self.clone().inbound_loop(dispatch_tx));
        tokio::spawn(self.clone().outbound_loop());
        tokio::spawn(self.clone().pinger());
    }

    /// The session id from the handshake header.
    /// Empty until a client channel received the peer's open packet.
    pub fn id(&self) -> &str {
        self.header.get().map(|h| h.sid.as_str()).unwrap_or_default()
    }

    /// The locally generated id, also the key of the channel in the
    /// [`BackpressureTracker`].
    pub fn local_id(&self) -> Sid {
        self.local_id
    }

    /// The handshake header, once known.
    pub fn header(&self) -> Option<&OpenHeader> {
        self.header.get()
    }

    /// The role of the channel.
    pub fn role(&self) -> Role {
        self.role
    }

    /// What is known about the peer.
    pub fn remote(&self) -> &RemoteInfo {
        &self.remote
    }

    /// The engine.io protocol revision of the channel.
    pub fn protocol(&self) -> ProtocolVersion {
        self.config.protocol
    }

    /// Whether the channel is still open.
    pub fn is_alive(&self) -> bool {
        *self.alive.lock().unwrap()
    }

    /// Why the channel closed, `None` while it is open.
    pub fn disconnect_reason(&self) -> Option<DisconnectReason> {
        self.reason.get().copied()
    }

    /// The number of messages waiting in the outbound queue.
    pub fn buffered(&self) -> usize {
        self.outbound.len()
    }

    /// The number of ack requests still waiting for their reply.
    pub fn pending_acks(&self) -> usize {
        self.ack.pending()
    }

    /// Resolves once the channel is closed.
    pub async fn closed(&self) {
        wait_closed(self.closed_tx.subscribe()).await
    }

    /// Emits an event to the peer: `42["<method>",<args>]`.
    ///
    /// The message is only queued, this never waits for the network. It fails
    /// with [`SocketError::InternalChannelFull`] when the outbound queue is full
    /// and [`SocketError::Closed`] once the channel is closed.
    ///
    /// ```no_run
    /// # use socketwire::{Engine, transport::memory::MemoryTransport};
    /// # async fn doc() {
    /// # let (transport, _peer) = MemoryTransport::pair();
    /// let channel = Engine::new().connect(transport);
    /// channel.emit("chat", &serde_json::json!({ "text": "hi" })).unwrap();
    /// # }
    /// ```
    pub fn emit<T: ?Sized + Serialize>(
        &self,
        method: impl AsRef<str>,
        args: &T,
    ) -> Result<(), SendError> {
        let args = serde_json::to_string(args)?;
        self.send(&Message::event(method.as_ref(), args), None)
    }

    /// Emits an event followed by one binary attachment:
    /// `451-["<method>",<args>]` then the binary frame.
    pub fn emit_binary<T: ?Sized + Serialize>(
        &self,
        method: impl AsRef<str>,
        args: &T,
        binary: impl Into<Bytes>,
    ) -> Result<(), SendError> {
        let args = serde_json::to_string(args)?;
        let msg = Message::binary_event(method.as_ref(), args, 1);
        self.send(&msg, Some(binary.into()))
    }

    /// Sends an ack request `42<id>["<method>",<args>]` and waits up to
    /// `timeout` for the reply.
    ///
    /// The reply is the raw text between the outer brackets of the peer's
    /// `43<id>[...]` packet. The waiter is registered before the request is
    /// queued and removed when the returned future completes or is dropped.
    pub fn ack<T: ?Sized + Serialize>(
        &self,
        method: impl AsRef<str>,
        args: &T,
        timeout: Duration,
    ) -> impl Future<Output = Result<String, AckError>> + Send {
        let waiter = self.prepare_ack(method.as_ref(), args, timeout);
        async move { waiter?.await }
    }

    /// Same as [`Channel::ack`] with the configured
    /// [`ack_timeout`](EngineConfig::ack_timeout), with the reply deserialized into `V`.
    pub fn emit_with_ack<T: ?Sized + Serialize, V: DeserializeOwned>(
        &self,
        method: impl AsRef<str>,
        args: &T,
    ) -> impl Future<Output = Result<V, AckError>> + Send {
        let reply = self.ack(method, args, self.config.ack_timeout);
        async move {
            let reply = reply.await?;
            Ok(decode_args(&reply)?)
        }
    }

    fn prepare_ack<T: ?Sized + Serialize>(
        &self,
        method: &str,
        args: &T,
        timeout: Duration,
    ) -> Result<AckWaiter<'_>, AckError> {
        if !self.is_alive() {
            return Err(SocketError::Closed.into());
        }
        let args = serde_json::to_string(args).map_err(SendError::from)?;
        let id = self.ack.next_id();
        let waiter = self.ack.add_waiter(id, timeout)?;
        self.send(&Message::ack_request(id, method, args), None)?;
        Ok(waiter)
    }

    /// Closes the channel. Calling it more than once has no effect.
    ///
    /// The disconnect handler is called with [`DisconnectReason::ClosedByUser`].
    pub fn close(&self) {
        self.close_with(DisconnectReason::ClosedByUser);
    }

    /// Encodes a message and queues it with its binary attachment.
    pub(crate) fn send(&self, msg: &Message, binary: Option<Bytes>) -> Result<(), SendError> {
        let text = socketwire_core::encode(msg)?;
        let mut frames: Frames = smallvec![Frame::Text(text)];
        if let Some(binary) = binary {
            frames.push(Frame::Binary(binary));
        }
        if !self.is_alive() {
            return Err(SocketError::Closed.into());
        }
        if let Err(e) = self.outbound.push(frames) {
            #[cfg(feature = "tracing")]
            tracing::trace!("[sid={}] cannot queue {:?} packet: {e}", self.local_id, msg.kind);
            return Err(e.into());
        }
        Ok(())
    }

    pub(crate) fn close_with(&self, reason: DisconnectReason) {
        {
            let mut alive = self.alive.lock().unwrap();
            if !*alive {
                return;
            }
            self.transport.close();
            *alive = false;
            self.outbound.close();
            let _ = self.reason.set(reason);
        }
        #[cfg(feature = "tracing")]
        tracing::debug!("[sid={}] closing channel: {reason}", self.local_id);

        self.closed_tx.send_replace(true);
        self.ack.close_all();
        self.on_disconnect(reason);
        self.tracker.remove(&self.local_id);
    }

    fn on_disconnect(&self, reason: DisconnectReason) {
        let Some(me) = self.me.upgrade() else {
            return;
        };
        let Some(fut) = self.registry.disconnect(&me, reason) else {
            return;
        };
        match tokio::runtime::Handle::try_current() {
            Ok(rt) => {
                rt.spawn(run_handler(self.local_id, fut));
            }
            Err(_e) => {
                #[cfg(feature = "tracing")]
                tracing::debug!("[sid={}] no runtime to run the disconnect handler: {_e}", self.local_id);
            }
        }
    }

    async fn dispatch_loop(self: Arc<Self>, mut rx: mpsc::Receiver<Dispatch>) {
        while let Some(item) = rx.recv().await {
            if !self.is_alive() {
                break;
            }
            let fut = match item {
                Dispatch::Connect => self.registry.connect(&self),
                Dispatch::Message(msg) => self.registry.message(&self, msg.into()),
            };
            if let Some(fut) = fut {
                run_handler(self.local_id, fut).await;
            }
        }
        #[cfg(feature = "tracing")]
        tracing::debug!("[sid={}] dispatch loop stopped", self.local_id);
    }

    async fn inbound_loop(self: Arc<Self>, dispatch: mpsc::Sender<Dispatch>) {
        match self.read_packets(&dispatch).await {
            Ok(()) => {
                #[cfg(feature = "tracing")]
                tracing::debug!("[sid={}] inbound loop stopped", self.local_id);
            }
            Err(e) => {
                #[cfg(feature = "tracing")]
                tracing::debug!("[sid={}] inbound loop stopped: {e}", self.local_id);
                self.close_with(DisconnectReason::from(&e));
            }
        }
    }

    /// Reads and handles packets until the peer closes or the dispatch loop stops.
    ///
    /// Events that do not fit in the dispatch queue wait in a backlog while
    /// reading goes on, so ack replies and pings are never stuck behind a busy
    /// handler. A backlog that grows past the dispatch buffer closes the channel.
    async fn read_packets(&self, dispatch: &mpsc::Sender<Dispatch>) -> Result<(), Error> {
        let limit = dispatch.max_capacity();
        let mut backlog: VecDeque<Dispatch> = VecDeque::new();
        let mut read = pin!(self.read_message());
        loop {
            tokio::select! {
                biased;
                permit = dispatch.reserve(), if !backlog.is_empty() => {
                    let Ok(permit) = permit else { return Ok(()) };
                    if let Some(item) = backlog.pop_front() {
                        permit.send(item);
                    }
                }
                msg = &mut read => {
                    read.set(self.read_message());
                    let Some(item) = self.handle_packet(msg?)? else {
                        continue;
                    };
                    if !backlog.is_empty() {
                        if backlog.len() >= limit {
                            return Err(Error::DispatchOverflow);
                        }
                        backlog.push_back(item);
                        continue;
                    }
                    match dispatch.try_send(item) {
                        Ok(()) => {}
                        Err(TrySendError::Full(item)) => {
                            #[cfg(feature = "tracing")]
                            tracing::trace!("[sid={}] dispatch queue full, holding event", self.local_id);
                            backlog.push_back(item);
                        }
                        Err(TrySendError::Closed(_)) => return Ok(()),
                    }
                }
            }
        }
    }

    /// Reads one text packet and its binary attachments.
    async fn read_message(&self) -> Result<Message, Error> {
        let text = match self.transport.recv().await? {
            Frame::Text(text) => text,
            Frame::Binary(_) => return Err(Error::UnexpectedBinary),
        };
        let mut msg = socketwire_core::decode(text)?;
        while !msg.is_complete() {
            match self.transport.recv().await {
                Ok(Frame::Binary(bin)) => msg.push_binary(self.unwrap_binary(&bin)),
                Ok(Frame::Text(_)) => return Err(Error::MissingBinary),
                Err(_e) => {
                    #[cfg(feature = "tracing")]
                    tracing::debug!(
                        "[sid={}] transport ended with {} attachments missing: {_e}",
                        self.local_id,
                        msg.pending_binary_frames()
                    );
                    return Err(Error::MissingBinary);
                }
            }
        }
        Ok(msg)
    }

    /// Handles a packet inline, returning it when it must go through dispatch.
    fn handle_packet(&self, msg: Message) -> Result<Option<Dispatch>, Error> {
        match msg.kind {
            PacketKind::Open => {
                let header = OpenHeader::from_message(&msg)?;
                if self.header.set(header).is_err() {
                    #[cfg(feature = "tracing")]
                    tracing::debug!("[sid={}] ignoring duplicate open packet", self.local_id);
                    return Ok(None);
                }
                #[cfg(feature = "tracing")]
                tracing::debug!("[sid={}] handshake received, id {}", self.local_id, self.id());
                return Ok(Some(Dispatch::Connect));
            }
            PacketKind::Ping => {
                #[cfg(feature = "tracing")]
                tracing::trace!("[sid={}] ping received", self.local_id);
                if let Err(_e) = self.send(&Message::pong(), None) {
                    #[cfg(feature = "tracing")]
                    tracing::trace!("[sid={}] cannot answer ping: {_e}", self.local_id);
                }
            }
            PacketKind::Pong => {
                #[cfg(feature = "tracing")]
                tracing::trace!("[sid={}] pong received", self.local_id);
            }
            PacketKind::Close | PacketKind::Disconnect => return Err(Error::PeerClose),
            PacketKind::Connect => self.on_namespace_connect(),
            PacketKind::AckResponse | PacketKind::BinaryAck => {
                if let Some(id) = msg.ack_id {
                    if !self.ack.resolve(id, msg.args) {
                        #[cfg(feature = "tracing")]
                        tracing::trace!("[sid={}] discarding late ack {id}", self.local_id);
                    }
                }
            }
            PacketKind::Event | PacketKind::AckRequest | PacketKind::BinaryEvent => {
                return Ok(Some(Dispatch::Message(msg)));
            }
        }
        Ok(None)
    }

    fn on_namespace_connect(&self) {
        if self.role != Role::Server {
            return;
        }
        let args = match self.config.protocol {
            ProtocolVersion::V3 => String::new(),
            ProtocolVersion::V4 => format!(r#"{{"sid":"{}"}}"#, self.id()),
        };
        if let Err(_e) = self.send(&Message::connect(args), None) {
            #[cfg(feature = "tracing")]
            tracing::debug!("[sid={}] cannot answer connect packet: {_e}", self.local_id);
        }
    }

    async fn outbound_loop(self: Arc<Self>) {
        if let Err(e) = self.write_packets().await {
            #[cfg(feature = "tracing")]
            tracing::debug!("[sid={}] outbound loop stopped: {e}", self.local_id);
            self.close_with(DisconnectReason::from(&e));
        }
        self.tracker.remove(&self.local_id);
    }

    async fn write_packets(&self) -> Result<(), Error> {
        loop {
            let pressure =
                self.tracker
                    .observe(self.local_id, self.outbound.len(), self.outbound.capacity());
            if pressure == Pressure::Overflow {
                return Err(Error::Overflow);
            }
            let frames = match self.outbound.pop().await {
                Outbound::Frames(frames) => frames,
                Outbound::Close => return Ok(()),
            };
            for frame in frames {
                match frame {
                    Frame::Text(text) => self.transport.send_text(text).await?,
                    Frame::Binary(bin) => self.transport.send_binary(self.wrap_binary(bin)).await?,
                }
            }
        }
    }

    async fn pinger(self: Arc<Self>) {
        let (interval, _) = self.transport.ping_params();
        loop {
            tokio::select! {
                _ = self.closed() => break,
                _ = tokio::time::sleep(interval) => {}
            }
            if !self.is_alive() {
                break;
            }
            #[cfg(feature = "tracing")]
            tracing::trace!("[sid={}] sending ping", self.local_id);
            if let Err(_e) = self.send(&Message::ping(), None) {
                #[cfg(feature = "tracing")]
                tracing::trace!("[sid={}] cannot queue ping: {_e}", self.local_id);
            }
        }
    }

    /// Engine.IO v3 prefixes binary websocket frames with the message packet type.
    fn wrap_binary(&self, bin: Bytes) -> Bytes {
        match self.config.protocol {
            ProtocolVersion::V4 => bin,
            ProtocolVersion::V3 => {
                let mut buf = BytesMut::with_capacity(bin.len() + 1);
                buf.put_u8(0x04);
                buf.extend_from_slice(&bin);
                buf.freeze()
            }
        }
    }

    fn unwrap_binary<'a>(&self, bin: &'a [u8]) -> &'a [u8] {
        match self.config.protocol {
            ProtocolVersion::V3 if !bin.is_empty() => &bin[1..],
            _ => bin,
        }
    }
}

/// Runs a handler future, a panic only ends this handler.
async fn run_handler(_id: Sid, fut: BoxFuture<'static, ()>) {
    if let Err(_panic) = AssertUnwindSafe(fut).catch_unwind().await {
        #[cfg(feature = "tracing")]
        tracing::error!("[sid={_id}] handler panicked");
    }
}

impl fmt::Debug for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Channel")
            .field("local_id", &self.local_id)
            .field("id", &self.id())
            .field("role", &self.role)
            .field("alive", &self.is_alive())
            .field("buffered", &self.outbound.len())
            .finish()
    }
}
