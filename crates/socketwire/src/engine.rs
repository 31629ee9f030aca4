use std::{borrow::Cow, fmt, sync::Arc, time::Duration};

use socketwire_core::OpenHeader;

use crate::{
    backpressure::BackpressureTracker,
    channel::{Channel, RemoteInfo, Role},
    config::{EngineConfig, ProtocolVersion},
    errors::{RegistryError, SendError, TransportError},
    handler::{ConnectHandler, DisconnectHandler, HandlerRegistry, MessageHandler},
    transport::{
        Transport,
        ws::{WsConfig, WsTransport},
    },
};

/// A builder to create an [`Engine`] with a custom [`EngineConfig`].
#[derive(Debug, Default)]
pub struct EngineBuilder {
    config: EngineConfig,
}

impl EngineBuilder {
    /// Creates a new [`EngineBuilder`] with the default config.
    pub fn new() -> Self {
        Self::default()
    }

    /// The maximum number of messages that can wait in the outbound queue of a channel.
    /// A channel whose queue reaches this limit is closed.
    ///
    /// Defaults to 500 messages.
    #[inline]
    pub fn max_buffer_size(mut self, max_buffer_size: usize) -> Self {
        self.config.max_buffer_size = max_buffer_size;
        self
    }

    /// The amount of time [`Channel::emit_with_ack`] waits for a reply.
    ///
    /// Defaults to 5 seconds.
    #[inline]
    pub fn ack_timeout(mut self, ack_timeout: Duration) -> Self {
        self.config.ack_timeout = ack_timeout;
        self
    }

    /// The number of received events that may wait for their handler.
    ///
    /// Defaults to 128 events.
    #[inline]
    pub fn dispatch_buffer(mut self, dispatch_buffer: usize) -> Self {
        self.config.dispatch_buffer = dispatch_buffer;
        self
    }

    /// The engine.io protocol revision spoken by the channels.
    ///
    /// Defaults to [`ProtocolVersion::V4`].
    #[inline]
    pub fn protocol(mut self, protocol: ProtocolVersion) -> Self {
        self.config.protocol = protocol;
        self
    }

    /// Replaces the whole config.
    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Builds the [`Engine`].
    pub fn build(self) -> Engine {
        Engine {
            config: Arc::new(self.config),
            registry: Arc::new(HandlerRegistry::new()),
            tracker: Arc::new(BackpressureTracker::new()),
        }
    }
}

/// The [`Engine`] creates channels and holds what they share: the config,
/// the [`HandlerRegistry`] and the [`BackpressureTracker`].
///
/// It can be cheaply cloned and moved around. Several engines can live in one
/// process without sharing anything.
///
/// ```no_run
/// # use socketwire::{Engine, extract::{Data, SocketRef}};
/// # async fn doc() -> Result<(), Box<dyn std::error::Error>> {
/// let engine = Engine::new();
/// engine.on_connect(|s: SocketRef| println!("connected: {}", s.id()));
/// engine.on("echo", |s: SocketRef, Data(data): Data<serde_json::Value>| {
///     s.emit("echo-reply", &data).ok();
/// })?;
/// let channel = engine.dial("ws://127.0.0.1:3000/socket.io/?EIO=4&transport=websocket").await?;
/// channel.closed().await;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Engine {
    config: Arc<EngineConfig>,
    registry: Arc<HandlerRegistry>,
    tracker: Arc<BackpressureTracker>,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine {
    /// Creates an [`Engine`] with the default config.
    #[inline(always)]
    pub fn new() -> Self {
        EngineBuilder::new().build()
    }

    /// Creates a new [`EngineBuilder`].
    #[inline(always)]
    pub fn builder() -> EngineBuilder {
        EngineBuilder::new()
    }

    /// Creates an [`Engine`] with the given config.
    pub fn with_config(config: EngineConfig) -> Self {
        EngineBuilder::new().with_config(config).build()
    }

    /// The config of this engine.
    #[inline]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The handler registry shared by every channel of this engine.
    #[inline]
    pub fn registry(&self) -> &HandlerRegistry {
        &self.registry
    }

    /// The set of channels whose outbound queue is more than half full.
    #[inline]
    pub fn tracker(&self) -> &BackpressureTracker {
        &self.tracker
    }

    /// The number of channels whose outbound queue is more than half full.
    pub fn overflooded_count(&self) -> usize {
        self.tracker.len()
    }

    /// Registers the handler of the `event` method.
    /// See [`HandlerRegistry::on`].
    pub fn on<H, T>(&self, event: impl Into<Cow<'static, str>>, handler: H) -> Result<(), RegistryError>
    where
        H: MessageHandler<T>,
        T: Send + Sync + 'static,
    {
        self.registry.on(event, handler)
    }

    /// Registers the handler called once the handshake of a channel is done.
    pub fn on_connect<H, T>(&self, handler: H)
    where
        H: ConnectHandler<T>,
        T: Send + Sync + 'static,
    {
        self.registry.on_connect(handler)
    }

    /// Registers the handler called once a channel is closed.
    pub fn on_disconnect<H, T>(&self, handler: H)
    where
        H: DisconnectHandler<T>,
        T: Send + Sync + 'static,
    {
        self.registry.on_disconnect(handler)
    }

    /// Starts a client channel over `transport`.
    ///
    /// The channel waits for the open packet of the peer, then calls the
    /// connect handler. Must be called from a tokio runtime.
    pub fn connect(&self, transport: impl Transport) -> Arc<Channel> {
        let channel = self.channel(transport, Role::Client, RemoteInfo::default());
        channel.start();
        channel
    }

    /// Starts a server channel over `transport`.
    ///
    /// The local id of the channel becomes the session id, and the open packet is written before
    /// anything else, with the ping parameters of the transport. The connect
    /// handler is called right away. Must be called from a tokio runtime.
    pub fn accept(&self, transport: impl Transport, remote: RemoteInfo) -> Result<Arc<Channel>, SendError> {
        let (interval, timeout) = transport.ping_params();
        let channel = self.channel(transport, Role::Server, remote);
        let header = OpenHeader::new(channel.local_id().to_string(), interval, timeout);
        channel.handshake(header)?;
        channel.start();

        #[cfg(feature = "tracing")]
        tracing::debug!("[sid={}] accepted session {}", channel.local_id(), channel.id());
        Ok(channel)
    }

    /// Connects a websocket to `url` with the default [`WsConfig`] and starts
    /// a client channel over it.
    pub async fn dial(&self, url: &str) -> Result<Arc<Channel>, TransportError> {
        self.dial_with(url, WsConfig::default()).await
    }

    /// Connects a websocket to `url` and starts a client channel over it.
    pub async fn dial_with(&self, url: &str, config: WsConfig) -> Result<Arc<Channel>, TransportError> {
        let transport = WsTransport::connect(url, config).await?;
        Ok(self.connect(transport))
    }

    fn channel(&self, transport: impl Transport, role: Role, remote: RemoteInfo) -> Arc<Channel> {
        Channel::new(
            Box::new(transport),
            role,
            remote,
            self.registry.clone(),
            self.tracker.clone(),
            self.config.clone(),
        )
    }
}

impl fmt::Debug for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("config", &self.config)
            .field("registry", &self.registry)
            .field("overflooded", &self.tracker.len())
            .finish()
    }
}
