//! Websocket transport built on `tokio-tungstenite`.
//!
//! The stream is split in a sink and a stream half, each behind its own async
//! mutex, so reading and writing never wait on each other.
use std::{sync::Arc, time::Duration};

use bytes::Bytes;
use futures_util::{
    SinkExt, StreamExt,
    stream::{SplitSink, SplitStream},
};
use http::HeaderMap;
use tokio::{
    io::{AsyncRead, AsyncWrite},
    net::TcpStream,
    sync::{Mutex, watch},
};
use tokio_tungstenite::{
    MaybeTlsStream, WebSocketStream,
    tungstenite::{
        Message,
        handshake::server::{ErrorResponse, Request, Response},
    },
};

use super::{Frame, Transport, TransportError, wait_closed};
use crate::{channel::RemoteInfo, config::ProtocolVersion};

/// How long a best effort close frame may take to be written.
const CLOSE_FRAME_TIMEOUT: Duration = Duration::from_secs(1);

/// Configuration of a [`WsTransport`].
#[derive(Debug, Clone)]
pub struct WsConfig {
    /// The heartbeat interval reported by [`Transport::ping_params`].
    ///
    /// Defaults to 30 seconds.
    pub ping_interval: Duration,
    /// The heartbeat timeout reported by [`Transport::ping_params`].
    ///
    /// Defaults to 60 seconds.
    pub ping_timeout: Duration,
    /// The read deadline. A peer that stays silent longer closes the transport.
    ///
    /// Defaults to 60 seconds.
    pub receive_timeout: Duration,
    /// The write deadline of a single frame.
    ///
    /// Defaults to 60 seconds.
    pub send_timeout: Duration,
}

impl Default for WsConfig {
    fn default() -> Self {
        Self {
            ping_interval: Duration::from_secs(30),
            ping_timeout: Duration::from_secs(60),
            receive_timeout: Duration::from_secs(60),
            send_timeout: Duration::from_secs(60),
        }
    }
}

/// A [`Transport`] over a websocket connection.
pub struct WsTransport<S> {
    sink: Arc<Mutex<SplitSink<WebSocketStream<S>, Message>>>,
    stream: Mutex<SplitStream<WebSocketStream<S>>>,
    closed: watch::Sender<bool>,
    config: WsConfig,
}

impl<S> WsTransport<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    /// Wraps an established websocket connection.
    pub fn new(ws: WebSocketStream<S>, config: WsConfig) -> Self {
        let (sink, stream) = ws.split();
        Self {
            sink: Arc::new(Mutex::new(sink)),
            stream: Mutex::new(stream),
            closed: watch::Sender::new(false),
            config,
        }
    }

    /// Whether [`Transport::close`] was called.
    pub fn is_closed(&self) -> bool {
        *self.closed.borrow()
    }

    async fn write(&self, msg: Message) -> Result<(), TransportError> {
        let closed = wait_closed(self.closed.subscribe());
        tokio::pin!(closed);
        let mut sink = tokio::select! {
            biased;
            _ = &mut closed => return Err(TransportError::Closed),
            sink = self.sink.lock() => sink,
        };
        tokio::select! {
            biased;
            _ = &mut closed => Err(TransportError::Closed),
            res = tokio::time::timeout(self.config.send_timeout, sink.send(msg)) => {
                res.map_err(|_| TransportError::Timeout)?.map_err(TransportError::from)
            }
        }
    }
}

impl WsTransport<MaybeTlsStream<TcpStream>> {
    /// Dials `url` and performs the websocket handshake.
    pub async fn connect(url: &str, config: WsConfig) -> Result<Self, TransportError> {
        let (ws, _res) = tokio_tungstenite::connect_async(url).await?;
        Ok(Self::new(ws, config))
    }
}

/// Performs the server side websocket handshake on an accepted tcp stream.
///
/// The peer address and the handshake request headers are returned as a
/// [`RemoteInfo`] to hand to [`Engine::accept`](crate::Engine::accept).
pub async fn accept(
    stream: TcpStream,
    config: WsConfig,
) -> Result<(WsTransport<TcpStream>, RemoteInfo), TransportError> {
    let addr = stream.peer_addr().ok();
    let mut headers = HeaderMap::new();
    let ws = tokio_tungstenite::accept_hdr_async(stream, |req: &Request, res: Response| {
        headers = req.headers().clone();
        Ok::<_, ErrorResponse>(res)
    })
    .await?;
    Ok((WsTransport::new(ws, config), RemoteInfo { addr, headers }))
}

/// Builds the websocket url of a socket.io endpoint.
///
/// ```
/// # use socketwire::{ProtocolVersion, transport::ws::get_url};
/// assert_eq!(
///     get_url("localhost", 3000, false, ProtocolVersion::V3),
///     "ws://localhost:3000/socket.io/?EIO=3&transport=websocket"
/// );
/// ```
pub fn get_url(host: &str, port: u16, secure: bool, protocol: ProtocolVersion) -> String {
    let scheme = if secure { "wss" } else { "ws" };
    format!(
        "{scheme}://{host}:{port}/socket.io/?EIO={}&transport=websocket",
        protocol.as_str()
    )
}

impl<S> Transport for WsTransport<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    async fn recv(&self) -> Result<Frame, TransportError> {
        let closed = wait_closed(self.closed.subscribe());
        tokio::pin!(closed);
        let mut stream = tokio::select! {
            biased;
            _ = &mut closed => return Err(TransportError::Closed),
            stream = self.stream.lock() => stream,
        };
        loop {
            let next = tokio::select! {
                biased;
                _ = &mut closed => return Err(TransportError::Closed),
                next = tokio::time::timeout(self.config.receive_timeout, stream.next()) => next,
            };
            match next.map_err(|_| TransportError::Timeout)? {
                None | Some(Ok(Message::Close(_))) => return Err(TransportError::Closed),
                Some(Err(e)) => return Err(e.into()),
                Some(Ok(Message::Text(text))) => return Ok(Frame::Text(text.as_str().to_owned())),
                Some(Ok(Message::Binary(data))) => return Ok(Frame::Binary(data)),
                // websocket level ping/pong are answered by tungstenite itself
                Some(Ok(_)) => continue,
            }
        }
    }

    async fn send_text(&self, text: String) -> Result<(), TransportError> {
        self.write(Message::Text(text.into())).await
    }

    async fn send_binary(&self, data: Bytes) -> Result<(), TransportError> {
        self.write(Message::Binary(data)).await
    }

    fn close(&self) {
        if self.closed.send_replace(true) {
            return;
        }
        let sink = self.sink.clone();
        if let Ok(rt) = tokio::runtime::Handle::try_current() {
            rt.spawn(async move {
                let mut sink = sink.lock().await;
                let _ = tokio::time::timeout(CLOSE_FRAME_TIMEOUT, sink.close()).await;
            });
        }
    }

    fn ping_params(&self) -> (Duration, Duration) {
        (self.config.ping_interval, self.config.ping_timeout)
    }
}
