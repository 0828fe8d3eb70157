//! WebSocket transport implementation using `tokio-tungstenite`.

use std::net::{Shutdown, SocketAddr};
use std::time::Duration;

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{Mutex, watch};
use tokio_tungstenite::tungstenite::{self, Message};

use crate::{Connection, ConnectionId, Transport, TransportError};

type WsStream = tokio_tungstenite::WebSocketStream<TcpStream>;

/// How long [`WebSocketConnection::close`] waits for the close frame to
/// be written before shutting the socket down.
const CLOSE_TIMEOUT: Duration = Duration::from_secs(1);

/// A WebSocket-based [`Transport`] that listens for incoming connections.
pub struct WebSocketTransport {
    listener: TcpListener,
}

impl WebSocketTransport {
    /// Binds a new WebSocket transport to the given address.
    pub async fn bind(addr: &str) -> Result<Self, TransportError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(TransportError::BindFailed)?;
        tracing::info!(addr, "WebSocket transport listening");
        Ok(Self { listener })
    }

    /// Returns the address the listener is bound to.
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }
}

impl Transport for WebSocketTransport {
    type Connection = WebSocketConnection;
    type Error = TransportError;

    async fn accept(&mut self) -> Result<Self::Connection, Self::Error> {
        let (stream, addr) = self
            .listener
            .accept()
            .await
            .map_err(TransportError::AcceptFailed)?;
        // A second handle on the socket, so close can shut it down even
        // while a stalled write owns the sink.
        let stream = stream.into_std().map_err(TransportError::AcceptFailed)?;
        let socket = stream.try_clone().map_err(TransportError::AcceptFailed)?;
        let stream = TcpStream::from_std(stream).map_err(TransportError::AcceptFailed)?;

        let ws = tokio_tungstenite::accept_async(stream)
            .await
            .map_err(|e| {
                TransportError::AcceptFailed(std::io::Error::new(
                    std::io::ErrorKind::ConnectionRefused,
                    e,
                ))
            })?;

        let id = ConnectionId::next();
        tracing::info!(%id, %addr, "accepted WebSocket connection");

        Ok(WebSocketConnection::new(id, addr, ws, socket))
    }
}

/// A single WebSocket connection.
///
/// The socket is split so the read half and the write half are locked
/// independently: a task parked in [`recv`](Connection::recv) never holds
/// up a concurrent writer. Raising the closed flag wakes both a pending
/// `recv` and a send stuck on a peer that stopped reading.
pub struct WebSocketConnection {
    id: ConnectionId,
    peer_addr: SocketAddr,
    sink: Mutex<SplitSink<WsStream, Message>>,
    stream: Mutex<SplitStream<WsStream>>,
    socket: std::net::TcpStream,
    closed: watch::Sender<bool>,
}

impl WebSocketConnection {
    fn new(
        id: ConnectionId,
        peer_addr: SocketAddr,
        ws: WsStream,
        socket: std::net::TcpStream,
    ) -> Self {
        let (sink, stream) = ws.split();
        Self {
            id,
            peer_addr,
            sink: Mutex::new(sink),
            stream: Mutex::new(stream),
            socket,
            closed: watch::Sender::new(false),
        }
    }

    /// Returns the remote peer's socket address.
    pub fn peer_addr(&self) -> SocketAddr {
        self.peer_addr
    }

    async fn send_message(&self, msg: Message) -> Result<(), TransportError> {
        let closed = self.closed.subscribe();
        if *closed.borrow() {
            return Err(closed_locally());
        }
        let mut sink = tokio::select! {
            sink = self.sink.lock() => sink,
            () = wait_closed(closed.clone()) => return Err(closed_locally()),
        };
        // Dropping the in-flight send releases the sink for `close`.
        tokio::select! {
            result = sink.send(msg) => result.map_err(send_error),
            () = wait_closed(closed) => Err(closed_locally()),
        }
    }
}

impl Connection for WebSocketConnection {
    type Error = TransportError;

    async fn send_text(&self, text: &str) -> Result<(), Self::Error> {
        self.send_message(Message::text(text.to_owned())).await
    }

    async fn recv(&self) -> Result<Option<Vec<u8>>, Self::Error> {
        let closed = self.closed.subscribe();
        let mut stream = self.stream.lock().await;
        loop {
            let msg = tokio::select! {
                msg = stream.next() => msg,
                () = wait_closed(closed.clone()) => return Ok(None),
            };
            match msg {
                Some(Ok(Message::Binary(data))) => {
                    return Ok(Some(data.to_vec()));
                }
                Some(Ok(Message::Text(text))) => {
                    return Ok(Some(text.as_str().as_bytes().to_vec()));
                }
                Some(Ok(Message::Close(_))) | None => return Ok(None),
                Some(Ok(_)) => continue, // skip ping/pong/frame
                Some(Err(e)) => {
                    return Err(TransportError::ReceiveFailed(
                        std::io::Error::new(
                            std::io::ErrorKind::ConnectionReset,
                            e,
                        ),
                    ));
                }
            }
        }
    }

    async fn close(&self) -> Result<(), Self::Error> {
        if self.closed.send_replace(true) {
            return Ok(());
        }
        tracing::debug!(id = %self.id, "closing WebSocket connection");
        let mut sink = self.sink.lock().await;
        match tokio::time::timeout(CLOSE_TIMEOUT, sink.close()).await {
            Ok(Ok(()))
            | Ok(Err(tungstenite::Error::ConnectionClosed))
            | Ok(Err(tungstenite::Error::AlreadyClosed)) => Ok(()),
            Ok(Err(e)) => Err(send_error(e)),
            Err(_) => {
                tracing::debug!(id = %self.id, "close frame not flushed, shutting socket down");
                let _ = self.socket.shutdown(Shutdown::Both);
                Ok(())
            }
        }
    }

    fn id(&self) -> ConnectionId {
        self.id
    }
}

/// Resolves once the closed flag is raised.
async fn wait_closed(mut closed: watch::Receiver<bool>) {
    if closed.wait_for(|closed| *closed).await.is_err() {
        // The sender lives as long as the connection.
        std::future::pending::<()>().await;
    }
}

fn closed_locally() -> TransportError {
    TransportError::ConnectionClosed("closed locally".into())
}

fn send_error(e: tungstenite::Error) -> TransportError {
    match e {
        tungstenite::Error::ConnectionClosed
        | tungstenite::Error::AlreadyClosed => {
            TransportError::ConnectionClosed(e.to_string())
        }
        other => TransportError::SendFailed(std::io::Error::new(
            std::io::ErrorKind::BrokenPipe,
            other,
        )),
    }
}
