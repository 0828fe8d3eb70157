//! In-process duplex connections.
//!
//! [`pair`] returns a server-side [`MemoryConnection`] that implements
//! [`Connection`] and the [`MemoryPeer`] that plays the remote client.
//! Frames travel over unbounded tokio channels, so nothing here ever
//! touches a socket.

use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::{Mutex, mpsc, watch};

use crate::{Connection, ConnectionId, TransportError};

/// One frame as seen by the peer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Text(String),
    Binary(Vec<u8>),
    Close,
}

impl Frame {
    /// Returns the text payload, if this is a text frame.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }
}

/// Creates a connected (server side, client side) pair.
pub fn pair() -> (MemoryConnection, MemoryPeer) {
    let (to_server, from_peer) = mpsc::unbounded_channel();
    let (to_peer, from_server) = mpsc::unbounded_channel();
    let conn = MemoryConnection {
        id: ConnectionId::next(),
        inbound: Mutex::new(from_peer),
        outbound: to_peer,
        closed: watch::Sender::new(false),
        close_calls: AtomicUsize::new(0),
    };
    let peer = MemoryPeer {
        outbound: to_server,
        inbound: from_server,
    };
    (conn, peer)
}

/// Server side of an in-process connection.
pub struct MemoryConnection {
    id: ConnectionId,
    inbound: Mutex<mpsc::UnboundedReceiver<Frame>>,
    outbound: mpsc::UnboundedSender<Frame>,
    closed: watch::Sender<bool>,
    close_calls: AtomicUsize,
}

impl MemoryConnection {
    /// Returns `true` once [`close`](Connection::close) has been called.
    pub fn is_closed(&self) -> bool {
        *self.closed.borrow()
    }

    /// How many times `close` was invoked, including no-op repeats.
    pub fn close_calls(&self) -> usize {
        self.close_calls.load(Ordering::SeqCst)
    }

    fn push(&self, frame: Frame) -> Result<(), TransportError> {
        if self.is_closed() {
            return Err(TransportError::ConnectionClosed(
                "closed locally".into(),
            ));
        }
        self.outbound
            .send(frame)
            .map_err(|_| TransportError::ConnectionClosed("peer dropped".into()))
    }
}

impl Connection for MemoryConnection {
    type Error = TransportError;

    async fn send_text(&self, text: &str) -> Result<(), Self::Error> {
        self.push(Frame::Text(text.to_owned()))
    }

    async fn recv(&self) -> Result<Option<Vec<u8>>, Self::Error> {
        let mut closed = self.closed.subscribe();
        let mut inbound = self.inbound.lock().await;
        tokio::select! {
            biased;
            // Resolves at once if already closed; errs only if the sender is gone.
            _ = closed.wait_for(|closed| *closed) => Ok(None),
            frame = inbound.recv() => Ok(match frame {
                Some(Frame::Text(text)) => Some(text.into_bytes()),
                Some(Frame::Binary(data)) => Some(data),
                Some(Frame::Close) | None => None,
            }),
        }
    }

    async fn close(&self) -> Result<(), Self::Error> {
        self.close_calls.fetch_add(1, Ordering::SeqCst);
        if self.closed.send_replace(true) {
            return Ok(());
        }
        // The peer may already be gone; that still counts as closed.
        let _ = self.outbound.send(Frame::Close);
        Ok(())
    }

    fn id(&self) -> ConnectionId {
        self.id
    }
}

/// Client side of an in-process connection.
pub struct MemoryPeer {
    outbound: mpsc::UnboundedSender<Frame>,
    inbound: mpsc::UnboundedReceiver<Frame>,
}

impl MemoryPeer {
    /// Sends a text frame to the server side.
    pub fn send_text(&self, text: &str) {
        let _ = self.outbound.send(Frame::Text(text.to_owned()));
    }

    /// Sends a binary frame to the server side.
    pub fn send_binary(&self, data: &[u8]) {
        let _ = self.outbound.send(Frame::Binary(data.to_vec()));
    }

    /// Sends a close frame; the server's next `recv` yields `None`.
    pub fn close(&self) {
        let _ = self.outbound.send(Frame::Close);
    }

    /// Waits for the next frame written by the server side.
    ///
    /// Returns `None` once the server side has been dropped and every
    /// buffered frame was read.
    pub async fn recv(&mut self) -> Option<Frame> {
        self.inbound.recv().await
    }

    /// Waits for the next frame and returns it as text.
    ///
    /// Returns `None` for a close frame, a binary frame, or a dropped
    /// server side.
    pub async fn recv_text(&mut self) -> Option<String> {
        match self.recv().await? {
            Frame::Text(text) => Some(text),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_pair_delivers_frames_both_ways() {
        let (conn, mut peer) = pair();

        peer.send_text("hello");
        let got = conn.recv().await.unwrap().unwrap();
        assert_eq!(got, b"hello");

        conn.send_text("world").await.unwrap();
        assert_eq!(peer.recv().await, Some(Frame::Text("world".into())));
    }

    #[tokio::test]
    async fn test_close_is_idempotent_and_notifies_peer_once() {
        let (conn, mut peer) = pair();

        conn.close().await.unwrap();
        conn.close().await.unwrap();

        assert!(conn.is_closed());
        assert_eq!(conn.close_calls(), 2);
        assert_eq!(peer.recv().await, Some(Frame::Close));
        drop(conn);
        assert_eq!(peer.recv().await, None);
    }

    #[tokio::test]
    async fn test_close_unblocks_pending_recv() {
        let (conn, _peer) = pair();
        let conn = std::sync::Arc::new(conn);

        let reader = {
            let conn = std::sync::Arc::clone(&conn);
            tokio::spawn(async move { conn.recv().await })
        };
        tokio::task::yield_now().await;
        conn.close().await.unwrap();

        let result = reader.await.unwrap().unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_send_after_peer_dropped_fails() {
        let (conn, peer) = pair();
        drop(peer);

        let err = conn.send_text("anyone?").await.unwrap_err();
        assert!(err.is_closed());
    }

    #[tokio::test]
    async fn test_peer_close_yields_none() {
        let (conn, peer) = pair();
        peer.close();
        assert!(conn.recv().await.unwrap().is_none());
    }
}
