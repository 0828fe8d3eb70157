//! A session: one connection from upgrade to teardown.
//!
//! ```text
//! Session::new ──→ authenticate() ──→ establish() ──→ EstablishedSession
//!  [Connecting]     [Authenticating]   [Authenticated]        │
//!                         │                                   │ either loop ends
//!                         ▼                                   ▼
//!                      [Closed] ←──────────────────────── teardown()
//! ```
//!
//! Once established, two tasks run per session:
//!
//! - the **inbound loop** reads frames until the peer goes away;
//! - the **outbound loop** drains the mailbox into the transport.
//!
//! They share nothing but the [`SessionCore`]: the connection, the
//! handle (whose closed flag both watch) and the one-shot teardown.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use keyrelay_auth::{Identity, SignatureVerifier, UserDirectory};
use keyrelay_protocol::{Codec, notice};
use keyrelay_transport::{Connection, ConnectionId};
use tokio::task::JoinHandle;

use crate::handshake::Handshake;
use crate::mailbox::{MailboxReceiver, mailbox};
use crate::state::StateCell;
use crate::{
    ConnectionRegistry, HandshakeError, SessionConfig, SessionError, SessionHandle,
    SessionState,
};

/// A connection that has been accepted but not yet authenticated.
pub struct Session<C> {
    conn: Arc<C>,
    state: Arc<StateCell>,
    config: SessionConfig,
}

impl<C: Connection> Session<C> {
    /// Wraps a freshly upgraded connection. The session starts in
    /// [`SessionState::Connecting`].
    pub fn new(conn: C, config: SessionConfig) -> Self {
        Self {
            conn: Arc::new(conn),
            state: Arc::new(StateCell::new()),
            config,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state.get()
    }

    pub fn connection_id(&self) -> ConnectionId {
        self.conn.id()
    }

    /// The underlying connection. Only the session writes to it.
    pub fn connection(&self) -> &Arc<C> {
        &self.conn
    }

    /// Runs the handshake and returns the verified identity.
    ///
    /// On failure the peer is sent the rejection notice (if the error has
    /// one), the connection is closed and the session ends in
    /// [`SessionState::Closed`].
    pub async fn authenticate<D, V>(
        &self,
        directory: &D,
        verifier: &V,
    ) -> Result<Identity, HandshakeError>
    where
        D: UserDirectory,
        V: SignatureVerifier,
    {
        self.state.transition(SessionState::Authenticating)?;
        let conn_id = self.conn.id();

        let result = Handshake::new(directory, verifier, &self.config)
            .run(&*self.conn)
            .await;

        match result {
            Ok(identity) => {
                tracing::info!(
                    %conn_id,
                    user_id = %identity.id,
                    username = %identity.username,
                    "handshake succeeded"
                );
                Ok(identity)
            }
            Err(e) => {
                tracing::warn!(%conn_id, error = %e, "handshake rejected");
                self.reject(&e).await;
                Err(e)
            }
        }
    }

    async fn reject(&self, err: &HandshakeError) {
        if let Some(text) = err.notice() {
            // Best effort: the peer may already be gone.
            if let Err(e) = self.conn.send_text(text).await {
                tracing::debug!(conn_id = %self.conn.id(), error = %e, "failed to send notice");
            }
        }
        if let Err(e) = self.conn.close().await {
            tracing::debug!(conn_id = %self.conn.id(), error = %e, "close failed");
        }
        let _ = self.state.transition(SessionState::Closed);
    }

    /// Registers the authenticated session and starts its loops.
    ///
    /// The previous session of the same user, if any, is closed. The peer
    /// receives the sign-in acknowledgment and then the greeting before
    /// any mailbox message.
    ///
    /// # Errors
    /// - [`SessionError::Transition`] unless the session is authenticating
    /// - [`SessionError::Transport`] if the acknowledgment cannot be
    ///   written; the session is torn down
    pub async fn establish<K: Codec>(
        self,
        identity: Identity,
        registry: Arc<ConnectionRegistry>,
        codec: K,
    ) -> Result<EstablishedSession, SessionError> {
        if let Err(e) = self.state.transition(SessionState::Authenticated) {
            let _ = self.conn.close().await;
            let _ = self.state.transition(SessionState::Closed);
            return Err(e.into());
        }

        let (mailbox, rx) = mailbox(self.config.mailbox_capacity);
        let handle = SessionHandle::new(&identity, self.conn.id(), mailbox);

        if let Some(previous) = registry.add(handle.clone()).await {
            tracing::info!(
                user_id = %identity.id,
                previous = %previous.connection_id(),
                "replacing existing session"
            );
            previous.close();
        }

        let core = Arc::new(SessionCore {
            conn: self.conn,
            registry,
            handle: handle.clone(),
            state: Arc::clone(&self.state),
            torn_down: AtomicBool::new(false),
        });

        for text in [notice::SIGNED_IN, self.config.greeting.as_str()] {
            if let Err(e) = core.conn.send_text(text).await {
                core.teardown().await;
                return Err(SessionError::Transport(Box::new(e)));
            }
        }

        let inbound = tokio::spawn(inbound_loop(Arc::clone(&core)));
        let outbound = tokio::spawn(outbound_loop(core, rx, codec));

        Ok(EstablishedSession {
            handle,
            state: self.state,
            inbound,
            outbound,
        })
    }
}

/// A live session whose loops are running.
#[derive(Debug)]
pub struct EstablishedSession {
    handle: SessionHandle,
    state: Arc<StateCell>,
    inbound: JoinHandle<()>,
    outbound: JoinHandle<()>,
}

impl EstablishedSession {
    /// The handle stored in the registry for this session.
    pub fn handle(&self) -> &SessionHandle {
        &self.handle
    }

    pub fn state(&self) -> SessionState {
        self.state.get()
    }

    /// Waits until both loops have exited and teardown has finished.
    pub async fn wait(self) {
        let user_id = self.handle.user_id();
        for (name, task) in [("inbound", self.inbound), ("outbound", self.outbound)] {
            if let Err(e) = task.await {
                tracing::error!(%user_id, task = name, error = %e, "session task failed");
            }
        }
    }
}

/// State shared by the two loops of one session.
struct SessionCore<C> {
    conn: Arc<C>,
    registry: Arc<ConnectionRegistry>,
    handle: SessionHandle,
    state: Arc<StateCell>,
    torn_down: AtomicBool,
}

impl<C: Connection> SessionCore<C> {
    /// Releases everything the session holds. Only the first call does
    /// any work; later and concurrent calls return immediately.
    async fn teardown(&self) {
        if self.torn_down.swap(true, Ordering::AcqRel) {
            return;
        }
        let conn_id = self.conn.id();
        let user_id = self.handle.user_id();

        // Deregister while still Authenticated, then close.
        self.registry.remove_session(&self.handle).await;
        self.handle.close();
        self.handle.mailbox().close();
        if let Err(e) = self.conn.close().await {
            tracing::debug!(%conn_id, error = %e, "close failed");
        }
        let _ = self.state.transition(SessionState::Closed);

        tracing::info!(%conn_id, %user_id, "session closed");
    }
}

/// Tears the session down if a loop exits without doing so itself, e.g.
/// on panic or when the runtime drops the task.
struct TeardownGuard<C: Connection>(Arc<SessionCore<C>>);

impl<C: Connection> Drop for TeardownGuard<C> {
    fn drop(&mut self) {
        if self.0.torn_down.load(Ordering::Acquire) {
            return;
        }
        if let Ok(runtime) = tokio::runtime::Handle::try_current() {
            let core = Arc::clone(&self.0);
            runtime.spawn(async move { core.teardown().await });
        }
    }
}

async fn inbound_loop<C: Connection>(core: Arc<SessionCore<C>>) {
    let _guard = TeardownGuard(Arc::clone(&core));
    let conn_id = core.conn.id();
    let user_id = core.handle.user_id();

    loop {
        tokio::select! {
            frame = core.conn.recv() => match frame {
                Ok(Some(data)) => {
                    // Not relayed anywhere yet.
                    tracing::debug!(%conn_id, %user_id, bytes = data.len(), "inbound frame");
                }
                Ok(None) => {
                    tracing::debug!(%conn_id, %user_id, "peer closed connection");
                    break;
                }
                Err(e) => {
                    tracing::debug!(%conn_id, %user_id, error = %e, "recv failed");
                    break;
                }
            },
            () = core.handle.closed() => break,
        }
    }

    core.teardown().await;
}

async fn outbound_loop<C: Connection, K: Codec>(
    core: Arc<SessionCore<C>>,
    mut rx: MailboxReceiver,
    codec: K,
) {
    let _guard = TeardownGuard(Arc::clone(&core));
    let conn_id = core.conn.id();

    loop {
        let msg = tokio::select! {
            msg = rx.recv() => match msg {
                Some(msg) => msg,
                None => break,
            },
            () = core.handle.closed() => break,
        };

        let text = match codec.encode_text(&msg) {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!(%conn_id, error = %e, "dropping unencodable message");
                continue;
            }
        };
        // A peer that stopped reading must not keep a closed session alive.
        let sent = tokio::select! {
            sent = core.conn.send_text(&text) => sent,
            () = core.handle.closed() => break,
        };
        if let Err(e) = sent {
            tracing::debug!(%conn_id, error = %e, "send failed");
            break;
        }
    }

    core.teardown().await;
}
