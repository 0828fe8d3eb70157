//! `RelayServer` builder and accept loop.
//!
//! This is the entry point for running a relay. It ties the layers
//! together: transport → session → registry.

use std::sync::Arc;

use keyrelay_auth::{SignatureVerifier, UserDirectory};
use keyrelay_session::{ConnectionRegistry, SessionConfig};
use keyrelay_transport::{Connection, Transport, WebSocketTransport};

use crate::handler::handle_connection;
use crate::{RelayConfig, RelayError};

/// Shared server state passed to each connection task.
pub(crate) struct ServerState<D, V> {
    pub(crate) directory: D,
    pub(crate) verifier: V,
    pub(crate) registry: Arc<ConnectionRegistry>,
    pub(crate) config: SessionConfig,
}

/// Builder for configuring and starting a relay.
///
/// # Example
///
/// ```rust,no_run
/// use keyrelay::prelude::*;
///
/// # async fn run() -> Result<(), RelayError> {
/// let server = RelayServer::builder()
///     .bind("0.0.0.0:8080")
///     .build(MemoryDirectory::new(), PgpVerifier)
///     .await?;
/// server.run().await
/// # }
/// ```
pub struct RelayServerBuilder {
    bind_addr: String,
    session_config: SessionConfig,
}

impl RelayServerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self::from_config(&RelayConfig::default())
    }

    /// Starts from the listener and session settings of `config`.
    pub fn from_config(config: &RelayConfig) -> Self {
        Self {
            bind_addr: config.bind_addr.clone(),
            session_config: config.session.clone(),
        }
    }

    /// Sets the address to bind the server to.
    pub fn bind(mut self, addr: &str) -> Self {
        self.bind_addr = addr.to_string();
        self
    }

    pub fn session_config(mut self, config: SessionConfig) -> Self {
        self.session_config = config;
        self
    }

    /// Binds the listener. Connections are not accepted until
    /// [`RelayServer::run`].
    pub async fn build<D, V>(
        self,
        directory: D,
        verifier: V,
    ) -> Result<RelayServer<D, V>, RelayError>
    where
        D: UserDirectory,
        V: SignatureVerifier,
    {
        let transport = WebSocketTransport::bind(&self.bind_addr).await?;

        let state = Arc::new(ServerState {
            directory,
            verifier,
            registry: Arc::new(ConnectionRegistry::new()),
            config: self.session_config,
        });

        Ok(RelayServer { transport, state })
    }
}

impl Default for RelayServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A bound relay. Call [`run()`](Self::run) to start accepting connections.
pub struct RelayServer<D, V> {
    transport: WebSocketTransport,
    state: Arc<ServerState<D, V>>,
}

impl RelayServer<(), ()> {
    /// Creates a new builder.
    pub fn builder() -> RelayServerBuilder {
        RelayServerBuilder::new()
    }
}

impl<D, V> RelayServer<D, V>
where
    D: UserDirectory,
    V: SignatureVerifier,
{
    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.transport.local_addr()
    }

    /// The registry of live sessions, for routing messages to them.
    pub fn registry(&self) -> Arc<ConnectionRegistry> {
        Arc::clone(&self.state.registry)
    }

    pub fn directory(&self) -> &D {
        &self.state.directory
    }

    /// Runs the accept loop.
    ///
    /// Every accepted connection gets its own task, which runs the
    /// handshake and then the session. Per-connection failures never stop
    /// the loop. Runs until the process is terminated.
    pub async fn run(mut self) -> Result<(), RelayError> {
        tracing::info!(addr = ?self.local_addr().ok(), "relay running");

        loop {
            match self.transport.accept().await {
                Ok(conn) => {
                    tracing::debug!(
                        conn_id = %conn.id(),
                        peer = %conn.peer_addr(),
                        "connection accepted"
                    );
                    let state = Arc::clone(&self.state);
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(conn, state).await {
                            tracing::debug!(error = %e, "connection ended with error");
                        }
                    });
                }
                Err(e) => {
                    tracing::error!(error = %e, "accept failed");
                }
            }
        }
    }
}
