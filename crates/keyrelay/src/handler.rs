//! Per-connection handler.
//!
//! Each accepted connection gets its own Tokio task running this handler:
//!   1. Run the handshake → verified identity
//!   2. Register the session and start its loops
//!   3. Wait for the session to tear down

use std::sync::Arc;

use keyrelay_auth::{SignatureVerifier, UserDirectory};
use keyrelay_protocol::JsonCodec;
use keyrelay_session::Session;
use keyrelay_transport::Connection;

use crate::RelayError;
use crate::server::ServerState;

/// Handles a single connection from accept to close.
pub(crate) async fn handle_connection<C, D, V>(
    conn: C,
    state: Arc<ServerState<D, V>>,
) -> Result<(), RelayError>
where
    C: Connection,
    D: UserDirectory,
    V: SignatureVerifier,
{
    let session = Session::new(conn, state.config.clone());
    let conn_id = session.connection_id();

    let identity = session
        .authenticate(&state.directory, &state.verifier)
        .await?;

    let live = session
        .establish(identity, Arc::clone(&state.registry), JsonCodec)
        .await?;
    tracing::info!(%conn_id, user_id = %live.handle().user_id(), "session established");

    live.wait().await;
    Ok(())
}
