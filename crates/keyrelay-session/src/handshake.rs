//! The three-message challenge/response handshake.
//!
//! ```text
//! 1. Identify   client → server   <username>
//! 2. Challenge  server → client   <challenge>
//! 3. Verify     client → server   <cleartext-signed challenge>
//! ```
//!
//! Each step waits for the previous one. Any failure ends the handshake;
//! nothing is retried. Sending rejection notices and closing the
//! connection is left to [`Session::authenticate`](crate::Session::authenticate).

use keyrelay_auth::{
    Challenge, Identity, SignatureVerifier, UserDirectory, Verification, VerifyError,
};
use keyrelay_transport::Connection;

use crate::{HandshakeError, SessionConfig};

pub(crate) struct Handshake<'a, D, V> {
    directory: &'a D,
    verifier: &'a V,
    config: &'a SessionConfig,
}

impl<'a, D, V> Handshake<'a, D, V>
where
    D: UserDirectory,
    V: SignatureVerifier,
{
    pub(crate) fn new(directory: &'a D, verifier: &'a V, config: &'a SessionConfig) -> Self {
        Self {
            directory,
            verifier,
            config,
        }
    }

    /// Runs the protocol over `conn` and returns the proven identity.
    pub(crate) async fn run<C: Connection>(&self, conn: &C) -> Result<Identity, HandshakeError> {
        let conn_id = conn.id();

        // --- Step 1: Identify ---
        let frame = self.read(conn, "username").await?;
        // Not UTF-8 means it cannot name anyone.
        let username = String::from_utf8(frame).map_err(|_| HandshakeError::UnknownUser)?;
        let identity = self
            .directory
            .lookup(&username)
            .await?
            .ok_or(HandshakeError::UnknownUser)?;
        tracing::debug!(%conn_id, %username, user_id = %identity.id, "identity claimed");

        // --- Step 2: Challenge ---
        let challenge = Challenge::generate();
        conn.send_text(challenge.as_str())
            .await
            .map_err(|e| HandshakeError::Transport(Box::new(e)))?;

        // --- Step 3: Verify ---
        let reply = self.read(conn, "signed challenge").await?;
        let reply = String::from_utf8(reply)
            .map_err(|_| VerifyError::Malformed("reply is not UTF-8".into()))?;

        match self.verifier.verify(&identity.public_key, &reply)? {
            Verification::Valid { cleartext } => {
                if self.config.require_challenge_binding && !challenge.is_answered_by(&cleartext) {
                    return Err(HandshakeError::ChallengeMismatch);
                }
                Ok(identity)
            }
            Verification::Invalid => Err(HandshakeError::InvalidSignature),
        }
    }

    /// Reads one frame, honoring the handshake timeout.
    async fn read<C: Connection>(
        &self,
        conn: &C,
        step: &'static str,
    ) -> Result<Vec<u8>, HandshakeError> {
        let frame = match self.config.handshake_timeout() {
            Some(limit) => tokio::time::timeout(limit, conn.recv())
                .await
                .map_err(|_| HandshakeError::TimedOut(step))?,
            None => conn.recv().await,
        };
        match frame {
            Ok(Some(data)) => Ok(data),
            Ok(None) => Err(HandshakeError::Disconnected(step)),
            Err(e) => Err(HandshakeError::Transport(Box::new(e))),
        }
    }
}
