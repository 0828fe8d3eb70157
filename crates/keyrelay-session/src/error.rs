//! Error types for the session layer.

use keyrelay_auth::{DirectoryError, VerifyError};
use keyrelay_protocol::notice;

use crate::SessionState;

/// Boxed transport error; sessions are generic over the connection type.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// A state change the session state machine does not allow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("invalid session transition {from} -> {to}")]
pub struct TransitionError {
    pub from: SessionState,
    pub to: SessionState,
}

/// Errors from a live (or establishing) session.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error(transparent)]
    Transition(#[from] TransitionError),

    /// The mailbox already holds `mailbox_capacity` messages. The message
    /// was not enqueued.
    #[error("mailbox full")]
    MailboxFull,

    /// The session is closing or closed; nothing more can be enqueued.
    #[error("mailbox closed")]
    MailboxClosed,

    /// Writing to the transport failed.
    #[error("transport error: {0}")]
    Transport(#[source] BoxError),
}

/// Reasons a handshake ends without an identity.
///
/// Every variant is terminal for the connection.
#[derive(Debug, thiserror::Error)]
pub enum HandshakeError {
    #[error(transparent)]
    Transition(#[from] TransitionError),

    /// The peer closed the connection at the named step.
    #[error("peer disconnected while waiting for {0}")]
    Disconnected(&'static str),

    /// The peer sent nothing within the handshake timeout.
    #[error("timed out waiting for {0}")]
    TimedOut(&'static str),

    #[error("transport error: {0}")]
    Transport(#[source] BoxError),

    #[error("directory lookup failed: {0}")]
    Directory(#[from] DirectoryError),

    /// No identity is registered under the offered username.
    #[error("unknown user")]
    UnknownUser,

    /// The stored key is unusable or the reply could not be parsed.
    #[error(transparent)]
    Verify(#[from] VerifyError),

    /// The reply is well formed but not signed by the stored key.
    #[error("invalid signature")]
    InvalidSignature,

    /// The reply is validly signed, but over something other than the
    /// challenge this connection was issued.
    #[error("signed text does not match the issued challenge")]
    ChallengeMismatch,
}

impl HandshakeError {
    /// The text frame the peer is sent before the connection is closed,
    /// if any.
    ///
    /// Key and parse failures are deliberately silent so no detail about
    /// the stored key leaks to the peer.
    pub fn notice(&self) -> Option<&'static str> {
        match self {
            Self::UnknownUser => Some(notice::USER_NOT_FOUND),
            Self::InvalidSignature | Self::ChallengeMismatch => {
                Some(notice::INVALID_SIGNATURE)
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notice_for_rejections() {
        assert_eq!(HandshakeError::UnknownUser.notice(), Some("user not found"));
        assert_eq!(
            HandshakeError::InvalidSignature.notice(),
            Some("invalid signature")
        );
        assert_eq!(
            HandshakeError::ChallengeMismatch.notice(),
            Some("invalid signature")
        );
    }

    #[test]
    fn test_no_notice_for_key_or_parse_failures() {
        let key = HandshakeError::Verify(VerifyError::InvalidKey("bad".into()));
        let parse = HandshakeError::Verify(VerifyError::Malformed("bad".into()));
        assert_eq!(key.notice(), None);
        assert_eq!(parse.notice(), None);
        assert_eq!(HandshakeError::TimedOut("username").notice(), None);
    }
}
