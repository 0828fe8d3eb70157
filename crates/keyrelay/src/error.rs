//! Unified error type for the relay.

use std::path::PathBuf;

use keyrelay_auth::registration::RegistrationError;
use keyrelay_session::{HandshakeError, SessionError};
use keyrelay_transport::TransportError;

/// Top-level error that wraps all crate-specific errors.
///
/// The `#[from]` attributes let `?` convert sub-crate errors.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    /// Binding, accepting, or talking to a connection failed.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The peer could not prove its identity.
    #[error(transparent)]
    Handshake(#[from] HandshakeError),

    /// An authenticated session could not be started.
    #[error(transparent)]
    Session(#[from] SessionError),

    /// A configured user could not be added to the directory.
    #[error(transparent)]
    Registration(#[from] RegistrationError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Errors loading a [`RelayConfig`](crate::RelayConfig).
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_transport_error() {
        let err = TransportError::ConnectionClosed("gone".into());
        let relay_err: RelayError = err.into();
        assert!(matches!(relay_err, RelayError::Transport(_)));
        assert!(relay_err.to_string().contains("gone"));
    }

    #[test]
    fn test_from_handshake_error() {
        let relay_err: RelayError = HandshakeError::UnknownUser.into();
        assert!(matches!(relay_err, RelayError::Handshake(_)));
        assert_eq!(relay_err.to_string(), "unknown user");
    }

    #[test]
    fn test_from_session_error() {
        let relay_err: RelayError = SessionError::MailboxFull.into();
        assert!(matches!(relay_err, RelayError::Session(_)));
    }

    #[test]
    fn test_from_registration_error() {
        let relay_err: RelayError = RegistrationError::UsernameTooShort.into();
        assert!(matches!(relay_err, RelayError::Registration(_)));
    }

    #[test]
    fn test_config_read_error_names_the_file() {
        let err = ConfigError::Read {
            path: PathBuf::from("/nope/relay.toml"),
            source: std::io::Error::from(std::io::ErrorKind::NotFound),
        };
        assert!(err.to_string().contains("/nope/relay.toml"));
    }
}
