//! Session configuration.

use std::time::Duration;

use keyrelay_protocol::notice;
use serde::{Deserialize, Serialize};

/// Configuration for session behavior. Sensible defaults are provided.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// How long (in seconds) each handshake read may wait for the peer.
    ///
    /// Default: 10 seconds. Set to 0 to wait indefinitely.
    pub handshake_timeout_secs: u64,

    /// How many outbound messages may be pending per session before
    /// further sends are rejected with `MailboxFull`.
    ///
    /// Default: 256. Values below 1 are treated as 1.
    pub mailbox_capacity: usize,

    /// Text frame sent right after the sign-in acknowledgment.
    pub greeting: String,

    /// Whether the signed reply must be exactly the issued challenge.
    ///
    /// Default: `true`. With `false`, any text validly signed by the
    /// user's key is accepted, which lets a captured reply be replayed.
    pub require_challenge_binding: bool,
}

impl SessionConfig {
    /// The handshake read deadline, or `None` if reads never time out.
    pub fn handshake_timeout(&self) -> Option<Duration> {
        (self.handshake_timeout_secs > 0)
            .then(|| Duration::from_secs(self.handshake_timeout_secs))
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            handshake_timeout_secs: 10,
            mailbox_capacity: 256,
            greeting: notice::DEFAULT_GREETING.to_owned(),
            require_challenge_binding: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SessionConfig::default();
        assert_eq!(config.mailbox_capacity, 256);
        assert_eq!(config.greeting, "hi from the server");
        assert_eq!(config.handshake_timeout(), Some(Duration::from_secs(10)));
        assert!(config.require_challenge_binding);
    }

    #[test]
    fn test_zero_timeout_disables_deadline() {
        let config = SessionConfig {
            handshake_timeout_secs: 0,
            ..SessionConfig::default()
        };
        assert_eq!(config.handshake_timeout(), None);
    }
}
