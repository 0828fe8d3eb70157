//! Handshake challenges.

use std::fmt;

use rand::Rng;

/// A fresh, unguessable value the client must sign during the handshake.
///
/// 128 bits from the thread-local CSPRNG, rendered as 32 lowercase hex
/// characters so it survives any text transport unchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Challenge(String);

impl Challenge {
    /// Draws a new challenge.
    pub fn generate() -> Self {
        let bytes: [u8; 16] = rand::rng().random();
        Self(bytes.iter().map(|b| format!("{b:02x}")).collect())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns `true` if `cleartext` is this challenge, ignoring
    /// surrounding whitespace a client's signing tool may add.
    pub fn is_answered_by(&self, cleartext: &str) -> bool {
        cleartext.trim() == self.0
    }
}

impl fmt::Display for Challenge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
