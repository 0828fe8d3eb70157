//! The narrow seam between the handshake and the cryptography backend.

use crate::VerifyError;

/// Outcome of checking a well-formed signed message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verification {
    /// The signature is valid for the key; `cleartext` is the text that
    /// was signed.
    Valid { cleartext: String },
    /// The message parsed, but the signature does not match the key.
    Invalid,
}

impl Verification {
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid { .. })
    }
}

/// Checks cleartext signatures against armored public keys.
///
/// The handshake only ever sees this trait, so the concrete scheme can be
/// swapped without touching the session state machine. Three outcomes are
/// distinguished: valid, invalid ([`Verification`]), and unusable input
/// ([`VerifyError`]).
///
/// # Example
///
/// ```rust
/// use keyrelay_auth::{SignatureVerifier, Verification, VerifyError};
///
/// /// Trusts any message signed "by" the literal key `trusted`.
/// struct Naive;
///
/// impl SignatureVerifier for Naive {
///     fn verify(&self, key: &str, signed: &str) -> Result<Verification, VerifyError> {
///         if key != "trusted" {
///             return Err(VerifyError::InvalidKey("unknown".into()));
///         }
///         Ok(Verification::Valid { cleartext: signed.to_owned() })
///     }
/// }
///
/// assert!(Naive.verify("trusted", "hi").unwrap().is_valid());
/// ```
pub trait SignatureVerifier: Send + Sync + 'static {
    /// Verifies that `signed_message` carries a valid signature by
    /// `public_key`.
    ///
    /// # Errors
    /// - [`VerifyError::InvalidKey`] if `public_key` cannot be parsed
    /// - [`VerifyError::Malformed`] if `signed_message` cannot be parsed
    fn verify(
        &self,
        public_key: &str,
        signed_message: &str,
    ) -> Result<Verification, VerifyError>;
}

impl<V: SignatureVerifier> SignatureVerifier for std::sync::Arc<V> {
    fn verify(
        &self,
        public_key: &str,
        signed_message: &str,
    ) -> Result<Verification, VerifyError> {
        (**self).verify(public_key, signed_message)
    }
}
