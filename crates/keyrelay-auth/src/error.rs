//! Error types for the auth layer.

/// Errors a [`SignatureVerifier`](crate::SignatureVerifier) reports
/// instead of a verdict.
///
/// A cryptographically wrong signature is not an error; it is
/// [`Verification::Invalid`](crate::Verification::Invalid).
#[derive(Debug, thiserror::Error)]
pub enum VerifyError {
    /// The stored public key could not be parsed.
    #[error("unusable public key: {0}")]
    InvalidKey(String),

    /// The signed message is not in a format the verifier understands.
    #[error("malformed signed message: {0}")]
    Malformed(String),
}

/// Errors from a [`UserDirectory`](crate::UserDirectory).
#[derive(Debug, thiserror::Error)]
pub enum DirectoryError {
    /// `create` was called with a username that already exists.
    #[error("username {0:?} already taken")]
    UsernameTaken(String),

    /// The backing store could not be reached.
    #[error("directory unavailable: {0}")]
    Unavailable(String),
}
