//! Rules for registering a new identity.
//!
//! HTTP routing is left to whatever server fronts the relay; this module
//! owns the request format and the checks, and maps every rejection to
//! the status code the endpoint should answer with. The public key must be
//! an armored OpenPGP public key; [`register`] refuses anything else.
//!
//! ```rust
//! use keyrelay_auth::registration::parse_register_request;
//!
//! let body = br#"{"username":"alice_w","public_key":"..."}"#;
//! let request = parse_register_request(Some("application/json"), body).unwrap();
//! assert_eq!(request.username, "alice_w");
//!
//! let err = parse_register_request(Some("text/plain"), body).unwrap_err();
//! assert_eq!(err.status_code(), 415);
//! ```

use serde::Deserialize;

use crate::{DirectoryError, Identity, UserDirectory, VerifyError, parse_public_key};

/// Largest accepted request body.
pub const MAX_BODY_BYTES: usize = 1024 * 1024;

/// Shortest accepted username, in characters.
pub const MIN_USERNAME_LEN: usize = 6;

/// Body of a registration request.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegisterRequest {
    pub username: String,
    pub public_key: String,
}

/// Reasons a registration is refused.
#[derive(Debug, thiserror::Error)]
pub enum RegistrationError {
    #[error("Content-Type header is not application/json")]
    UnsupportedMediaType,

    #[error("request body exceeds {} bytes", MAX_BODY_BYTES)]
    BodyTooLarge,

    #[error("invalid request body: {0}")]
    InvalidBody(#[from] serde_json::Error),

    #[error("username too short, must be at least {} characters", MIN_USERNAME_LEN)]
    UsernameTooShort,

    #[error("invalid public key: {0}")]
    InvalidPublicKey(VerifyError),

    #[error("username already taken")]
    UsernameTaken,

    #[error("failed to save user: {0}")]
    Directory(DirectoryError),
}

impl RegistrationError {
    /// The HTTP status code an endpoint should answer with.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::UnsupportedMediaType => 415,
            Self::BodyTooLarge => 413,
            Self::InvalidBody(_) | Self::UsernameTooShort | Self::InvalidPublicKey(_) => 400,
            Self::UsernameTaken => 409,
            Self::Directory(_) => 500,
        }
    }
}

impl From<DirectoryError> for RegistrationError {
    fn from(e: DirectoryError) -> Self {
        match e {
            DirectoryError::UsernameTaken(_) => Self::UsernameTaken,
            other => Self::Directory(other),
        }
    }
}

/// Validates the transport-level parts of a request and decodes the body.
///
/// A missing `Content-Type` is accepted; otherwise its media type must be
/// `application/json` (parameters such as `charset` are ignored).
pub fn parse_register_request(
    content_type: Option<&str>,
    body: &[u8],
) -> Result<RegisterRequest, RegistrationError> {
    if let Some(content_type) = content_type {
        let media_type = content_type.split(';').next().unwrap_or("").trim();
        if !media_type.eq_ignore_ascii_case("application/json") {
            return Err(RegistrationError::UnsupportedMediaType);
        }
    }
    if body.len() > MAX_BODY_BYTES {
        return Err(RegistrationError::BodyTooLarge);
    }
    Ok(serde_json::from_slice(body)?)
}

/// Applies the registration rules and stores the new identity.
pub async fn register<D: UserDirectory>(
    directory: &D,
    request: RegisterRequest,
) -> Result<Identity, RegistrationError> {
    if request.username.chars().count() < MIN_USERNAME_LEN {
        return Err(RegistrationError::UsernameTooShort);
    }
    parse_public_key(&request.public_key).map_err(RegistrationError::InvalidPublicKey)?;
    if directory.lookup(&request.username).await?.is_some() {
        return Err(RegistrationError::UsernameTaken);
    }
    Ok(directory
        .create(&request.username, &request.public_key)
        .await?)
}
