//! Identity and proof-of-key for keyrelay.
//!
//! This crate answers two questions the handshake asks:
//!
//! 1. **Who claims to be connecting?**: [`UserDirectory`] resolves a
//!    username to an [`Identity`] holding an armored public key.
//! 2. **Do they hold the matching private key?**: the server issues a
//!    [`Challenge`], the client returns it cleartext-signed, and a
//!    [`SignatureVerifier`] checks the signature.
//!
//! The shipped verifier is [`PgpVerifier`], which reads OpenPGP armored
//! keys and cleartext signatures. Registration rules for new identities
//! live in [`registration`].

mod challenge;
mod directory;
mod error;
mod identity;
mod openpgp;
mod verifier;

pub mod registration;

pub use challenge::Challenge;
pub use directory::{MemoryDirectory, UserDirectory};
pub use error::{DirectoryError, VerifyError};
pub use identity::{Identity, UserId};
pub use openpgp::{PgpVerifier, parse_public_key, sign_cleartext};
pub use verifier::{SignatureVerifier, Verification};
