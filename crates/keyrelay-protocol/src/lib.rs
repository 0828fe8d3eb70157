//! Wire protocol for keyrelay.
//!
//! The relay speaks plain text frames during the handshake and JSON text
//! frames once a session is live:
//!
//! ```text
//! client → server   <username>
//! server → client   <challenge>            | "user not found"
//! client → server   <cleartext-signed challenge>
//! server → client   "successfully signed in" | "invalid signature"
//! server → client   <greeting>
//! server → client   {"Content": ..., "SentAt": ...}  (repeated)
//! ```
//!
//! - **Notices** ([`notice`]): the fixed text frames above.
//! - **Messages** ([`OutboundMessage`]): what the outbound loop writes.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]): how messages become bytes.

mod codec;
mod error;
mod message;
pub mod notice;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use message::OutboundMessage;
