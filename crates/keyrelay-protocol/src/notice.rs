//! Fixed text frames exchanged during the handshake.
//!
//! Clients match on these strings literally, so they are part of the wire
//! contract and must not change.

/// Sent when the username in the first frame has no identity.
pub const USER_NOT_FOUND: &str = "user not found";

/// Sent when the signed reply does not verify against the stored key.
pub const INVALID_SIGNATURE: &str = "invalid signature";

/// Sent once the session is authenticated and registered.
pub const SIGNED_IN: &str = "successfully signed in";

/// Default text frame sent right after [`SIGNED_IN`].
pub const DEFAULT_GREETING: &str = "hi from the server";
