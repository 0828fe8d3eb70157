//! Codec trait and implementations for serializing outbound frames.
//!
//! The session layer doesn't care HOW a message is serialized; it only
//! needs something that implements [`Codec`]. [`JsonCodec`] is the one the
//! relay ships with because browser clients read JSON text frames.

use serde::{Serialize, de::DeserializeOwned};

use crate::ProtocolError;

/// A codec that can encode Rust types to bytes and decode bytes back.
///
/// `Send + Sync + 'static` because a codec is shared by every session's
/// outbound task.
pub trait Codec: Send + Sync + 'static {
    /// Serializes a value into bytes.
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError>;

    /// Deserializes bytes back into a value.
    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError>;

    /// Serializes a value for a text frame.
    ///
    /// # Errors
    /// Returns [`ProtocolError::NotText`] if the encoding is not UTF-8.
    fn encode_text<T: Serialize>(&self, value: &T) -> Result<String, ProtocolError> {
        String::from_utf8(self.encode(value)?).map_err(|_| ProtocolError::NotText)
    }
}

// ---------------------------------------------------------------------------
// JsonCodec
// ---------------------------------------------------------------------------

/// A [`Codec`] that uses JSON (via `serde_json`).
///
/// ```rust
/// use keyrelay_protocol::{Codec, JsonCodec, OutboundMessage};
///
/// let codec = JsonCodec;
/// let msg = OutboundMessage::new("hello");
///
/// let text = codec.encode_text(&msg).unwrap();
/// let decoded: OutboundMessage = codec.decode(text.as_bytes()).unwrap();
/// assert_eq!(msg, decoded);
/// ```
#[cfg(feature = "json")]
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

#[cfg(feature = "json")]
impl Codec for JsonCodec {
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError> {
        serde_json::to_vec(value).map_err(ProtocolError::Encode)
    }

    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError> {
        serde_json::from_slice(data).map_err(ProtocolError::Decode)
    }

    fn encode_text<T: Serialize>(&self, value: &T) -> Result<String, ProtocolError> {
        serde_json::to_string(value).map_err(ProtocolError::Encode)
    }
}

#[cfg(all(test, feature = "json"))]
mod tests {
    use super::*;
    use crate::OutboundMessage;

    #[test]
    fn test_decode_rejects_malformed_json() {
        let result: Result<OutboundMessage, _> = JsonCodec.decode(b"{\"Content\":");
        assert!(matches!(result, Err(ProtocolError::Decode(_))));
    }

    #[test]
    fn test_decode_rejects_missing_timestamp() {
        let result: Result<OutboundMessage, _> =
            JsonCodec.decode(br#"{"Content":"hi"}"#);
        assert!(result.is_err());
    }
}
