//! The structured frame written by a session's outbound loop.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A message waiting in (or taken from) a session's mailbox.
///
/// Immutable once built. On the wire it is a JSON object with the keys
/// `Content` and `SentAt`; browser clients already parse that shape, so
/// the capitalised names are kept.
///
/// ```rust
/// use keyrelay_protocol::OutboundMessage;
///
/// let msg = OutboundMessage::new("hello");
/// let json = serde_json::to_value(&msg).unwrap();
/// assert_eq!(json["Content"], "hello");
/// assert!(json["SentAt"].is_string());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct OutboundMessage {
    content: String,
    sent_at: DateTime<Utc>,
}

impl OutboundMessage {
    /// Stamps `content` with the current time.
    pub fn new(content: impl Into<String>) -> Self {
        Self::at(content, Utc::now())
    }

    /// Builds a message with an explicit timestamp.
    pub fn at(content: impl Into<String>, sent_at: DateTime<Utc>) -> Self {
        Self {
            content: content.into(),
            sent_at,
        }
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn sent_at(&self) -> DateTime<Utc> {
        self.sent_at
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn test_wire_shape_uses_capitalised_keys() {
        let sent_at = Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 0).unwrap();
        let msg = OutboundMessage::at("ping", sent_at);

        let json = serde_json::to_string(&msg).unwrap();

        assert_eq!(
            json,
            r#"{"Content":"ping","SentAt":"2024-05-01T12:30:00Z"}"#
        );
    }

    #[test]
    fn test_new_stamps_current_time() {
        let before = Utc::now();
        let msg = OutboundMessage::new("x");
        let after = Utc::now();

        assert!(msg.sent_at() >= before && msg.sent_at() <= after);
        assert_eq!(msg.content(), "x");
    }
}
