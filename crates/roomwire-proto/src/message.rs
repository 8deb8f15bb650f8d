//! The chat message envelope and its JSON wire form.
//!
//! One envelope shape serves both directions: the history store returns a
//! list of them (oldest first) and every live MESSAGE frame body is exactly
//! one of them. Outbound envelopes are built client-side with a
//! client-generated timestamp and no `id`; the server assigns ids when it
//! persists and echoes the message.

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::EnvelopeError;

/// Reference to the user a message came from.
///
/// Only `id` is mandatory on the wire; display name and avatar are filled in
/// by the server when it echoes a message back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sender {
    /// User identifier.
    pub id: String,

    /// Display name, if known.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub name: Option<String>,

    /// Avatar image URL, if known.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub avatar_url: Option<String>,
}

impl Sender {
    /// A sender known only by id.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into(), name: None, avatar_url: None }
    }

    /// Attach a display name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

/// Content type tag on a message.
///
/// Wire form is SCREAMING_SNAKE (`"TEXT"`, ...). Tags this client does not
/// know decode as [`MessageKind::Unknown`] rather than failing the envelope.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MessageKind {
    /// Plain text content.
    #[default]
    Text,
    /// Image attachment reference.
    Image,
    /// File attachment reference.
    File,
    /// Server-generated notice (join/leave, announcements).
    System,
    /// A tag introduced after this client was built.
    #[serde(other)]
    Unknown,
}

/// One chat message.
///
/// JSON form is `{"id", "sender", "content", "type", "createdAt"}` with
/// camelCase names; `createdAt` is RFC 3339 UTC. `id` is absent on outbound
/// envelopes and `type` defaults to `"TEXT"` when a peer omits it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    /// Server-assigned message id; `None` until the server has persisted it.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub id: Option<String>,

    /// Who sent the message.
    pub sender: Sender,

    /// Message body text (or attachment reference for non-text kinds).
    pub content: String,

    /// Content type tag.
    #[serde(rename = "type", default)]
    pub kind: MessageKind,

    /// Creation time. Client-generated for outbound messages.
    pub created_at: DateTime<Utc>,
}

impl Message {
    /// Build an outbound envelope (no id; the server assigns one).
    #[must_use]
    pub fn outbound(
        sender: Sender,
        content: impl Into<String>,
        kind: MessageKind,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self { id: None, sender, content: content.into(), kind, created_at }
    }

    /// Serialize to the JSON wire form.
    ///
    /// # Errors
    ///
    /// `EnvelopeError::Encode` if serialization fails.
    pub fn to_json(&self) -> Result<Bytes, EnvelopeError> {
        serde_json::to_vec(self)
            .map(Bytes::from)
            .map_err(|err| EnvelopeError::Encode(err.to_string()))
    }

    /// Parse an envelope from JSON bytes.
    ///
    /// # Errors
    ///
    /// `EnvelopeError::Decode` if the bytes are not a valid envelope.
    pub fn from_json(bytes: &[u8]) -> Result<Self, EnvelopeError> {
        serde_json::from_slice(bytes).map_err(|err| EnvelopeError::Decode(err.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 14, 9, 26, 53).single().expect("valid timestamp")
    }

    #[test]
    fn outbound_envelope_wire_shape() {
        let msg = Message::outbound(Sender::new("u1"), "hello", MessageKind::Text, t0());
        let json: serde_json::Value =
            serde_json::from_slice(&msg.to_json().expect("encode")).expect("valid json");

        assert_eq!(
            json,
            serde_json::json!({
                "sender": {"id": "u1"},
                "content": "hello",
                "type": "TEXT",
                "createdAt": "2025-03-14T09:26:53Z",
            })
        );
    }

    #[test]
    fn history_item_with_id_round_trips() {
        let raw = r#"{
            "id": "m1",
            "sender": {"id": "u2", "name": "Priya", "avatarUrl": "https://cdn.example/p.png"},
            "content": "hi",
            "type": "TEXT",
            "createdAt": "2025-03-14T09:26:53Z"
        }"#;

        let msg = Message::from_json(raw.as_bytes()).expect("decode");
        assert_eq!(msg.id.as_deref(), Some("m1"));
        assert_eq!(msg.sender.name.as_deref(), Some("Priya"));
        assert_eq!(msg.content, "hi");
        assert_eq!(msg.created_at, t0());

        let back = Message::from_json(&msg.to_json().expect("encode")).expect("reparse");
        assert_eq!(msg, back);
    }

    #[test]
    fn missing_type_defaults_to_text() {
        let raw =
            r#"{"id":"m1","sender":{"id":"u1"},"content":"hi","createdAt":"2025-03-14T09:26:53Z"}"#;
        let msg = Message::from_json(raw.as_bytes()).expect("decode");
        assert_eq!(msg.kind, MessageKind::Text);
    }

    #[test]
    fn unrecognized_type_decodes_as_unknown() {
        let raw = r#"{
            "sender": {"id": "u1"},
            "content": "x",
            "type": "HOLOGRAM",
            "createdAt": "2025-03-14T09:26:53Z"
        }"#;
        let msg = Message::from_json(raw.as_bytes()).expect("decode");
        assert_eq!(msg.kind, MessageKind::Unknown);
    }

    #[test]
    fn garbage_bytes_are_a_decode_error() {
        let err = Message::from_json(b"{not json").expect_err("must fail");
        assert!(matches!(err, EnvelopeError::Decode(_)));
    }
}
