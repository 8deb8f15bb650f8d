//! Rooms and the conversation keys that name them.
//!
//! A conversation is addressed by a [`ConversationKey`] before its room
//! exists; the room directory resolves the key to a [`Room`] with get-or-create
//! semantics. Once resolved, a room is immutable for the life of a session.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque server-assigned identifier for one room's message stream.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomId(String);

impl RoomId {
    /// Wrap a raw identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The raw identifier string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for RoomId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for RoomId {
    fn from(id: &str) -> Self {
        Self(id.to_owned())
    }
}

/// Which kind of entity a conversation is attached to.
///
/// Wire form is SCREAMING_SNAKE (`"GROUP"`, `"EVENT"`, ...), matching the
/// directory API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConversationKind {
    /// Interest or community group chat.
    Group,
    /// Chat attached to an event or hackathon.
    Event,
    /// Project team chat.
    Team,
    /// One-to-one conversation.
    Direct,
}

impl ConversationKind {
    /// Wire-form name of this kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Group => "GROUP",
            Self::Event => "EVENT",
            Self::Team => "TEAM",
            Self::Direct => "DIRECT",
        }
    }
}

impl fmt::Display for ConversationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Names one logical conversation before (and independent of) its room.
///
/// The triple is the directory's lookup key: same key, same room. JSON form
/// is `{"type", "targetId", "roomName"}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationKey {
    /// Entity kind the conversation is attached to.
    #[serde(rename = "type")]
    pub kind: ConversationKind,

    /// Identifier of that entity (group id, event id, ...).
    pub target_id: String,

    /// Human-readable room name, used on first creation.
    pub room_name: String,
}

impl ConversationKey {
    /// Build a key from its parts.
    #[must_use]
    pub fn new(
        kind: ConversationKind,
        target_id: impl Into<String>,
        room_name: impl Into<String>,
    ) -> Self {
        Self { kind, target_id: target_id.into(), room_name: room_name.into() }
    }
}

impl fmt::Display for ConversationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.kind, self.target_id, self.room_name)
    }
}

/// A resolved room: identifier plus the key it was resolved from.
///
/// JSON form is `{"id", "type", "targetId", "name"}` as returned by the
/// directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Room {
    /// Server-assigned room identifier.
    pub id: RoomId,

    /// Entity kind from the conversation key.
    #[serde(rename = "type")]
    pub kind: ConversationKind,

    /// Target entity from the conversation key.
    pub target_id: String,

    /// Display name of the room.
    pub name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_serializes_with_wire_field_names() {
        let key =
            ConversationKey::new(ConversationKind::Group, "COMMUNITY_NEXUS", "Community Nexus");
        let json = serde_json::to_value(&key).expect("serialize");

        assert_eq!(
            json,
            serde_json::json!({
                "type": "GROUP",
                "targetId": "COMMUNITY_NEXUS",
                "roomName": "Community Nexus",
            })
        );
    }

    #[test]
    fn room_round_trips_from_directory_json() {
        let raw = r#"{"id":"room-7","type":"EVENT","targetId":"ev-42","name":"Hack Night"}"#;
        let room: Room = serde_json::from_str(raw).expect("deserialize");

        assert_eq!(room.id, RoomId::new("room-7"));
        assert_eq!(room.kind, ConversationKind::Event);
        assert_eq!(room.target_id, "ev-42");
        assert_eq!(room.name, "Hack Night");

        let back = serde_json::to_string(&room).expect("serialize");
        let reparsed: Room = serde_json::from_str(&back).expect("reparse");
        assert_eq!(room, reparsed);
    }

    #[test]
    fn kind_names_are_screaming_snake() {
        assert_eq!(ConversationKind::Group.as_str(), "GROUP");
        assert_eq!(
            serde_json::to_string(&ConversationKind::Direct).expect("serialize"),
            "\"DIRECT\""
        );
    }
}
