//! Destination naming shared between client and broker.
//!
//! Two fixed prefixes: the broker fans out live messages for a room on
//! `/topic/messages/{roomId}`, and clients publish to the application
//! endpoint `/app/chat/{roomId}`. These strings are part of the wire
//! contract; changing them orphans every subscriber.

use crate::room::RoomId;

/// Prefix of the broker topic carrying live messages for a room.
pub const LIVE_TOPIC_PREFIX: &str = "/topic/messages/";

/// Prefix of the application endpoint that accepts published messages.
pub const PUBLISH_PREFIX: &str = "/app/chat/";

/// Broker topic for a room's live message stream.
#[must_use]
pub fn live_topic(room: &RoomId) -> String {
    format!("{LIVE_TOPIC_PREFIX}{room}")
}

/// Application destination a client publishes messages for a room to.
#[must_use]
pub fn publish_destination(room: &RoomId) -> String {
    format!("{PUBLISH_PREFIX}{room}")
}
