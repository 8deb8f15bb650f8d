//! Service seams for room discovery and history.
//!
//! The session driver reaches the backend only through these traits, so
//! tests substitute deterministic fakes for the REST implementations and
//! drive the same orchestration code that runs in production.

use async_trait::async_trait;
use roomwire_proto::{ConversationKey, Message, Room, RoomId};
use thiserror::Error;

/// Failure resolving a conversation key to a room.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DirectoryError {
    /// Request never produced a response.
    #[error("directory request failed: {0}")]
    Request(String),

    /// Server answered with a non-success status.
    #[error("directory returned status {0}")]
    Status(u16),

    /// Response body did not parse as a room.
    #[error("directory response invalid: {0}")]
    Decode(String),
}

/// Failure fetching room history.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HistoryError {
    /// Request never produced a response.
    #[error("history request failed: {0}")]
    Request(String),

    /// Server answered with a non-success status.
    #[error("history returned status {0}")]
    Status(u16),

    /// Response body did not parse as a message list.
    #[error("history response invalid: {0}")]
    Decode(String),
}

/// Resolves conversation keys to rooms.
///
/// Resolution is find-or-create: the backend returns the existing room for
/// the key or creates one, so resolving the same key twice yields the same
/// room.
#[async_trait]
pub trait RoomDirectory: Send + Sync {
    /// Resolve `key` to its room.
    async fn resolve(&self, key: &ConversationKey) -> Result<Room, DirectoryError>;
}

/// Serves the persisted message history of a room.
#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// Every stored message for `room`, oldest first.
    async fn list_messages(&self, room: &RoomId) -> Result<Vec<Message>, HistoryError>;
}
