//! Scriptable history store.

use async_trait::async_trait;
use roomwire_client::services::{HistoryError, HistoryStore};
use roomwire_proto::{Message, RoomId};

#[derive(Debug)]
enum Mode {
    Fixed(Vec<Message>),
    PerRoom(Vec<(RoomId, Vec<Message>)>),
    Failing(HistoryError),
}

/// Deterministic [`HistoryStore`] for tests.
#[derive(Debug)]
pub struct SimHistory {
    mode: Mode,
}

impl SimHistory {
    /// No stored messages for any room.
    #[must_use]
    pub fn empty() -> Self {
        Self { mode: Mode::Fixed(Vec::new()) }
    }

    /// The same history, oldest first, for every room.
    #[must_use]
    pub fn with_messages(messages: Vec<Message>) -> Self {
        Self { mode: Mode::Fixed(messages) }
    }

    /// Per-room histories; unlisted rooms are empty.
    #[must_use]
    pub fn per_room(rooms: Vec<(RoomId, Vec<Message>)>) -> Self {
        Self { mode: Mode::PerRoom(rooms) }
    }

    /// Fail every fetch with `error`.
    #[must_use]
    pub fn failing(error: HistoryError) -> Self {
        Self { mode: Mode::Failing(error) }
    }
}

#[async_trait]
impl HistoryStore for SimHistory {
    async fn list_messages(&self, room: &RoomId) -> Result<Vec<Message>, HistoryError> {
        match &self.mode {
            Mode::Fixed(messages) => Ok(messages.clone()),
            Mode::PerRoom(rooms) => Ok(rooms
                .iter()
                .find(|(candidate, _)| candidate == room)
                .map(|(_, messages)| messages.clone())
                .unwrap_or_default()),
            Mode::Failing(error) => Err(error.clone()),
        }
    }
}
