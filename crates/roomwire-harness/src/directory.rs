//! Scriptable room directory.

use async_trait::async_trait;
use roomwire_client::services::{DirectoryError, RoomDirectory};
use roomwire_proto::{ConversationKey, Room};
use tokio::sync::{mpsc, oneshot};

/// Capacity of the recorded-call channel in manual mode.
const CALL_BUFFER: usize = 8;

/// One resolution the session is waiting on, recorded in manual mode.
#[derive(Debug)]
pub struct ResolveCall {
    /// Key the session asked to resolve.
    pub key: ConversationKey,
    /// Send the scripted outcome here. Dropping it fails the call.
    pub reply: oneshot::Sender<Result<Room, DirectoryError>>,
}

#[derive(Debug)]
enum Mode {
    Fixed(Room),
    Routes(Vec<(ConversationKey, Room)>),
    Failing(DirectoryError),
    Manual(mpsc::Sender<ResolveCall>),
}

/// Deterministic [`RoomDirectory`] for tests.
#[derive(Debug)]
pub struct SimDirectory {
    mode: Mode,
}

impl SimDirectory {
    /// Resolve every key to the same room.
    #[must_use]
    pub fn with_room(room: Room) -> Self {
        Self { mode: Mode::Fixed(room) }
    }

    /// Resolve listed keys to their rooms; anything else is a 404.
    #[must_use]
    pub fn with_rooms(routes: Vec<(ConversationKey, Room)>) -> Self {
        Self { mode: Mode::Routes(routes) }
    }

    /// Fail every resolution with `error`.
    #[must_use]
    pub fn failing(error: DirectoryError) -> Self {
        Self { mode: Mode::Failing(error) }
    }

    /// Hold every call open until the test replies through its
    /// [`ResolveCall`].
    ///
    /// This is how tests stage late completions: switch conversations
    /// while a call is held, then answer it after the session has moved
    /// on.
    #[must_use]
    pub fn manual() -> (Self, mpsc::Receiver<ResolveCall>) {
        let (calls_tx, calls_rx) = mpsc::channel(CALL_BUFFER);
        (Self { mode: Mode::Manual(calls_tx) }, calls_rx)
    }
}

#[async_trait]
impl RoomDirectory for SimDirectory {
    async fn resolve(&self, key: &ConversationKey) -> Result<Room, DirectoryError> {
        match &self.mode {
            Mode::Fixed(room) => Ok(room.clone()),
            Mode::Routes(routes) => routes
                .iter()
                .find(|(candidate, _)| candidate == key)
                .map(|(_, room)| room.clone())
                .ok_or(DirectoryError::Status(404)),
            Mode::Failing(error) => Err(error.clone()),
            Mode::Manual(calls) => {
                let (reply_tx, reply_rx) = oneshot::channel();
                let call = ResolveCall { key: key.clone(), reply: reply_tx };
                // Degrade to request errors when the test is already done.
                if calls.send(call).await.is_err() {
                    return Err(DirectoryError::Request("call receiver gone".to_owned()));
                }
                reply_rx
                    .await
                    .unwrap_or_else(|_| Err(DirectoryError::Request("reply dropped".to_owned())))
            }
        }
    }
}
