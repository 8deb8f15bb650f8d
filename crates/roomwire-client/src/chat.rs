//! Public handle for one chat conversation.
//!
//! [`ChatSession::open`] spawns a driver task that owns the state machine
//! and all I/O. The handle is cheap to clone: commands go in through a
//! bounded queue, state comes out through a watch channel, and every
//! accessor is non-blocking.

use std::sync::Arc;

use roomwire_core::{SessionFault, SessionSnapshot};
use roomwire_proto::{ConversationKey, Message, MessageKind, Room, Sender};
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, watch};
use tracing::{debug, warn};

use crate::driver::SessionDriver;
use crate::services::{HistoryStore, RoomDirectory};
use crate::transport::Transport;

/// Command-queue capacity per session.
const COMMAND_BUFFER: usize = 64;

/// Backend services a session runs against.
#[derive(Clone)]
pub struct ChatServices {
    /// Resolves conversation keys to rooms.
    pub directory: Arc<dyn RoomDirectory>,
    /// Serves persisted room history.
    pub history: Arc<dyn HistoryStore>,
    /// Opens live feeds.
    pub transport: Arc<dyn Transport>,
}

/// Caller requests processed by the driver task.
#[derive(Debug, Clone)]
pub(crate) enum Command {
    /// Publish a message to the current room.
    Send {
        /// Message body.
        content: String,
        /// Who is sending.
        sender: Sender,
        /// Envelope message type.
        kind: MessageKind,
    },

    /// Abandon the current conversation and start over with a new key.
    Switch(ConversationKey),

    /// Tear the session down for good.
    Close,
}

/// Handle to one running chat session.
///
/// Clones share the session. The driver tears down when
/// [`ChatSession::close`] is called or every handle has been dropped,
/// whichever comes first.
#[derive(Clone)]
pub struct ChatSession {
    commands: mpsc::Sender<Command>,
    snapshots: watch::Receiver<SessionSnapshot>,
}

impl ChatSession {
    /// Open a session for `key`.
    ///
    /// Room resolution, history, and the live feed are driven by a
    /// background task; progress is observable through the accessors and
    /// [`ChatSession::watch`]. Must be called within a tokio runtime.
    #[must_use]
    pub fn open(services: ChatServices, key: ConversationKey) -> Self {
        let (commands_tx, commands_rx) = mpsc::channel(COMMAND_BUFFER);
        let (snapshots_tx, snapshots_rx) = watch::channel(SessionSnapshot::default());

        let driver = SessionDriver::new(services, key, snapshots_tx);
        tokio::spawn(driver.run(commands_rx));

        Self { commands: commands_tx, snapshots: snapshots_rx }
    }

    /// Latest full state snapshot.
    #[must_use]
    pub fn snapshot(&self) -> SessionSnapshot {
        self.snapshots.borrow().clone()
    }

    /// Messages in display order, seeded history first.
    #[must_use]
    pub fn messages(&self) -> Vec<Message> {
        self.snapshots.borrow().messages.clone()
    }

    /// The resolved room, once resolution has succeeded.
    #[must_use]
    pub fn room(&self) -> Option<Room> {
        self.snapshots.borrow().room.clone()
    }

    /// Whether the live feed is currently connected.
    #[must_use]
    pub fn connected(&self) -> bool {
        self.snapshots.borrow().connected()
    }

    /// Why the session fell back to its safe default, if it did.
    #[must_use]
    pub fn fault(&self) -> Option<SessionFault> {
        self.snapshots.borrow().fault.clone()
    }

    /// Subscribe to state changes.
    ///
    /// The receiver holds the current snapshot immediately and is marked
    /// changed whenever the observable state changes.
    #[must_use]
    pub fn watch(&self) -> watch::Receiver<SessionSnapshot> {
        self.snapshots.clone()
    }

    /// Queue a text message from `sender` for publishing.
    ///
    /// A silent no-op while the feed is not connected. The message shows up
    /// in [`ChatSession::messages`] only when the broker delivers it back.
    pub fn send_message(&self, content: impl Into<String>, sender: Sender) {
        self.send_message_with_kind(content, sender, MessageKind::Text);
    }

    /// Queue a message with an explicit envelope type.
    pub fn send_message_with_kind(
        &self,
        content: impl Into<String>,
        sender: Sender,
        kind: MessageKind,
    ) {
        self.command(Command::Send { content: content.into(), sender, kind });
    }

    /// Move the session to a different conversation.
    ///
    /// State resets to the safe default at once and initialization starts
    /// over for `key`; completions still in flight for the old conversation
    /// are discarded when they land.
    pub fn switch(&self, key: ConversationKey) {
        self.command(Command::Switch(key));
    }

    /// Tear the session down. Safe to call repeatedly.
    pub fn close(&self) {
        self.command(Command::Close);
    }

    fn command(&self, command: Command) {
        match self.commands.try_send(command) {
            Ok(()) => {}
            Err(TrySendError::Full(command)) => {
                warn!("Session command queue full, dropping {:?}", command);
            }
            Err(TrySendError::Closed(_)) => {
                debug!("Session already closed, ignoring command");
            }
        }
    }
}
