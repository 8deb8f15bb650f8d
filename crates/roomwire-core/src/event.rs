//! Inputs to the session state machine.

use chrono::{DateTime, Utc};
use roomwire_proto::{ConversationKey, Message, MessageKind, Room, Sender};

/// Everything that can happen to a session.
///
/// Async completions carry the `generation` they were issued under; the
/// session discards any completion whose generation no longer matches, which
/// is what makes late REST replies and leftover feed events harmless.
/// Caller commands (`SendRequested`, `KeyChanged`, `SessionClosed`) carry no
/// generation: they always apply to the current one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// The room directory resolved (or created) the room for this key.
    RoomResolved {
        /// Generation the resolve was issued under.
        generation: u64,
        /// The resolved room.
        room: Room,
    },

    /// The room directory call failed.
    RoomResolveFailed {
        /// Generation the resolve was issued under.
        generation: u64,
        /// Human-readable cause, kept for the fault record.
        reason: String,
    },

    /// The history store returned the room's past messages, oldest first.
    HistoryLoaded {
        /// Generation the fetch was issued under.
        generation: u64,
        /// Messages to seed the sequence with, in given order.
        messages: Vec<Message>,
    },

    /// The history store call failed.
    HistoryFailed {
        /// Generation the fetch was issued under.
        generation: u64,
        /// Human-readable cause, kept for the fault record.
        reason: String,
    },

    /// The transport reported the live subscription up.
    FeedUp {
        /// Generation of the feed reporting.
        generation: u64,
    },

    /// The transport reported the connection lost (clean or abnormal).
    FeedDown {
        /// Generation of the feed reporting.
        generation: u64,
    },

    /// Feed activation failed outright; no subscription exists.
    FeedFailed {
        /// Generation of the failed activation.
        generation: u64,
    },

    /// One message arrived on the live subscription.
    MessageArrived {
        /// Generation of the feed that delivered it.
        generation: u64,
        /// The decoded envelope.
        message: Message,
    },

    /// The caller asked to send a message.
    SendRequested {
        /// Message body.
        content: String,
        /// Who is sending.
        sender: Sender,
        /// Content type tag.
        kind: MessageKind,
        /// Client-generated creation timestamp.
        at: DateTime<Utc>,
    },

    /// The caller moved the session to a different conversation.
    KeyChanged {
        /// The new conversation key.
        key: ConversationKey,
    },

    /// The caller ended the session.
    SessionClosed,
}
