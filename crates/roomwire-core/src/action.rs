//! Outputs of the session state machine.

use roomwire_proto::{ConversationKey, Message, RoomId};

/// Side effects the driver must perform on the session's behalf.
///
/// The session never performs I/O; it emits these and trusts the driver to
/// route the outcome back in as a [`SessionEvent`] tagged with the same
/// generation.
///
/// [`SessionEvent`]: crate::event::SessionEvent
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionAction {
    /// Ask the room directory to resolve (or create) the room for a key.
    ResolveRoom {
        /// Generation to tag the completion with.
        generation: u64,
        /// Key to resolve.
        key: ConversationKey,
    },

    /// Ask the history store for the room's past messages.
    FetchHistory {
        /// Generation to tag the completion with.
        generation: u64,
        /// Room to fetch history for.
        room: RoomId,
    },

    /// Open the live subscription for a room.
    ActivateFeed {
        /// Generation to tag the feed and its events with.
        generation: u64,
        /// Room whose topic to subscribe to.
        room: RoomId,
    },

    /// Publish one envelope to the room's application destination.
    Publish {
        /// Destination path (`/app/chat/{roomId}`).
        destination: String,
        /// Envelope to serialize and send.
        envelope: Message,
    },

    /// Tear down the currently active feed, if any.
    DeactivateFeed,
}
