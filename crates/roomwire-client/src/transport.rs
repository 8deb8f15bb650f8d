//! Live-feed transport seam.
//!
//! A [`Transport`] opens one subscription per activation and hands back a
//! [`LiveFeed`]: a channel pair carrying feed events up and publish
//! commands down. This layer just moves bytes; sequencing rules stay in
//! the sans-IO session.

use async_trait::async_trait;
use bytes::Bytes;
use roomwire_proto::RoomId;
use thiserror::Error;
use tokio::sync::mpsc;

/// Channel capacity for feed events and commands.
pub const FEED_BUFFER: usize = 64;

/// Transport errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// Connection could not be established.
    #[error("connect failed: {0}")]
    Connect(String),

    /// Broker rejected or never completed the session handshake.
    #[error("handshake failed: {0}")]
    Handshake(String),

    /// Stream error after the session was up.
    #[error("stream error: {0}")]
    Stream(String),

    /// Peer sent something that does not parse.
    #[error("protocol error: {0}")]
    Protocol(String),
}

/// What a feed reports upward.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedEvent {
    /// Subscription is live; frames may arrive.
    Up,

    /// Connection lost. The transport may keep retrying on its own and
    /// report [`FeedEvent::Up`] again later.
    Down,

    /// Body of one broker frame delivered on the room topic.
    Frame(Bytes),
}

/// What the driver asks of an active feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedCommand {
    /// Publish an envelope body to a broker destination.
    Publish {
        /// Destination path.
        destination: String,
        /// Serialized envelope.
        body: Bytes,
    },

    /// Tear the feed down for good.
    Deactivate,
}

/// Handle to one active room feed.
///
/// Dropping the handle closes both channels, which the transport treats
/// the same as [`FeedCommand::Deactivate`].
#[derive(Debug)]
pub struct LiveFeed {
    /// Events from the transport.
    pub events: mpsc::Receiver<FeedEvent>,
    /// Commands to the transport.
    pub commands: mpsc::Sender<FeedCommand>,
}

/// Opens live feeds, one per activation.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Activate a feed subscribed to `room`'s topic.
    async fn activate(&self, room: &RoomId) -> Result<LiveFeed, TransportError>;
}
