//! Scriptable live-feed transport.

use async_trait::async_trait;
use bytes::Bytes;
use roomwire_client::transport::{
    FEED_BUFFER, FeedCommand, FeedEvent, LiveFeed, Transport, TransportError,
};
use roomwire_proto::{Message, RoomId};
use tokio::sync::mpsc;

/// Capacity of the surfaced-probe channel.
const PROBE_BUFFER: usize = 8;

/// Test-side end of one activated feed.
///
/// The driver holds the matching [`LiveFeed`]; a test plays the message
/// broker through this handle. Dropping the probe looks to the driver
/// like the feed task dying mid-connection.
#[derive(Debug)]
pub struct FeedProbe {
    /// Room the feed was activated for.
    pub room: RoomId,
    events: mpsc::Sender<FeedEvent>,
    commands: mpsc::Receiver<FeedCommand>,
}

impl FeedProbe {
    /// Report the subscription live.
    ///
    /// # Panics
    ///
    /// Panics when the driver has already dropped the feed, which means
    /// the test staged events out of order.
    pub async fn fire_up(&self) {
        self.events.send(FeedEvent::Up).await.expect("driver dropped the feed");
    }

    /// Report the connection lost.
    pub async fn fire_down(&self) {
        self.events.send(FeedEvent::Down).await.expect("driver dropped the feed");
    }

    /// Deliver one broker message on the room topic.
    pub async fn deliver(&self, message: &Message) {
        let body = message.to_json().expect("fixture message encodes");
        self.deliver_raw(body).await;
    }

    /// Deliver an arbitrary frame body, valid or not.
    pub async fn deliver_raw(&self, body: impl Into<Bytes>) {
        self.events.send(FeedEvent::Frame(body.into())).await.expect("driver dropped the feed");
    }

    /// Next command the driver sent this feed, or `None` once the driver
    /// has let go of it.
    pub async fn recv_command(&mut self) -> Option<FeedCommand> {
        self.commands.recv().await
    }
}

#[derive(Debug, Clone)]
enum Mode {
    Probed(mpsc::Sender<FeedProbe>),
    Failing(TransportError),
}

/// Deterministic [`Transport`] for tests.
///
/// Every activation builds a fresh channel pair and surfaces the test
/// side as a [`FeedProbe`] on the receiver returned by
/// [`SimTransport::new`]. The feed reports nothing on its own; `Up`,
/// `Down`, and frames all come from the probe.
#[derive(Debug, Clone)]
pub struct SimTransport {
    mode: Mode,
}

impl SimTransport {
    /// A transport plus the stream of probes for its activations.
    #[must_use]
    pub fn new() -> (Self, mpsc::Receiver<FeedProbe>) {
        let (probes_tx, probes_rx) = mpsc::channel(PROBE_BUFFER);
        (Self { mode: Mode::Probed(probes_tx) }, probes_rx)
    }

    /// A transport whose activations all fail with `error`.
    #[must_use]
    pub fn failing(error: TransportError) -> Self {
        Self { mode: Mode::Failing(error) }
    }
}

#[async_trait]
impl Transport for SimTransport {
    async fn activate(&self, room: &RoomId) -> Result<LiveFeed, TransportError> {
        match &self.mode {
            Mode::Probed(probes) => {
                let (events_tx, events_rx) = mpsc::channel(FEED_BUFFER);
                let (commands_tx, commands_rx) = mpsc::channel(FEED_BUFFER);
                let probe =
                    FeedProbe { room: room.clone(), events: events_tx, commands: commands_rx };
                if probes.send(probe).await.is_err() {
                    return Err(TransportError::Connect("probe receiver gone".to_owned()));
                }
                Ok(LiveFeed { events: events_rx, commands: commands_tx })
            }
            Mode::Failing(error) => Err(error.clone()),
        }
    }
}
