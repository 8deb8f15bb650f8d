//! STOMP-over-WebSocket live feed.
//!
//! One task per activation: dial, complete the STOMP session handshake,
//! subscribe to the room topic, then pump frames both ways until
//! deactivated. Connection loss is reported as [`FeedEvent::Down`] and the
//! task retries with a fixed delay on its own, so the session layer never
//! sees reconnect mechanics, only up and down reports.

use std::time::Duration;

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use roomwire_proto::stomp::{self, header};
use roomwire_proto::{Command as StompCommand, Frame, HeartbeatPlan, RoomId, topic};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::time::{Instant, Interval, interval_at, timeout, timeout_at};
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, warn};

use crate::transport::{FEED_BUFFER, FeedCommand, FeedEvent, LiveFeed, Transport, TransportError};

/// Default time allowed for dial plus session handshake.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default delay between reconnect attempts.
pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_secs(5);

/// Default heart-beat offer in milliseconds (can send, want to receive).
pub const DEFAULT_HEARTBEAT: (u64, u64) = (10_000, 10_000);

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Connection settings for the broker.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// WebSocket URL of the broker endpoint, e.g. `wss://host/ws/chat`.
    pub url: String,
    /// Bearer token attached to the session handshake.
    pub token: Option<String>,
    /// Time allowed for dial plus session handshake.
    pub connect_timeout: Duration,
    /// Delay between reconnect attempts.
    pub reconnect_delay: Duration,
    /// Heart-beat offer in milliseconds (can send, want to receive).
    /// Zero disables a direction.
    pub heartbeat: (u64, u64),
}

impl TransportConfig {
    /// Settings for `url` with default timing and no auth.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            token: None,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            reconnect_delay: DEFAULT_RECONNECT_DELAY,
            heartbeat: DEFAULT_HEARTBEAT,
        }
    }

    /// Attach a bearer token.
    #[must_use]
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }
}

/// STOMP-over-WebSocket implementation of [`Transport`].
#[derive(Debug, Clone)]
pub struct StompTransport {
    config: TransportConfig,
}

impl StompTransport {
    /// Transport dialing `config`.
    #[must_use]
    pub fn new(config: TransportConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl Transport for StompTransport {
    async fn activate(&self, room: &RoomId) -> Result<LiveFeed, TransportError> {
        let (events_tx, events_rx) = mpsc::channel(FEED_BUFFER);
        let (commands_tx, commands_rx) = mpsc::channel(FEED_BUFFER);

        tokio::spawn(run_feed(self.config.clone(), room.clone(), events_tx, commands_rx));

        Ok(LiveFeed { events: events_rx, commands: commands_tx })
    }
}

/// How one connection attempt ended.
enum FeedOutcome {
    /// Driver asked for teardown, or every handle is gone.
    Deactivated,
    /// Socket ended or broke; worth retrying.
    ConnectionLost,
}

async fn run_feed(
    config: TransportConfig,
    room: RoomId,
    events: mpsc::Sender<FeedEvent>,
    mut commands: mpsc::Receiver<FeedCommand>,
) {
    loop {
        match connect_and_pump(&config, &room, &events, &mut commands).await {
            Ok(FeedOutcome::Deactivated) => break,
            Ok(FeedOutcome::ConnectionLost) => {}
            Err(e) => warn!("Feed connection lost: {:?}", e),
        }

        if events.send(FeedEvent::Down).await.is_err() {
            break;
        }
        if !wait_for_retry(config.reconnect_delay, &mut commands).await {
            break;
        }
    }
    debug!("feed task for room {} ended", room);
}

/// Sleep out the reconnect delay, watching for deactivation.
///
/// Publishes queued while disconnected are dropped here rather than
/// replayed after reconnect. Returns false when the feed should stop.
async fn wait_for_retry(delay: Duration, commands: &mut mpsc::Receiver<FeedCommand>) -> bool {
    let deadline = Instant::now() + delay;
    loop {
        match timeout_at(deadline, commands.recv()).await {
            Ok(Some(FeedCommand::Deactivate) | None) => return false,
            Ok(Some(FeedCommand::Publish { destination, .. })) => {
                debug!("Dropping publish to {} while disconnected", destination);
            }
            Err(_) => return true,
        }
    }
}

async fn connect_and_pump(
    config: &TransportConfig,
    room: &RoomId,
    events: &mpsc::Sender<FeedEvent>,
    commands: &mut mpsc::Receiver<FeedCommand>,
) -> Result<FeedOutcome, TransportError> {
    let opened = timeout(config.connect_timeout, open_session(config))
        .await
        .map_err(|_| TransportError::Connect("session handshake timed out".into()))?;
    let (mut socket, plan) = opened?;

    let subscription = format!("sub-{room}");
    send_frame(&mut socket, &Frame::subscribe(&subscription, &topic::live_topic(room))).await?;

    if events.send(FeedEvent::Up).await.is_err() {
        return Ok(FeedOutcome::Deactivated);
    }

    pump(&mut socket, &plan, events, commands).await
}

/// Dial the broker and complete the CONNECT/CONNECTED exchange.
async fn open_session(config: &TransportConfig) -> Result<(Socket, HeartbeatPlan), TransportError> {
    let (mut socket, _response) = connect_async(config.url.as_str())
        .await
        .map_err(|e| TransportError::Connect(e.to_string()))?;

    let mut connect = Frame::connect(&host_of(&config.url), config.heartbeat);
    if let Some(token) = &config.token {
        connect = connect.with_header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    send_frame(&mut socket, &connect).await?;

    let connected = wait_for_connected(&mut socket).await?;
    let server = connected.header(header::HEART_BEAT).and_then(stomp::parse_heartbeat);
    let plan = stomp::negotiate_heartbeats(config.heartbeat, server.unwrap_or((0, 0)));

    Ok((socket, plan))
}

async fn wait_for_connected(socket: &mut Socket) -> Result<Frame, TransportError> {
    loop {
        let incoming = socket
            .next()
            .await
            .ok_or_else(|| TransportError::Handshake("connection closed during handshake".into()))?
            .map_err(|e| TransportError::Stream(e.to_string()))?;

        let Some(payload) = payload_of(incoming) else {
            continue;
        };
        if Frame::is_heartbeat(&payload) {
            continue;
        }
        let frame =
            Frame::decode(&payload).map_err(|e| TransportError::Protocol(e.to_string()))?;
        return match frame.command {
            StompCommand::Connected => Ok(frame),
            StompCommand::Error => {
                let detail = frame.header(header::MESSAGE).unwrap_or("no message header");
                Err(TransportError::Handshake(format!("broker error: {detail}")))
            }
            other => Err(TransportError::Handshake(format!("expected CONNECTED, got {other}"))),
        };
    }
}

/// Move frames both ways until the connection ends or the driver
/// deactivates the feed.
async fn pump(
    socket: &mut Socket,
    plan: &HeartbeatPlan,
    events: &mpsc::Sender<FeedEvent>,
    commands: &mut mpsc::Receiver<FeedCommand>,
) -> Result<FeedOutcome, TransportError> {
    let mut send_beat = beat_timer(plan.outgoing);
    let mut silence_check = beat_timer(plan.incoming);
    // Standard tolerance: the server gets twice its negotiated interval
    // before the connection counts as lost.
    let silence_limit = plan.incoming.map(|period| period * 2);
    let mut last_heard = Instant::now();

    loop {
        tokio::select! {
            incoming = socket.next() => {
                let Some(result) = incoming else {
                    return Ok(FeedOutcome::ConnectionLost);
                };
                let message = result.map_err(|e| TransportError::Stream(e.to_string()))?;
                last_heard = Instant::now();

                let Some(payload) = payload_of(message) else {
                    continue;
                };
                if Frame::is_heartbeat(&payload) {
                    continue;
                }
                handle_broker_frame(&payload, events).await?;
            }

            command = commands.recv() => {
                match command {
                    Some(FeedCommand::Publish { destination, body }) => {
                        send_frame(socket, &Frame::send_to(&destination, body)).await?;
                    }
                    Some(FeedCommand::Deactivate) | None => {
                        if let Err(e) = send_frame(socket, &Frame::disconnect()).await {
                            debug!("Failed to send DISCONNECT during teardown: {:?}", e);
                        }
                        return Ok(FeedOutcome::Deactivated);
                    }
                }
            }

            _ = tick(&mut send_beat) => {
                socket
                    .send(WsMessage::Text("\n".to_owned()))
                    .await
                    .map_err(|e| TransportError::Stream(e.to_string()))?;
            }

            _ = tick(&mut silence_check) => {
                if let Some(limit) = silence_limit
                    && last_heard.elapsed() > limit
                {
                    return Err(TransportError::Stream("server heart-beats stopped".into()));
                }
            }
        }
    }
}

/// Forward one decoded broker frame to the driver.
async fn handle_broker_frame(
    payload: &[u8],
    events: &mpsc::Sender<FeedEvent>,
) -> Result<(), TransportError> {
    let frame = Frame::decode(payload).map_err(|e| TransportError::Protocol(e.to_string()))?;
    match frame.command {
        StompCommand::Message => {
            if events.send(FeedEvent::Frame(frame.body)).await.is_err() {
                return Err(TransportError::Stream("feed consumer gone".into()));
            }
            Ok(())
        }
        StompCommand::Error => {
            let detail = frame.header(header::MESSAGE).unwrap_or("no message header");
            Err(TransportError::Protocol(format!("broker error: {detail}")))
        }
        StompCommand::Receipt => Ok(()),
        other => {
            debug!("Ignoring unexpected broker frame: {}", other);
            Ok(())
        }
    }
}

async fn send_frame(socket: &mut Socket, frame: &Frame) -> Result<(), TransportError> {
    let wire = frame.encode().map_err(|e| TransportError::Protocol(e.to_string()))?;
    let message = match String::from_utf8(wire.to_vec()) {
        Ok(text) => WsMessage::Text(text),
        Err(raw) => WsMessage::Binary(raw.into_bytes()),
    };
    socket.send(message).await.map_err(|e| TransportError::Stream(e.to_string()))
}

fn payload_of(message: WsMessage) -> Option<Vec<u8>> {
    match message {
        WsMessage::Text(text) => Some(text.into_bytes()),
        WsMessage::Binary(bytes) => Some(bytes),
        WsMessage::Ping(_) | WsMessage::Pong(_) | WsMessage::Close(_) | WsMessage::Frame(_) => {
            None
        }
    }
}

/// Interval that fires one period from now, or never for a disabled
/// direction.
fn beat_timer(period: Option<Duration>) -> Option<Interval> {
    period.map(|period| interval_at(Instant::now() + period, period))
}

async fn tick(timer: &mut Option<Interval>) {
    match timer {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending().await,
    }
}

/// Host part of a WebSocket URL, for the STOMP `host` header.
fn host_of(url: &str) -> String {
    let rest = url.split_once("://").map_or(url, |(_, rest)| rest);
    let authority = rest.split(['/', '?', '#']).next().unwrap_or(rest);
    let host_port = authority.rsplit('@').next().unwrap_or(authority);
    host_port.split(':').next().unwrap_or(host_port).to_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn host_extraction() {
        assert_eq!(host_of("wss://campus.example.edu/ws/chat"), "campus.example.edu");
        assert_eq!(host_of("ws://localhost:8080/ws"), "localhost");
        assert_eq!(host_of("ws://user@broker.internal:61613/stomp?x=1"), "broker.internal");
    }

    #[tokio::test]
    async fn disabled_heartbeat_directions_have_no_timer() {
        assert!(beat_timer(None).is_none());
        assert!(beat_timer(Some(Duration::from_secs(10))).is_some());
    }

    #[test]
    fn config_defaults() {
        let config = TransportConfig::new("wss://h/ws");
        assert_eq!(config.connect_timeout, DEFAULT_CONNECT_TIMEOUT);
        assert_eq!(config.reconnect_delay, DEFAULT_RECONNECT_DELAY);
        assert_eq!(config.heartbeat, DEFAULT_HEARTBEAT);
        assert!(config.token.is_none());
    }
}
