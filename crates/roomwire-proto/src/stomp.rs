//! STOMP 1.2-style frame codec.
//!
//! The live transport speaks STOMP text frames over a WebSocket: a command
//! line, header lines, a blank line, an optional body, and a NUL terminator.
//! One WebSocket text message carries one frame; bare end-of-line bytes
//! between frames are heart-beats, not frames.
//!
//! ```text
//! SEND\n
//! destination:/app/chat/42\n
//! content-length:7\n
//! \n
//! {"a":1}\0
//! ```
//!
//! This module is a pure codec: it never touches the network and decoding is
//! total over arbitrary input (a `Result`, never a panic).

use std::fmt;
use std::time::Duration;

use bytes::Bytes;

use crate::errors::FrameError;

/// Well-known STOMP header names used by this client.
pub mod header {
    /// Body length in bytes; lets bodies contain NUL.
    pub const CONTENT_LENGTH: &str = "content-length";
    /// Topic or endpoint a frame is addressed to.
    pub const DESTINATION: &str = "destination";
    /// Client-chosen subscription identifier.
    pub const ID: &str = "id";
    /// Subscription a MESSAGE frame belongs to.
    pub const SUBSCRIPTION: &str = "subscription";
    /// Server-assigned message identifier.
    pub const MESSAGE_ID: &str = "message-id";
    /// Acknowledgement mode of a subscription.
    pub const ACK: &str = "ack";
    /// Protocol versions a client can speak.
    pub const ACCEPT_VERSION: &str = "accept-version";
    /// Protocol version the server selected.
    pub const VERSION: &str = "version";
    /// Virtual host a client connects to.
    pub const HOST: &str = "host";
    /// Heart-beat offer/selection, `"<can-send-ms>,<want-ms>"`.
    pub const HEART_BEAT: &str = "heart-beat";
    /// Short description on an ERROR frame.
    pub const MESSAGE: &str = "message";
    /// Bearer token header honored by the platform's broker.
    pub const AUTHORIZATION: &str = "Authorization";
}

/// STOMP frame commands this client understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Client opens a session.
    Connect,
    /// Server accepts a session.
    Connected,
    /// Client publishes a body to a destination.
    Send,
    /// Client opens a subscription.
    Subscribe,
    /// Client closes a subscription.
    Unsubscribe,
    /// Server delivers a message to a subscription.
    Message,
    /// Server acknowledges a receipt request.
    Receipt,
    /// Server reports a protocol error (connection closes after).
    Error,
    /// Client ends the session.
    Disconnect,
}

impl Command {
    /// Wire name of the command.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Connect => "CONNECT",
            Self::Connected => "CONNECTED",
            Self::Send => "SEND",
            Self::Subscribe => "SUBSCRIBE",
            Self::Unsubscribe => "UNSUBSCRIBE",
            Self::Message => "MESSAGE",
            Self::Receipt => "RECEIPT",
            Self::Error => "ERROR",
            Self::Disconnect => "DISCONNECT",
        }
    }

    /// Parse a command line.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "CONNECT" => Some(Self::Connect),
            "CONNECTED" => Some(Self::Connected),
            "SEND" => Some(Self::Send),
            "SUBSCRIBE" => Some(Self::Subscribe),
            "UNSUBSCRIBE" => Some(Self::Unsubscribe),
            "MESSAGE" => Some(Self::Message),
            "RECEIPT" => Some(Self::Receipt),
            "ERROR" => Some(Self::Error),
            "DISCONNECT" => Some(Self::Disconnect),
            _ => None,
        }
    }

    /// Whether headers of this frame use STOMP 1.2 backslash escaping.
    ///
    /// CONNECT and CONNECTED are exempt for compatibility with STOMP 1.0
    /// servers, per the 1.2 specification.
    #[must_use]
    pub const fn escapes_headers(self) -> bool {
        !matches!(self, Self::Connect | Self::Connected)
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One STOMP frame: command, ordered headers, optional body.
///
/// # Invariants
///
/// - Bodies never exceed [`Frame::MAX_BODY_LEN`]; both [`Frame::encode`] and
///   [`Frame::decode`] enforce this.
/// - `content-length` is owned by the codec: encode emits it for non-empty
///   bodies and decode consumes it, so it never appears in [`Frame::headers`].
/// - Header order and duplicates are preserved; [`Frame::header`] returns the
///   first occurrence, which is the one STOMP defines as authoritative.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Frame command.
    pub command: Command,
    headers: Vec<(String, String)>,
    /// Frame body; empty for most control frames.
    pub body: Bytes,
}

impl Frame {
    /// Largest body accepted in either direction (256 KiB).
    ///
    /// A chat envelope is a few hundred bytes; the ceiling only exists so a
    /// broken or hostile peer cannot force unbounded allocation.
    pub const MAX_BODY_LEN: usize = 256 * 1024;

    /// Most header lines accepted in one frame.
    pub const MAX_HEADERS: usize = 64;

    /// A bodyless, headerless frame.
    #[must_use]
    pub fn new(command: Command) -> Self {
        Self { command, headers: Vec::new(), body: Bytes::new() }
    }

    /// Append a header.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Attach a body.
    #[must_use]
    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// CONNECT frame for the given virtual host and heart-beat offer.
    #[must_use]
    pub fn connect(host: &str, heartbeat: (u64, u64)) -> Self {
        Self::new(Command::Connect)
            .with_header(header::ACCEPT_VERSION, "1.2")
            .with_header(header::HOST, host)
            .with_header(header::HEART_BEAT, format_heartbeat(heartbeat))
    }

    /// SUBSCRIBE frame with auto acknowledgement.
    #[must_use]
    pub fn subscribe(id: &str, destination: &str) -> Self {
        Self::new(Command::Subscribe)
            .with_header(header::ID, id)
            .with_header(header::DESTINATION, destination)
            .with_header(header::ACK, "auto")
    }

    /// SEND frame carrying a body to a destination.
    #[must_use]
    pub fn send_to(destination: &str, body: impl Into<Bytes>) -> Self {
        Self::new(Command::Send).with_header(header::DESTINATION, destination).with_body(body)
    }

    /// DISCONNECT frame.
    #[must_use]
    pub fn disconnect() -> Self {
        Self::new(Command::Disconnect)
    }

    /// First value of the named header, if present.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.iter().find(|(n, _)| n == name).map(|(_, v)| v.as_str())
    }

    /// All headers in wire order.
    #[must_use]
    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    /// Whether a transport payload is a bare heart-beat rather than a frame.
    #[must_use]
    pub fn is_heartbeat(payload: &[u8]) -> bool {
        payload.iter().all(|&b| b == b'\n' || b == b'\r')
    }

    /// Encode to wire bytes.
    ///
    /// Emits `content-length` for non-empty bodies (any caller-supplied
    /// `content-length` header is ignored) and escapes headers for every
    /// command except CONNECT/CONNECTED.
    ///
    /// # Errors
    ///
    /// `FrameError::BodyTooLarge` if the body exceeds [`Frame::MAX_BODY_LEN`].
    pub fn encode(&self) -> Result<Bytes, FrameError> {
        if self.body.len() > Self::MAX_BODY_LEN {
            return Err(FrameError::BodyTooLarge { size: self.body.len(), max: Self::MAX_BODY_LEN });
        }

        let escape = self.command.escapes_headers();
        let mut out = Vec::with_capacity(64 + self.body.len());

        out.extend_from_slice(self.command.as_str().as_bytes());
        out.push(b'\n');

        for (name, value) in &self.headers {
            if name == header::CONTENT_LENGTH {
                continue;
            }
            push_header_text(&mut out, name, escape);
            out.push(b':');
            push_header_text(&mut out, value, escape);
            out.push(b'\n');
        }

        if !self.body.is_empty() {
            out.extend_from_slice(header::CONTENT_LENGTH.as_bytes());
            out.push(b':');
            out.extend_from_slice(self.body.len().to_string().as_bytes());
            out.push(b'\n');
        }

        out.push(b'\n');
        out.extend_from_slice(&self.body);
        out.push(0);

        Ok(Bytes::from(out))
    }

    /// Decode one frame from wire bytes.
    ///
    /// Leading end-of-line bytes (heart-beat padding) are skipped. After the
    /// NUL terminator only end-of-line padding may follow. With a
    /// `content-length` header the body is read exactly; without one it ends
    /// at the first NUL.
    ///
    /// # Errors
    ///
    /// Every malformation maps to a [`FrameError`] variant; see that type.
    /// No input causes a panic or an allocation beyond the frame's own size.
    pub fn decode(input: &[u8]) -> Result<Self, FrameError> {
        let mut pos = 0usize;

        while input.get(pos).is_some_and(|&b| b == b'\n' || b == b'\r') {
            pos += 1;
        }
        if pos == input.len() {
            return Err(FrameError::Empty);
        }

        let command_line = take_line(input, &mut pos)?;
        let command_line = str::from_utf8(command_line).map_err(|_| FrameError::Utf8)?;
        let command = Command::from_name(command_line)
            .ok_or_else(|| FrameError::UnknownCommand(command_line.to_owned()))?;
        let unescape_headers = command.escapes_headers();

        let mut headers: Vec<(String, String)> = Vec::new();
        let mut content_length: Option<usize> = None;
        loop {
            let line = take_line(input, &mut pos)?;
            if line.is_empty() {
                break;
            }
            if headers.len() >= Self::MAX_HEADERS {
                return Err(FrameError::TooManyHeaders {
                    count: headers.len() + 1,
                    max: Self::MAX_HEADERS,
                });
            }

            let line = str::from_utf8(line).map_err(|_| FrameError::Utf8)?;
            let (name, value) =
                line.split_once(':').ok_or_else(|| FrameError::MalformedHeader(line.to_owned()))?;
            if name.is_empty() {
                return Err(FrameError::MalformedHeader(line.to_owned()));
            }

            let (name, value) = if unescape_headers {
                (unescape_header(name)?, unescape_header(value)?)
            } else {
                (name.to_owned(), value.to_owned())
            };

            if name == header::CONTENT_LENGTH {
                if content_length.is_none() {
                    let parsed = value
                        .parse::<usize>()
                        .map_err(|_| FrameError::BadContentLength(value.clone()))?;
                    content_length = Some(parsed);
                }
                continue;
            }
            headers.push((name, value));
        }

        let rest = input.get(pos..).unwrap_or_default();
        let (body, tail) = match content_length {
            Some(expected) => {
                if expected > Self::MAX_BODY_LEN {
                    return Err(FrameError::BodyTooLarge {
                        size: expected,
                        max: Self::MAX_BODY_LEN,
                    });
                }
                if rest.len() < expected {
                    return Err(FrameError::Truncated { expected, actual: rest.len() });
                }
                if rest.get(expected) != Some(&0) {
                    return Err(FrameError::MissingTerminator);
                }
                let body = rest.get(..expected).unwrap_or_default();
                (body, rest.get(expected + 1..).unwrap_or_default())
            }
            None => {
                let nul = rest
                    .iter()
                    .position(|&b| b == 0)
                    .ok_or(FrameError::MissingTerminator)?;
                if nul > Self::MAX_BODY_LEN {
                    return Err(FrameError::BodyTooLarge { size: nul, max: Self::MAX_BODY_LEN });
                }
                (rest.get(..nul).unwrap_or_default(), rest.get(nul + 1..).unwrap_or_default())
            }
        };

        if !tail.iter().all(|&b| b == b'\n' || b == b'\r') {
            return Err(FrameError::TrailingBytes);
        }

        Ok(Self { command, headers, body: Bytes::copy_from_slice(body) })
    }
}

/// Read one line (up to `\n`, stripping an optional `\r`) and advance `pos`.
///
/// A frame head that ends before its structure is complete has, by the same
/// token, no NUL terminator in a valid position, hence the error variant.
fn take_line<'a>(input: &'a [u8], pos: &mut usize) -> Result<&'a [u8], FrameError> {
    let rest = input.get(*pos..).unwrap_or_default();
    let nl = rest.iter().position(|&b| b == b'\n').ok_or(FrameError::MissingTerminator)?;
    *pos += nl + 1;

    let line = rest.get(..nl).unwrap_or_default();
    match line.split_last() {
        Some((&b'\r', head)) => Ok(head),
        _ => Ok(line),
    }
}

fn push_header_text(out: &mut Vec<u8>, raw: &str, escape: bool) {
    if !escape {
        out.extend_from_slice(raw.as_bytes());
        return;
    }
    for b in raw.bytes() {
        match b {
            b'\\' => out.extend_from_slice(b"\\\\"),
            b'\r' => out.extend_from_slice(b"\\r"),
            b'\n' => out.extend_from_slice(b"\\n"),
            b':' => out.extend_from_slice(b"\\c"),
            other => out.push(other),
        }
    }
}

fn unescape_header(raw: &str) -> Result<String, FrameError> {
    if !raw.contains('\\') {
        return Ok(raw.to_owned());
    }
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            out.push(ch);
            continue;
        }
        match chars.next() {
            Some('\\') => out.push('\\'),
            Some('r') => out.push('\r'),
            Some('n') => out.push('\n'),
            Some('c') => out.push(':'),
            _ => return Err(FrameError::BadEscape(raw.to_owned())),
        }
    }
    Ok(out)
}

/// Negotiated heart-beat schedule for one connection.
///
/// `None` on a side means that direction sends no heart-beats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeartbeatPlan {
    /// How often this client must emit a beat (or frame).
    pub outgoing: Option<Duration>,
    /// Longest silence to tolerate from the server before assuming loss.
    pub incoming: Option<Duration>,
}

/// Apply the STOMP 1.2 heart-beat negotiation rule.
///
/// `client` is this side's CONNECT offer `(can_send_ms, want_ms)`; `server`
/// is the CONNECTED reply. Each direction is active only if the sender can
/// send and the receiver wants beats, at the slower of the two rates.
#[must_use]
pub fn negotiate_heartbeats(client: (u64, u64), server: (u64, u64)) -> HeartbeatPlan {
    let (client_send, client_want) = client;
    let (server_send, server_want) = server;

    let direction = |send: u64, want: u64| {
        if send == 0 || want == 0 { None } else { Some(Duration::from_millis(send.max(want))) }
    };

    HeartbeatPlan {
        outgoing: direction(client_send, server_want),
        incoming: direction(server_send, client_want),
    }
}

/// Parse a `heart-beat` header value (`"sx,sy"`).
#[must_use]
pub fn parse_heartbeat(value: &str) -> Option<(u64, u64)> {
    let (send, want) = value.split_once(',')?;
    Some((send.trim().parse().ok()?, want.trim().parse().ok()?))
}

/// Format a heart-beat offer for a CONNECT header.
#[must_use]
pub fn format_heartbeat((send, want): (u64, u64)) -> String {
    format!("{send},{want}")
}
