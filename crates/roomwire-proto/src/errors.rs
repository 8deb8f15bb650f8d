//! Error types for wire-level decoding and encoding.

use thiserror::Error;

/// Errors produced while encoding or decoding a STOMP-style [`Frame`].
///
/// Decoding is total: any byte sequence maps to either a `Frame` or one of
/// these variants, never a panic. Size ceilings exist so a hostile peer
/// cannot force unbounded allocation from a single frame.
///
/// [`Frame`]: crate::stomp::Frame
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FrameError {
    /// Input contained no frame (empty or end-of-line padding only).
    #[error("frame is empty")]
    Empty,

    /// Command line did not name a known STOMP command.
    #[error("unknown command: {0:?}")]
    UnknownCommand(String),

    /// Command line or header section was not valid UTF-8.
    #[error("frame head is not valid UTF-8")]
    Utf8,

    /// A header line had no colon separator or an empty name.
    #[error("malformed header line: {0:?}")]
    MalformedHeader(String),

    /// A header contained a backslash escape outside the STOMP 1.2 set.
    #[error("invalid header escape sequence in {0:?}")]
    BadEscape(String),

    /// The header section exceeded [`Frame::MAX_HEADERS`] entries.
    ///
    /// [`Frame::MAX_HEADERS`]: crate::stomp::Frame::MAX_HEADERS
    #[error("too many headers: {count} (limit {max})")]
    TooManyHeaders {
        /// Number of header lines seen before giving up.
        count: usize,
        /// The enforced ceiling.
        max: usize,
    },

    /// The `content-length` header was present but not a valid length.
    #[error("invalid content-length header: {0:?}")]
    BadContentLength(String),

    /// Body length exceeded [`Frame::MAX_BODY_LEN`].
    ///
    /// [`Frame::MAX_BODY_LEN`]: crate::stomp::Frame::MAX_BODY_LEN
    #[error("body of {size} bytes exceeds limit of {max}")]
    BodyTooLarge {
        /// Claimed or actual body size.
        size: usize,
        /// The enforced ceiling.
        max: usize,
    },

    /// Fewer body bytes than `content-length` claimed.
    #[error("frame truncated: expected {expected} body bytes, got {actual}")]
    Truncated {
        /// Bytes the header claimed.
        expected: usize,
        /// Bytes actually present.
        actual: usize,
    },

    /// No NUL terminator after the body.
    #[error("missing NUL frame terminator")]
    MissingTerminator,

    /// Bytes other than end-of-line padding followed the terminator.
    #[error("unexpected bytes after frame terminator")]
    TrailingBytes,
}

/// Errors produced while encoding or decoding a JSON message envelope.
///
/// The underlying serde error is flattened to its display form so this type
/// stays cheap to clone and compare in state snapshots and tests.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EnvelopeError {
    /// Envelope could not be serialized to JSON.
    #[error("envelope encode failed: {0}")]
    Encode(String),

    /// Inbound bytes were not a valid JSON envelope.
    #[error("envelope decode failed: {0}")]
    Decode(String),
}
