//! Wire model for roomwire.
//!
//! Everything that crosses a process boundary is defined here and nowhere
//! else: the STOMP-style frame codec the live transport speaks, the JSON
//! message envelope shared by history and live delivery, room identifiers
//! and the conversation keys that resolve to them, and the destination
//! naming scheme.
//!
//! The crate is pure data and parsing. It performs no I/O and holds no
//! state, so every contract in it can be tested byte-for-byte.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod errors;
pub mod message;
pub mod room;
pub mod stomp;
pub mod topic;

pub use errors::{EnvelopeError, FrameError};
pub use message::{Message, MessageKind, Sender};
pub use room::{ConversationKey, ConversationKind, Room, RoomId};
pub use stomp::{Command, Frame, HeartbeatPlan};
