//! Client
//!
//! Async chat session handle for the Roomwire platform. A [`ChatSession`]
//! resolves a conversation key to a room over REST, seeds the room's
//! history oldest first, then keeps the message sequence live over a
//! STOMP subscription.
//!
//! # Architecture
//!
//! All sequencing rules live in the sans-IO [`roomwire_core::Session`]. A
//! driver task feeds it events and executes its actions against the
//! [`services`] and [`transport`] seams, so tests drive the same
//! orchestration code as production with deterministic fakes behind the
//! seams.
//!
//! # Components
//!
//! - [`ChatSession`]: cloneable handle to one conversation
//! - [`ChatServices`]: the service bundle a session runs against
//! - [`services`]: room directory and history store seams
//! - [`transport`]: live feed seam
//!
//! # Production services (optional)
//!
//! - With the `rest` feature: [`rest::HttpApi`], a reqwest-backed room
//!   directory and history store
//! - With the `transport` feature: [`ws::StompTransport`], a
//!   STOMP-over-WebSocket live feed

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod chat;
mod driver;
pub mod services;
pub mod transport;

#[cfg(feature = "rest")]
pub mod rest;

#[cfg(feature = "transport")]
pub mod ws;

pub use chat::{ChatServices, ChatSession};
pub use roomwire_core::{LinkState, SessionFault, SessionSnapshot};
pub use roomwire_proto::{
    ConversationKey, ConversationKind, Message, MessageKind, Room, RoomId, Sender,
};
