//! Session layer for Roomwire
//!
//! Pure state machine for one chat conversation: room resolution, history
//! seeding, live-feed lifecycle, and send gating, with no I/O of its own.
//! Drivers feed it events and execute the actions it returns, which keeps
//! every sequencing rule deterministic and testable without a runtime.
//!
//! # Components
//!
//! - [`Session`]: conversation state machine ([`SessionEvent`] in,
//!   [`SessionAction`] out)
//! - [`SessionSnapshot`]: immutable view handed to UI callers
//! - [`Link`]: connectivity sub-machine behind the derived `connected` flag
//! - [`SessionFault`]: recorded reason for a safe-default fallback

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod action;
mod error;
mod event;
mod link;
mod session;

pub use action::SessionAction;
pub use error::SessionFault;
pub use event::SessionEvent;
pub use link::{Link, LinkState};
pub use session::{Session, SessionSnapshot};
