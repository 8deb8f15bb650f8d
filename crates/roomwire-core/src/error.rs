//! Session fault record.

use thiserror::Error;

/// Why session initialization fell back to the safe default.
///
/// Faults are data, not propagated errors: initialization failures are
/// absorbed (the caller sees an empty, disconnected session) and this record
/// on the snapshot is what makes the failure observable.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionFault {
    /// The room directory call failed; no room, nothing loaded.
    #[error("room resolution failed: {0}")]
    RoomResolution(String),

    /// History could not be loaded after the room resolved. Fatal to session
    /// start: the live connection is not attempted.
    #[error("history fetch failed: {0}")]
    HistoryFetch(String),
}
