//! Deterministic test doubles for Roomwire sessions.
//!
//! Fakes for the client's three service seams, driven entirely from the
//! test body: directories and history stores answer immediately, fail on
//! demand, or hold calls open for staged races, and every activated feed
//! surfaces a [`FeedProbe`] so the test plays the broker side of the
//! conversation. [`wait_for`] bridges the async gap between a staged
//! stimulus and the snapshot change it must produce.
//!
//! Nothing here touches the network or the clock beyond a wait limit, so
//! every test that runs on these fakes is reproducible.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![allow(clippy::expect_used, reason = "broken harness assumptions fail the test loudly")]

use std::time::Duration;

use roomwire_core::SessionSnapshot;
use tokio::sync::watch;
use tokio::time::timeout;

mod directory;
mod history;
mod transport;

pub use directory::{ResolveCall, SimDirectory};
pub use history::SimHistory;
pub use transport::{FeedProbe, SimTransport};

/// Longest a test waits for an expected state change.
pub const WAIT_LIMIT: Duration = Duration::from_secs(2);

/// Wait until the observable session state satisfies `predicate`, then
/// return that snapshot.
///
/// Checks the current value first, so a condition that already holds
/// returns at once.
///
/// # Panics
///
/// Panics when [`WAIT_LIMIT`] passes without the condition holding, or
/// when the driver has dropped its snapshot channel. Both mean the test
/// failed.
pub async fn wait_for(
    snapshots: &mut watch::Receiver<SessionSnapshot>,
    predicate: impl FnMut(&SessionSnapshot) -> bool,
) -> SessionSnapshot {
    timeout(WAIT_LIMIT, snapshots.wait_for(predicate))
        .await
        .expect("session state never reached the expected condition")
        .expect("session driver dropped its snapshot channel")
        .clone()
}
