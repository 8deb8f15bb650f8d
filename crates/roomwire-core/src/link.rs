//! Connectivity state for one live feed.
//!
//! The link records what the transport has reported, nothing more. It never
//! initiates transitions on its own and it is the only source for the
//! session's `connected` read, so the flag can never race ahead of the state
//! that produced it.
//!
//! # State Machine
//!
//! ```text
//! Idle ──begin_connect──> Connecting ──up──> Connected
//!                              │                 │ ▲
//!                            down              down │up
//!                              │                 ▼ │
//!                              └──────────> Disconnected
//!
//! reset (key change / teardown) returns any state to Idle
//! ```
//!
//! `Disconnected -> Connected` is a legal edge: the transport reconnects on
//! its own and simply reports `up` again.

/// Lifecycle phase of the live feed, as last reported by the transport.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LinkState {
    /// No connection has been attempted for this session generation.
    #[default]
    Idle,
    /// A feed has been requested; no `up` edge seen yet.
    Connecting,
    /// The transport reported the subscription live.
    Connected,
    /// The transport reported the connection lost.
    Disconnected,
}

/// Transport-driven connectivity recorder.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Link {
    state: LinkState,
}

impl Link {
    /// A link that has never connected.
    #[must_use]
    pub const fn new() -> Self {
        Self { state: LinkState::Idle }
    }

    /// Current state.
    #[must_use]
    pub const fn state(self) -> LinkState {
        self.state
    }

    /// Derived connectivity flag: true only in [`LinkState::Connected`].
    #[must_use]
    pub const fn is_connected(self) -> bool {
        matches!(self.state, LinkState::Connected)
    }

    /// A feed activation was issued; the link is now waiting for `up`.
    pub fn begin_connect(&mut self) {
        self.state = LinkState::Connecting;
    }

    /// The transport reported the subscription live.
    pub fn up(&mut self) {
        self.state = LinkState::Connected;
    }

    /// The transport reported the connection lost (clean or abnormal).
    pub fn down(&mut self) {
        self.state = LinkState::Disconnected;
    }

    /// Forget connection history (key change or teardown).
    pub fn reset(&mut self) {
        self.state = LinkState::Idle;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_idle_and_not_connected() {
        let link = Link::new();
        assert_eq!(link.state(), LinkState::Idle);
        assert!(!link.is_connected());
    }

    #[test]
    fn connect_cycle() {
        let mut link = Link::new();
        link.begin_connect();
        assert_eq!(link.state(), LinkState::Connecting);
        assert!(!link.is_connected());

        link.up();
        assert!(link.is_connected());

        link.down();
        assert_eq!(link.state(), LinkState::Disconnected);
        assert!(!link.is_connected());
    }

    #[test]
    fn reconnect_edge_is_legal() {
        let mut link = Link::new();
        link.begin_connect();
        link.up();
        link.down();
        link.up();
        assert!(link.is_connected());
    }

    #[test]
    fn reset_returns_to_idle() {
        let mut link = Link::new();
        link.begin_connect();
        link.up();
        link.reset();
        assert_eq!(link.state(), LinkState::Idle);
    }
}
