//! The chat session state machine.
//!
//! One `Session` owns everything one mounted conversation view can observe:
//! the resolved room, the ordered message sequence, link state, and the
//! fault record. It is sans-IO: callers feed it [`SessionEvent`]s and
//! execute the [`SessionAction`]s it returns. All sequencing rules live
//! here, where they are testable without a runtime:
//!
//! - resolve, then history, then feed: history is always seeded before the
//!   feed is activated, so live messages can never precede it;
//! - a history failure is fatal to session start (no feed is activated);
//! - every async completion is generation-checked, so results belonging to
//!   a superseded key or a closed session change nothing;
//! - events are phase-checked as well: a link report or arrival counts
//!   only while a feed is active, and each generation takes at most one
//!   history outcome;
//! - sends require a connected link and a resolved room, otherwise they are
//!   a silent no-op; a sent message is appended only when the feed echoes
//!   it back.

use chrono::{DateTime, Utc};
use roomwire_proto::{ConversationKey, Message, MessageKind, Room, Sender, topic};

use crate::action::SessionAction;
use crate::error::SessionFault;
use crate::event::SessionEvent;
use crate::link::{Link, LinkState};

/// Immutable view of session state, published to UI callers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionSnapshot {
    /// Resolved room, `None` until resolution succeeds.
    pub room: Option<Room>,

    /// Message sequence in receipt order: history first, then live arrivals.
    pub messages: Vec<Message>,

    /// Connectivity state of the live feed.
    pub link: LinkState,

    /// Why initialization fell back to the safe default, if it did.
    pub fault: Option<SessionFault>,
}

impl SessionSnapshot {
    /// Derived connectivity flag: true only while the link is connected.
    #[must_use]
    pub const fn connected(&self) -> bool {
        matches!(self.link, LinkState::Connected)
    }
}

/// State machine for one logical conversation.
#[derive(Debug, Clone)]
pub struct Session {
    key: ConversationKey,
    generation: u64,
    room: Option<Room>,
    messages: Vec<Message>,
    link: Link,
    fault: Option<SessionFault>,
    feed_active: bool,
    started: bool,
    closed: bool,
}

impl Session {
    /// A fresh session for one conversation key. Emits nothing until
    /// [`Session::start`] is called.
    #[must_use]
    pub fn new(key: ConversationKey) -> Self {
        Self {
            key,
            generation: 0,
            room: None,
            messages: Vec::new(),
            link: Link::new(),
            fault: None,
            feed_active: false,
            started: false,
            closed: false,
        }
    }

    /// Kick off initialization. Idempotent: only the first call emits the
    /// resolve action.
    pub fn start(&mut self) -> Vec<SessionAction> {
        if self.started || self.closed {
            return Vec::new();
        }
        self.started = true;
        vec![SessionAction::ResolveRoom { generation: self.generation, key: self.key.clone() }]
    }

    /// Apply one event, returning the side effects to perform.
    pub fn handle(&mut self, event: SessionEvent) -> Vec<SessionAction> {
        match event {
            SessionEvent::RoomResolved { generation, room } => {
                self.handle_room_resolved(generation, room)
            }
            SessionEvent::RoomResolveFailed { generation, reason } => {
                self.handle_room_resolve_failed(generation, reason)
            }
            SessionEvent::HistoryLoaded { generation, messages } => {
                self.handle_history_loaded(generation, messages)
            }
            SessionEvent::HistoryFailed { generation, reason } => {
                self.handle_history_failed(generation, reason)
            }
            SessionEvent::FeedUp { generation } => self.handle_feed_up(generation),
            SessionEvent::FeedDown { generation } => self.handle_feed_down(generation),
            SessionEvent::FeedFailed { generation } => self.handle_feed_failed(generation),
            SessionEvent::MessageArrived { generation, message } => {
                self.handle_message_arrived(generation, message)
            }
            SessionEvent::SendRequested { content, sender, kind, at } => {
                self.handle_send_requested(content, sender, kind, at)
            }
            SessionEvent::KeyChanged { key } => self.handle_key_changed(key),
            SessionEvent::SessionClosed => self.handle_session_closed(),
        }
    }

    /// Current generation; completions tagged with any other value are
    /// discarded.
    #[must_use]
    pub const fn generation(&self) -> u64 {
        self.generation
    }

    /// Derived connectivity flag.
    #[must_use]
    pub const fn connected(&self) -> bool {
        self.link.is_connected()
    }

    /// Snapshot of everything a caller can observe.
    #[must_use]
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            room: self.room.clone(),
            messages: self.messages.clone(),
            link: self.link.state(),
            fault: self.fault.clone(),
        }
    }

    fn is_stale(&self, generation: u64) -> bool {
        generation != self.generation || self.closed
    }

    // A link report or arrival is meaningful only while this generation's
    // feed is active.
    fn is_stale_feed_report(&self, generation: u64) -> bool {
        self.is_stale(generation) || !self.feed_active
    }

    fn handle_room_resolved(&mut self, generation: u64, room: Room) -> Vec<SessionAction> {
        if self.is_stale(generation) {
            return Vec::new();
        }
        let room_id = room.id.clone();
        self.room = Some(room);
        vec![SessionAction::FetchHistory { generation, room: room_id }]
    }

    fn handle_room_resolve_failed(
        &mut self,
        generation: u64,
        reason: String,
    ) -> Vec<SessionAction> {
        if self.is_stale(generation) {
            return Vec::new();
        }
        self.fault = Some(SessionFault::RoomResolution(reason));
        Vec::new()
    }

    fn handle_history_loaded(
        &mut self,
        generation: u64,
        messages: Vec<Message>,
    ) -> Vec<SessionAction> {
        // Once the link left Idle this generation's fetch has settled; a
        // further outcome is a duplicate and must not re-seed or request a
        // second feed.
        if self.is_stale(generation) || self.link.state() != LinkState::Idle {
            return Vec::new();
        }
        let Some(room) = &self.room else {
            return Vec::new();
        };
        self.messages = messages;
        self.link.begin_connect();
        self.feed_active = true;
        vec![SessionAction::ActivateFeed { generation, room: room.id.clone() }]
    }

    fn handle_history_failed(&mut self, generation: u64, reason: String) -> Vec<SessionAction> {
        if self.is_stale(generation) || self.link.state() != LinkState::Idle {
            return Vec::new();
        }
        // Fatal to session start. Converge on the same safe default as a
        // resolution failure: no room, no messages, not connected.
        self.room = None;
        self.messages.clear();
        self.fault = Some(SessionFault::HistoryFetch(reason));
        Vec::new()
    }

    fn handle_feed_up(&mut self, generation: u64) -> Vec<SessionAction> {
        if self.is_stale_feed_report(generation) {
            return Vec::new();
        }
        self.link.up();
        Vec::new()
    }

    fn handle_feed_down(&mut self, generation: u64) -> Vec<SessionAction> {
        if self.is_stale_feed_report(generation) {
            return Vec::new();
        }
        self.link.down();
        Vec::new()
    }

    fn handle_feed_failed(&mut self, generation: u64) -> Vec<SessionAction> {
        if self.is_stale_feed_report(generation) {
            return Vec::new();
        }
        self.feed_active = false;
        self.link.down();
        Vec::new()
    }

    fn handle_message_arrived(&mut self, generation: u64, message: Message) -> Vec<SessionAction> {
        if self.is_stale_feed_report(generation) {
            return Vec::new();
        }
        // Receipt order, no dedup: an id already present in history appends
        // again. Sends rely on this path for their echo.
        self.messages.push(message);
        Vec::new()
    }

    fn handle_send_requested(
        &mut self,
        content: String,
        sender: Sender,
        kind: MessageKind,
        at: DateTime<Utc>,
    ) -> Vec<SessionAction> {
        if self.closed || !self.link.is_connected() {
            return Vec::new();
        }
        let Some(room) = &self.room else {
            return Vec::new();
        };
        let envelope = Message::outbound(sender, content, kind, at);
        vec![SessionAction::Publish {
            destination: topic::publish_destination(&room.id),
            envelope,
        }]
    }

    fn handle_key_changed(&mut self, key: ConversationKey) -> Vec<SessionAction> {
        if self.closed {
            return Vec::new();
        }
        self.generation += 1;
        self.started = true;
        self.key = key.clone();
        self.room = None;
        self.messages.clear();
        self.fault = None;
        self.link.reset();

        let mut actions = Vec::new();
        if self.feed_active {
            self.feed_active = false;
            actions.push(SessionAction::DeactivateFeed);
        }
        actions.push(SessionAction::ResolveRoom { generation: self.generation, key });
        actions
    }

    fn handle_session_closed(&mut self) -> Vec<SessionAction> {
        if self.closed {
            return Vec::new();
        }
        self.closed = true;
        self.generation += 1;
        self.link.reset();
        if self.feed_active {
            self.feed_active = false;
            return vec![SessionAction::DeactivateFeed];
        }
        Vec::new()
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use roomwire_proto::{ConversationKind, RoomId};

    use super::*;

    fn key() -> ConversationKey {
        ConversationKey::new(ConversationKind::Group, "COMMUNITY_NEXUS", "Community Nexus")
    }

    fn room() -> Room {
        Room {
            id: RoomId::new("room-1"),
            kind: ConversationKind::Group,
            target_id: "COMMUNITY_NEXUS".into(),
            name: "Community Nexus".into(),
        }
    }

    fn msg(id: &str, content: &str) -> Message {
        Message {
            id: Some(id.into()),
            sender: Sender::new("u2"),
            content: content.into(),
            kind: MessageKind::Text,
            created_at: Utc.with_ymd_and_hms(2025, 3, 14, 9, 0, 0).single().expect("timestamp"),
        }
    }

    fn send_event(content: &str) -> SessionEvent {
        SessionEvent::SendRequested {
            content: content.into(),
            sender: Sender::new("u1"),
            kind: MessageKind::Text,
            at: Utc.with_ymd_and_hms(2025, 3, 14, 9, 30, 0).single().expect("timestamp"),
        }
    }

    /// Session driven through resolve + history seed, feed activated but not
    /// yet up.
    fn activated_session(history: Vec<Message>) -> Session {
        let mut session = Session::new(key());
        let actions = session.start();
        assert_eq!(
            actions,
            vec![SessionAction::ResolveRoom { generation: 0, key: key() }]
        );

        let actions = session.handle(SessionEvent::RoomResolved { generation: 0, room: room() });
        assert_eq!(
            actions,
            vec![SessionAction::FetchHistory { generation: 0, room: RoomId::new("room-1") }]
        );

        let actions =
            session.handle(SessionEvent::HistoryLoaded { generation: 0, messages: history });
        assert_eq!(
            actions,
            vec![SessionAction::ActivateFeed { generation: 0, room: RoomId::new("room-1") }]
        );
        session
    }

    #[test]
    fn start_is_idempotent() {
        let mut session = Session::new(key());
        assert_eq!(session.start().len(), 1);
        assert_eq!(session.start(), vec![]);
    }

    #[test]
    fn history_seeds_before_feed_activation() {
        let session = activated_session(vec![msg("m1", "hi"), msg("m2", "there")]);
        let snapshot = session.snapshot();

        assert_eq!(snapshot.messages.len(), 2);
        assert_eq!(snapshot.messages[0].content, "hi");
        assert_eq!(snapshot.link, LinkState::Connecting);
        assert!(!snapshot.connected());
    }

    #[test]
    fn connected_flips_only_on_feed_up() {
        let mut session = activated_session(vec![msg("m1", "hi")]);
        assert!(!session.connected());

        assert_eq!(session.handle(SessionEvent::FeedUp { generation: 0 }), vec![]);
        assert!(session.connected());

        assert_eq!(session.handle(SessionEvent::FeedDown { generation: 0 }), vec![]);
        assert!(!session.connected());
        assert_eq!(session.snapshot().link, LinkState::Disconnected);

        // Transport reconnected on its own.
        session.handle(SessionEvent::FeedUp { generation: 0 });
        assert!(session.connected());
    }

    #[test]
    fn disconnect_retains_messages() {
        let mut session = activated_session(vec![msg("m1", "hi")]);
        session.handle(SessionEvent::FeedUp { generation: 0 });
        session.handle(SessionEvent::MessageArrived { generation: 0, message: msg("m2", "live") });

        session.handle(SessionEvent::FeedDown { generation: 0 });
        assert_eq!(session.snapshot().messages.len(), 2);
    }

    #[test]
    fn feed_reports_before_activation_are_dropped() {
        let mut session = Session::new(key());
        session.start();

        assert_eq!(session.handle(SessionEvent::FeedUp { generation: 0 }), vec![]);
        assert!(!session.connected());

        // Still inert between resolution and the history seed.
        session.handle(SessionEvent::RoomResolved { generation: 0, room: room() });
        let before = session.snapshot();
        session.handle(SessionEvent::FeedUp { generation: 0 });
        session.handle(SessionEvent::FeedDown { generation: 0 });
        session.handle(SessionEvent::FeedFailed { generation: 0 });
        session.handle(SessionEvent::MessageArrived { generation: 0, message: msg("m1", "x") });

        assert_eq!(session.snapshot(), before);
        assert_eq!(session.snapshot().link, LinkState::Idle);
    }

    #[test]
    fn reports_after_feed_failure_are_dropped() {
        let mut session = activated_session(vec![]);
        session.handle(SessionEvent::FeedUp { generation: 0 });
        session.handle(SessionEvent::FeedFailed { generation: 0 });
        assert!(!session.connected());

        // The feed is gone; nothing it could still emit counts.
        session.handle(SessionEvent::FeedUp { generation: 0 });
        assert!(!session.connected());
        session.handle(SessionEvent::MessageArrived { generation: 0, message: msg("m2", "x") });
        assert!(session.snapshot().messages.is_empty());
    }

    #[test]
    fn send_before_connect_is_silent_noop() {
        let mut session = activated_session(vec![msg("m1", "hi")]);
        let actions = session.handle(send_event("hello"));

        assert_eq!(actions, vec![]);
        assert_eq!(session.snapshot().messages.len(), 1);
    }

    #[test]
    fn send_without_room_is_silent_noop() {
        let mut session = Session::new(key());
        session.start();
        assert_eq!(session.handle(send_event("hello")), vec![]);
    }

    #[test]
    fn send_while_connected_publishes_without_local_echo() {
        let mut session = activated_session(vec![msg("m1", "hi")]);
        session.handle(SessionEvent::FeedUp { generation: 0 });

        let actions = session.handle(send_event("hello"));
        let [SessionAction::Publish { destination, envelope }] = actions.as_slice() else {
            panic!("expected exactly one publish, got {actions:?}");
        };

        assert_eq!(destination, "/app/chat/room-1");
        assert_eq!(envelope.content, "hello");
        assert_eq!(envelope.id, None);
        // No local echo: the sequence is unchanged until the echo arrives.
        assert_eq!(session.snapshot().messages.len(), 1);

        let echo = msg("m9", "hello");
        session.handle(SessionEvent::MessageArrived { generation: 0, message: echo });
        assert_eq!(session.snapshot().messages.len(), 2);
        assert_eq!(session.snapshot().messages[1].content, "hello");
    }

    #[test]
    fn arrivals_append_in_order_without_dedup() {
        let mut session = activated_session(vec![msg("m1", "hi")]);
        session.handle(SessionEvent::FeedUp { generation: 0 });

        session.handle(SessionEvent::MessageArrived { generation: 0, message: msg("m1", "hi") });
        session.handle(SessionEvent::MessageArrived { generation: 0, message: msg("m2", "yo") });

        let contents: Vec<_> =
            session.snapshot().messages.iter().map(|m| m.content.clone()).collect();
        assert_eq!(contents, ["hi", "hi", "yo"]);
    }

    #[test]
    fn resolve_failure_records_fault_and_safe_default() {
        let mut session = Session::new(key());
        session.start();

        let actions = session.handle(SessionEvent::RoomResolveFailed {
            generation: 0,
            reason: "503 from directory".into(),
        });

        assert_eq!(actions, vec![]);
        let snapshot = session.snapshot();
        assert_eq!(snapshot.room, None);
        assert!(snapshot.messages.is_empty());
        assert_eq!(snapshot.link, LinkState::Idle);
        assert_eq!(
            snapshot.fault,
            Some(SessionFault::RoomResolution("503 from directory".into()))
        );
    }

    #[test]
    fn history_failure_is_fatal_to_start() {
        let mut session = Session::new(key());
        session.start();
        session.handle(SessionEvent::RoomResolved { generation: 0, room: room() });

        let actions = session.handle(SessionEvent::HistoryFailed {
            generation: 0,
            reason: "timeout".into(),
        });

        // No feed activation: history failure aborts the connection.
        assert_eq!(actions, vec![]);
        let snapshot = session.snapshot();
        assert_eq!(snapshot.room, None);
        assert!(snapshot.messages.is_empty());
        assert_eq!(snapshot.link, LinkState::Idle);
        assert_eq!(snapshot.fault, Some(SessionFault::HistoryFetch("timeout".into())));
    }

    #[test]
    fn history_outcome_after_activation_is_dropped() {
        let mut session = activated_session(vec![msg("m1", "hi")]);
        session.handle(SessionEvent::FeedUp { generation: 0 });
        let before = session.snapshot();

        let actions = session.handle(SessionEvent::HistoryFailed {
            generation: 0,
            reason: "duplicate outcome".into(),
        });
        assert_eq!(actions, vec![]);
        assert_eq!(
            session.handle(SessionEvent::HistoryLoaded { generation: 0, messages: vec![] }),
            vec![]
        );

        let snapshot = session.snapshot();
        assert_eq!(snapshot, before);
        assert!(snapshot.connected());
    }

    #[test]
    fn stale_completions_are_discarded() {
        let mut session = Session::new(key());
        session.start();
        session.handle(SessionEvent::KeyChanged {
            key: ConversationKey::new(ConversationKind::Event, "ev-1", "Hack Night"),
        });
        let before = session.snapshot();

        // Generation 0 completions arrive after the switch to generation 1.
        session.handle(SessionEvent::RoomResolved { generation: 0, room: room() });
        session.handle(SessionEvent::HistoryLoaded {
            generation: 0,
            messages: vec![msg("m1", "hi")],
        });
        session.handle(SessionEvent::FeedUp { generation: 0 });
        session.handle(SessionEvent::MessageArrived { generation: 0, message: msg("m2", "x") });

        assert_eq!(session.snapshot(), before);
    }

    #[test]
    fn key_change_resets_state_and_deactivates_feed() {
        let mut session = activated_session(vec![msg("m1", "hi")]);
        session.handle(SessionEvent::FeedUp { generation: 0 });

        let next = ConversationKey::new(ConversationKind::Team, "team-9", "Crate Pushers");
        let actions = session.handle(SessionEvent::KeyChanged { key: next.clone() });

        assert_eq!(
            actions,
            vec![
                SessionAction::DeactivateFeed,
                SessionAction::ResolveRoom { generation: 1, key: next },
            ]
        );
        let snapshot = session.snapshot();
        assert_eq!(snapshot.room, None);
        assert!(snapshot.messages.is_empty());
        assert_eq!(snapshot.link, LinkState::Idle);
        assert_eq!(session.generation(), 1);
    }

    #[test]
    fn key_change_before_activation_skips_deactivate() {
        let mut session = Session::new(key());
        session.start();

        let next = ConversationKey::new(ConversationKind::Direct, "u7", "dm");
        let actions = session.handle(SessionEvent::KeyChanged { key: next.clone() });
        assert_eq!(actions, vec![SessionAction::ResolveRoom { generation: 1, key: next }]);
    }

    #[test]
    fn close_deactivates_exactly_once() {
        let mut session = activated_session(vec![]);
        session.handle(SessionEvent::FeedUp { generation: 0 });

        let actions = session.handle(SessionEvent::SessionClosed);
        assert_eq!(actions, vec![SessionAction::DeactivateFeed]);
        assert_eq!(session.handle(SessionEvent::SessionClosed), vec![]);
        assert_eq!(session.handle(SessionEvent::SessionClosed), vec![]);
    }

    #[test]
    fn close_without_feed_is_a_noop() {
        let mut session = Session::new(key());
        session.start();
        assert_eq!(session.handle(SessionEvent::SessionClosed), vec![]);
    }

    #[test]
    fn events_after_close_change_nothing() {
        let mut session = activated_session(vec![msg("m1", "hi")]);
        session.handle(SessionEvent::SessionClosed);
        let before = session.snapshot();

        session.handle(SessionEvent::FeedUp { generation: 0 });
        session.handle(SessionEvent::MessageArrived { generation: 0, message: msg("m2", "late") });
        assert_eq!(session.handle(send_event("hello")), vec![]);
        assert_eq!(
            session.handle(SessionEvent::KeyChanged {
                key: ConversationKey::new(ConversationKind::Group, "g", "g"),
            }),
            vec![]
        );

        assert_eq!(session.snapshot(), before);
    }

    #[test]
    fn community_nexus_scenario() {
        let mut session = Session::new(key());
        session.start();
        session.handle(SessionEvent::RoomResolved { generation: 0, room: room() });
        session.handle(SessionEvent::HistoryLoaded {
            generation: 0,
            messages: vec![msg("m1", "hi")],
        });

        let snapshot = session.snapshot();
        assert_eq!(snapshot.messages.len(), 1);
        assert_eq!(snapshot.messages[0].id.as_deref(), Some("m1"));
        assert!(!snapshot.connected());

        session.handle(SessionEvent::FeedUp { generation: 0 });
        assert!(session.connected());
    }
}
