//! Property-based tests for session sequencing
//!
//! Drive the state machine with generated event schedules and check the
//! invariants that hold regardless of timing: stale completions are inert,
//! seeded history always precedes live arrivals, and sends only publish
//! while the link is connected.

use chrono::{TimeZone, Utc};
use proptest::prelude::*;
use roomwire_core::{Session, SessionAction, SessionEvent};
use roomwire_proto::{
    ConversationKey, ConversationKind, Message, MessageKind, Room, RoomId, Sender,
};

fn arbitrary_kind() -> impl Strategy<Value = ConversationKind> {
    prop_oneof![
        Just(ConversationKind::Group),
        Just(ConversationKind::Event),
        Just(ConversationKind::Team),
        Just(ConversationKind::Direct),
    ]
}

fn arbitrary_key() -> impl Strategy<Value = ConversationKey> {
    (arbitrary_kind(), "[a-z0-9_-]{1,12}", "[a-zA-Z0-9 ]{1,16}")
        .prop_map(|(kind, target, name)| ConversationKey::new(kind, target, name))
}

fn arbitrary_room() -> impl Strategy<Value = Room> {
    (arbitrary_kind(), "[a-z0-9-]{1,12}", "[a-z0-9_-]{1,12}", "[a-zA-Z0-9 ]{1,16}").prop_map(
        |(kind, id, target_id, name)| Room { id: RoomId::new(id), kind, target_id, name },
    )
}

fn arbitrary_message() -> impl Strategy<Value = Message> {
    (
        proptest::option::of("[a-z0-9]{1,8}"),
        "[a-z0-9]{1,8}",
        "[ -~]{0,24}",
        0i64..4_102_444_800i64,
    )
        .prop_map(|(id, sender, content, secs)| Message {
            id,
            sender: Sender::new(sender),
            content,
            kind: MessageKind::Text,
            created_at: Utc.timestamp_opt(secs, 0).single().expect("seconds in range"),
        })
}

fn event_at(generation: u64) -> impl Strategy<Value = SessionEvent> {
    prop_oneof![
        arbitrary_room().prop_map(move |room| SessionEvent::RoomResolved { generation, room }),
        "[ -~]{0,16}"
            .prop_map(move |reason| SessionEvent::RoomResolveFailed { generation, reason }),
        proptest::collection::vec(arbitrary_message(), 0..4)
            .prop_map(move |messages| SessionEvent::HistoryLoaded { generation, messages }),
        "[ -~]{0,16}".prop_map(move |reason| SessionEvent::HistoryFailed { generation, reason }),
        Just(SessionEvent::FeedUp { generation }),
        Just(SessionEvent::FeedDown { generation }),
        Just(SessionEvent::FeedFailed { generation }),
        arbitrary_message()
            .prop_map(move |message| SessionEvent::MessageArrived { generation, message }),
    ]
}

fn send_event(content: &str) -> SessionEvent {
    SessionEvent::SendRequested {
        content: content.into(),
        sender: Sender::new("u1"),
        kind: MessageKind::Text,
        at: Utc.timestamp_opt(0, 0).single().expect("epoch"),
    }
}

/// PROPERTY: completions tagged with a superseded generation never change
/// observable state or emit actions, whatever they carry and in whatever
/// order they land.
#[test]
fn prop_stale_events_are_inert() {
    proptest!(|(
        key in arbitrary_key(),
        events in proptest::collection::vec(event_at(0), 1..12)
    )| {
        let mut session = Session::new(key.clone());
        session.start();
        // Switching keys bumps the generation, so everything tagged 0 is stale.
        session.handle(SessionEvent::KeyChanged { key });
        let before = session.snapshot();

        for event in events {
            prop_assert_eq!(session.handle(event), vec![]);
        }
        prop_assert_eq!(session.snapshot(), before);
    });
}

/// PROPERTY: the seeded history is a prefix of the message sequence and
/// live arrivals follow it in delivery order.
#[test]
fn prop_history_is_a_prefix() {
    proptest!(|(
        key in arbitrary_key(),
        room in arbitrary_room(),
        history in proptest::collection::vec(arbitrary_message(), 0..6),
        live in proptest::collection::vec(arbitrary_message(), 0..6)
    )| {
        let mut session = Session::new(key);
        session.start();
        session.handle(SessionEvent::RoomResolved { generation: 0, room });
        session.handle(SessionEvent::HistoryLoaded {
            generation: 0,
            messages: history.clone(),
        });
        session.handle(SessionEvent::FeedUp { generation: 0 });
        for message in live.clone() {
            session.handle(SessionEvent::MessageArrived { generation: 0, message });
        }

        let messages = session.snapshot().messages;
        prop_assert_eq!(&messages[..history.len()], &history[..]);
        prop_assert_eq!(&messages[history.len()..], &live[..]);
    });
}

/// PROPERTY: a send publishes exactly once while connected and is a silent
/// no-op in every other phase, never touching the local sequence either way.
#[test]
fn prop_send_gating() {
    proptest!(|(
        key in arbitrary_key(),
        room in arbitrary_room(),
        content in "[ -~]{1,32}"
    )| {
        let room_id = room.id.clone();
        let mut session = Session::new(key);

        prop_assert_eq!(session.handle(send_event(&content)), vec![]);
        session.start();
        prop_assert_eq!(session.handle(send_event(&content)), vec![]);
        session.handle(SessionEvent::RoomResolved { generation: 0, room });
        prop_assert_eq!(session.handle(send_event(&content)), vec![]);
        session.handle(SessionEvent::HistoryLoaded { generation: 0, messages: vec![] });
        prop_assert_eq!(session.handle(send_event(&content)), vec![]);

        session.handle(SessionEvent::FeedUp { generation: 0 });
        let actions = session.handle(send_event(&content));
        match actions.as_slice() {
            [SessionAction::Publish { destination, envelope }] => {
                prop_assert_eq!(destination, &format!("/app/chat/{room_id}"));
                prop_assert_eq!(&envelope.content, &content);
            }
            other => prop_assert!(false, "expected one publish, got {other:?}"),
        }
        prop_assert!(session.snapshot().messages.is_empty());

        session.handle(SessionEvent::FeedDown { generation: 0 });
        prop_assert_eq!(session.handle(send_event(&content)), vec![]);
    });
}

/// PROPERTY: the derived `connected` flag tracks exactly the last feed
/// report.
#[test]
fn prop_connected_tracks_last_report() {
    proptest!(|(
        key in arbitrary_key(),
        room in arbitrary_room(),
        reports in proptest::collection::vec(any::<bool>(), 1..16)
    )| {
        let mut session = Session::new(key);
        session.start();
        session.handle(SessionEvent::RoomResolved { generation: 0, room });
        session.handle(SessionEvent::HistoryLoaded { generation: 0, messages: vec![] });

        let mut last = false;
        for up in reports {
            if up {
                session.handle(SessionEvent::FeedUp { generation: 0 });
            } else {
                session.handle(SessionEvent::FeedDown { generation: 0 });
            }
            last = up;
        }
        prop_assert_eq!(session.snapshot().connected(), last);
    });
}
