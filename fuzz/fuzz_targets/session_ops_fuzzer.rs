//! Fuzz target for the session state machine
//!
//! Drives a Session through arbitrary event sequences with arbitrary
//! generation tags.
//!
//! # Strategy
//!
//! - Events arrive in any order, including before start and after close
//! - Generation tags are drawn from a small range so stale, current, and
//!   future tags all occur often
//! - Conversation switches bump the live generation mid-sequence
//!
//! # Invariants
//!
//! - handle() never panics, whatever the ordering
//! - An event whose generation does not match the session's produces no
//!   actions and no state change
//! - A connected snapshot always carries a resolved room

#![no_main]

use arbitrary::Arbitrary;
use chrono::{DateTime, Utc};
use libfuzzer_sys::fuzz_target;
use roomwire_core::{Session, SessionEvent};
use roomwire_proto::{
    ConversationKey, ConversationKind, Message, MessageKind, Room, RoomId, Sender,
};

#[derive(Debug, Arbitrary)]
enum Op {
    Start,
    Resolved { generation: u8, fail: bool },
    History { generation: u8, fail: bool, count: u8 },
    FeedUp { generation: u8 },
    FeedDown { generation: u8 },
    FeedFailed { generation: u8 },
    Arrived { generation: u8, text: u8 },
    Send { text: u8 },
    Switch { target: u8 },
    Close,
}

fn room(target: u8) -> Room {
    Room {
        id: RoomId::new(format!("room-{target}")),
        kind: ConversationKind::Group,
        target_id: format!("g-{target}"),
        name: "Fuzz Room".to_owned(),
    }
}

fn message(text: u8) -> Message {
    Message {
        id: Some(format!("m-{text}")),
        sender: Sender::new("peer"),
        content: format!("payload {text}"),
        kind: MessageKind::Text,
        created_at: DateTime::<Utc>::UNIX_EPOCH,
    }
}

/// Generation tag carried by the event, if it is a completion.
fn event_generation(event: &SessionEvent) -> Option<u64> {
    match event {
        SessionEvent::RoomResolved { generation, .. }
        | SessionEvent::RoomResolveFailed { generation, .. }
        | SessionEvent::HistoryLoaded { generation, .. }
        | SessionEvent::HistoryFailed { generation, .. }
        | SessionEvent::FeedUp { generation }
        | SessionEvent::FeedDown { generation }
        | SessionEvent::FeedFailed { generation }
        | SessionEvent::MessageArrived { generation, .. } => Some(*generation),
        SessionEvent::SendRequested { .. }
        | SessionEvent::KeyChanged { .. }
        | SessionEvent::SessionClosed => None,
    }
}

fn event_for(op: Op) -> SessionEvent {
    match op {
        Op::Start => unreachable!("handled by the driver loop"),
        Op::Resolved { generation, fail } => {
            let generation = u64::from(generation % 4);
            if fail {
                SessionEvent::RoomResolveFailed { generation, reason: "fuzzed failure".to_owned() }
            } else {
                SessionEvent::RoomResolved { generation, room: room(generation as u8) }
            }
        }
        Op::History { generation, fail, count } => {
            let generation = u64::from(generation % 4);
            if fail {
                SessionEvent::HistoryFailed { generation, reason: "fuzzed failure".to_owned() }
            } else {
                let messages = (0..count % 4).map(message).collect();
                SessionEvent::HistoryLoaded { generation, messages }
            }
        }
        Op::FeedUp { generation } => SessionEvent::FeedUp { generation: u64::from(generation % 4) },
        Op::FeedDown { generation } => {
            SessionEvent::FeedDown { generation: u64::from(generation % 4) }
        }
        Op::FeedFailed { generation } => {
            SessionEvent::FeedFailed { generation: u64::from(generation % 4) }
        }
        Op::Arrived { generation, text } => SessionEvent::MessageArrived {
            generation: u64::from(generation % 4),
            message: message(text),
        },
        Op::Send { text } => SessionEvent::SendRequested {
            content: format!("outbound {text}"),
            sender: Sender::new("fuzzer"),
            kind: MessageKind::Text,
            at: DateTime::<Utc>::UNIX_EPOCH,
        },
        Op::Switch { target } => SessionEvent::KeyChanged {
            key: ConversationKey::new(
                ConversationKind::Team,
                format!("t-{}", target % 4),
                "Fuzz Switch",
            ),
        },
        Op::Close => SessionEvent::SessionClosed,
    }
}

fuzz_target!(|ops: Vec<Op>| {
    let key = ConversationKey::new(ConversationKind::Group, "g-0", "Fuzz Room");
    let mut session = Session::new(key);

    for op in ops {
        if matches!(op, Op::Start) {
            let _ = session.start();
            continue;
        }

        let event = event_for(op);
        let stale = event_generation(&event).is_some_and(|g| g != session.generation());
        let before = session.snapshot();

        let actions = session.handle(event);

        if stale {
            assert!(actions.is_empty(), "stale event produced actions: {actions:?}");
            assert_eq!(session.snapshot(), before, "stale event changed state");
        }

        let snapshot = session.snapshot();
        if snapshot.connected() {
            assert!(snapshot.room.is_some(), "connected without a resolved room");
        }
    }
});
