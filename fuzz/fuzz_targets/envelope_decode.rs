//! Fuzz target for message envelope decoding
//!
//! Broker frame bodies and history entries share one JSON envelope shape,
//! and both arrive from the network. Arbitrary bytes must either parse
//! into a well-formed message or return an error:
//! - No panics on truncated or deeply nested JSON
//! - Unknown content type tags fold to MessageKind::Unknown
//! - Parsed envelopes re-encode and re-parse to the same value

#![no_main]

use libfuzzer_sys::fuzz_target;
use roomwire_proto::Message;

fuzz_target!(|data: &[u8]| {
    let Ok(message) = Message::from_json(data) else {
        return;
    };

    let wire = message.to_json().expect("parsed envelope must encode");
    let again = Message::from_json(&wire).expect("re-encoded envelope must decode");
    assert_eq!(message, again, "envelope changed across a round trip");
});
