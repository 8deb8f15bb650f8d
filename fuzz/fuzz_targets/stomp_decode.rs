//! Fuzz target for STOMP frame decoding
//!
//! Feeds arbitrary byte sequences to Frame::decode to find:
//! - Parser crashes or panics
//! - Slicing past frame boundaries
//! - Header escape sequences that bypass validation
//!
//! Decoding must never panic; invalid input returns an error. Anything
//! that does decode must re-encode to decodable bytes, and commands with
//! escaped headers must survive the round trip unchanged. CONNECT and
//! CONNECTED send headers raw, so a value ending in a bare CR is folded
//! into the line ending; only re-decodability holds for them.

#![no_main]

use libfuzzer_sys::fuzz_target;
use roomwire_proto::stomp::Frame;

fuzz_target!(|data: &[u8]| {
    let Ok(frame) = Frame::decode(data) else {
        return;
    };

    if let Ok(wire) = frame.encode() {
        let again = Frame::decode(&wire).expect("re-encoded frame must decode");
        if frame.command.escapes_headers() {
            assert_eq!(frame, again, "frame changed across a round trip");
        }
    }
});
