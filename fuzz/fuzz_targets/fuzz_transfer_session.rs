//! Fuzz target: `TransferSession::feed`
//!
//! The first byte picks a chunk size; the rest is fed as a response split
//! into chunks of that size, followed by a close. Asserts that the session
//! never panics, never emits more than it declared, and never yields
//! payload outside the chunk it was given.
//!
//! cargo fuzz run fuzz_transfer_session

#![no_main]

use libfuzzer_sys::fuzz_target;
use thermo_monitor::ota::{SessionLimits, TransferSession};

fuzz_target!(|data: &[u8]| {
    let Some((&size, rest)) = data.split_first() else {
        return;
    };
    let size = usize::from(size).max(1);

    let mut session = TransferSession::new(SessionLimits {
        max_header_line: 256,
        max_header_len: 1024,
        max_image_size: 64 * 1024,
    });

    let mut emitted = 0usize;
    for chunk in rest.chunks(size).chain(core::iter::once(&[][..])) {
        match session.feed(chunk) {
            Ok(feed) => {
                assert!(feed.payload.len() <= chunk.len());
                emitted += feed.payload.len();
                if feed.complete {
                    break;
                }
            }
            Err(e) => {
                // Failure is sticky.
                assert_eq!(session.feed(b"x").err(), Some(e));
                break;
            }
        }
    }

    assert_eq!(emitted, session.bytes_seen_total() as usize);
    if let Some(declared) = session.declared_length() {
        assert!(emitted <= declared as usize);
    }
});
