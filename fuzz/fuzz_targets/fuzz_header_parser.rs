//! Fuzz target: `HeaderParser::scan`
//!
//! Scanning the input in one window and byte by byte must agree.
//!
//! cargo fuzz run fuzz_header_parser

#![no_main]

use libfuzzer_sys::fuzz_target;
use thermo_monitor::ota::{HeaderParser, HeaderScanResult};

fuzz_target!(|data: &[u8]| {
    let mut whole = HeaderParser::default();
    let at_once = whole.scan(data);

    let mut split = HeaderParser::default();
    let mut bytewise = HeaderScanResult::NeedMoreData;
    let mut consumed = 0;
    for (i, b) in data.iter().enumerate() {
        bytewise = split.scan(core::slice::from_ref(b));
        if bytewise != HeaderScanResult::NeedMoreData {
            consumed = i + 1;
            break;
        }
    }

    match (at_once, bytewise) {
        (
            HeaderScanResult::HeaderComplete { header_byte_length, content_length },
            HeaderScanResult::HeaderComplete { content_length: cl, .. },
        ) => {
            assert_eq!(header_byte_length, consumed);
            assert_eq!(content_length, cl);
        }
        (a, b) => assert_eq!(a, b),
    }
    assert_eq!(whole.status_code(), split.status_code());
});
