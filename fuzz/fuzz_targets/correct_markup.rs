#![no_main]

use custom_elements_parser::roundtrip::{correct_markup, parse_content, serialize_document};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(content) = std::str::from_utf8(data) else {
        return;
    };

    let dom = parse_content(content);
    if let Ok(serialized) = serialize_document(&dom) {
        let _ = correct_markup(&serialized, content, true);
    }
});
