#![no_main]
use libfuzzer_sys::fuzz_target;
use std::io::Cursor;
use std::path::Path;
use volread::vendor::TaggedHeader;
use volread::Logger;

fuzz_target!(|data: &[u8]| {
    let logger = Logger::new("fuzz");
    if let Ok(header) = TaggedHeader::scan(Cursor::new(data), Path::new("fuzz.us"), &logger) {
        let _ = header.frame_bytes();
        let _ = header.hints();
    }
});
