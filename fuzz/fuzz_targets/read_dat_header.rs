#![no_main]
use libfuzzer_sys::fuzz_target;
use std::path::Path;
use volread::format::DatHeader;
use volread::Logger;

fuzz_target!(|data: &[u8]| {
    let logger = Logger::new("fuzz");
    if let Ok(header) = DatHeader::from_reader(data, Path::new("fuzz.dat"), &logger) {
        let _ = header.hints.validate();
        let _ = header.hints.to_url(header.raw_path("fuzz.dat")).to_string();
    }
});
