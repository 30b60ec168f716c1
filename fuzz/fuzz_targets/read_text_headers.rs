#![no_main]
use libfuzzer_sys::fuzz_target;
use std::path::Path;
use volread::format::MhdHeader;
use volread::vendor::{PvmHeader, QuadHidacHeader};
use volread::Logger;

fuzz_target!(|data: &[u8]| {
    let logger = Logger::new("fuzz");
    if let Ok(header) = MhdHeader::from_reader(data, Path::new("fuzz.mhd"), &logger) {
        let _ = header.frame_bytes();
    }
    if let Ok(header) = QuadHidacHeader::from_reader(data, Path::new("fuzz.i4d"), &logger) {
        let _ = header.frame_hints(0).validate();
    }
    if let Ok(header) = PvmHeader::from_bytes(data, Path::new("fuzz.pvm")) {
        let _ = header.hints();
    }
});
