#![no_main]
use libfuzzer_sys::fuzz_target;
use std::path::Path;
use volread::vendor::{AnalyzeHeader, AnalyzeVolumeReader};

fuzz_target!(|data: &[u8]| {
    let path = Path::new("fuzz.nii");
    if let Ok(header) = AnalyzeHeader::from_reader(data, path) {
        let _ = AnalyzeVolumeReader::new().hints(&header, path);
        let _ = header.num_volumes(path);
        let _ = header.transform();
    }
});
