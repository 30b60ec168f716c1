use std::fs;
use std::path::{Path, PathBuf};

/// Write a text file into the given directory and return its path.
#[allow(dead_code)]
pub fn write_text(dir: &Path, name: &str, text: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, text).unwrap();
    path
}

/// Write a binary file into the given directory and return its path.
#[allow(dead_code)]
pub fn write_bytes(dir: &Path, name: &str, data: &[u8]) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, data).unwrap();
    path
}

/// The "nucleon" header: a 41³ intensity volume of bytes.
#[allow(dead_code)]
pub fn nucleon_header(raw_name: &str) -> String {
    format!(
        "ObjectFileName: {}\n\
         Resolution:     41 41 41\n\
         SliceThickness: 1.0 1.0 1.0\n\
         Format:         UCHAR\n\
         ObjectModel:    I\n",
        raw_name
    )
}

/// A payload where every voxel holds its slice index.
#[allow(dead_code)]
pub fn slice_index_payload(dim: [usize; 3]) -> Vec<u8> {
    let plane = dim[0] * dim[1];
    (0..plane * dim[2]).map(|i| (i / plane) as u8).collect()
}
