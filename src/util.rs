//! Private utility module
use crate::error::{Result, VolumeError};
use byteordered::Endianness;
use std::fs::File;
use std::io::{Read, Seek};
use std::path::{Path, PathBuf};

/// A trait that is both Read and Seek.
pub trait ReadSeek: Read + Seek {}
impl<T: Read + Seek> ReadSeek for T {}

/// Open a file for reading, mapping failure to `VolumeError::NotFound`.
pub fn open_file<P: AsRef<Path>>(path: P) -> Result<File> {
    let path = path.as_ref();
    File::open(path).map_err(|e| VolumeError::NotFound(path.to_owned(), e))
}

/// Whether the given path names a gzip compressed file.
pub fn is_gz_file<P: AsRef<Path>>(path: P) -> bool {
    path.as_ref()
        .file_name()
        .map(|a| a.to_string_lossy().ends_with(".gz"))
        .unwrap_or(false)
}

/// Whether the path is absolute in either Unix or Windows notation:
/// a leading `/` or `\`, or a drive letter prefix (`X:/`, `X:\`).
pub fn is_absolute_path(path: &str) -> bool {
    let b = path.as_bytes();
    match b {
        [b'/', ..] | [b'\\', ..] => true,
        [d, b':', b'/', ..] | [d, b':', b'\\', ..] => d.is_ascii_alphabetic(),
        _ => false,
    }
}

/// Resolve a payload file name declared in a header, relative paths being
/// taken from the header's own directory.
pub fn resolve_relative<P: AsRef<Path>>(header_path: P, name: &str) -> PathBuf {
    if is_absolute_path(name) {
        return PathBuf::from(name);
    }
    match header_path.as_ref().parent() {
        Some(dir) => dir.join(name),
        None => PathBuf::from(name),
    }
}

/// The endianness of the running system.
pub fn native_endianness() -> Endianness {
    Endianness::native()
}

/// Swap the bytes of every `width` wide element of the given buffer, in place.
pub fn swap_bytes_in_place(data: &mut [u8], width: usize) {
    if width < 2 {
        return;
    }
    for chunk in data.chunks_exact_mut(width) {
        chunk.reverse();
    }
}
