//! Types for error handling go here.
use std::io::Error as IOError;
use std::path::PathBuf;

quick_error! {
    /// Error type for all error variants originated by this crate.
    #[derive(Debug)]
    pub enum VolumeError {
        /// The locator does not resolve to a readable file or stream.
        NotFound(path: PathBuf, err: IOError) {
            display("Unable to open {} for reading: {}", path.display(), err)
            source(err)
        }
        /// The payload holds fewer bytes than the declared shape requires.
        Truncated(path: PathBuf, expected: u64, got: u64) {
            display("Unexpected EOF in {}: expected {} bytes, got {} (file truncated or layout invalid)",
                    path.display(), expected, got)
        }
        /// A header is missing required keys, or its arguments could not be parsed.
        CorruptedHeader(path: PathBuf, reason: String) {
            display("Corrupted meta-data in {}: {}", path.display(), reason)
        }
        /// A channel layout, scalar format or pairing of both has no known mapping.
        UnsupportedFormat(what: String) {
            display("Unsupported format: {}", what)
        }
        /// The reader does not provide the requested capability.
        UnsupportedOperation(what: &'static str) {
            display("Operation not supported by this reader: {}", what)
        }
        /// Caller or header declared parameters which violate the decoding contract.
        InvalidParameters(reason: String) {
            display("Invalid parameters: {}", reason)
        }
        /// The requested time frame is not part of the volume.
        TimeFrameNotInVolume(frame: usize, frames: usize) {
            display("Specified time frame not in volume: {} (volume has {} frames)", frame, frames)
        }
        /// The voxel buffer could not be allocated.
        Allocation(bytes: u64) {
            display("Failed to allocate a voxel buffer of {} bytes", bytes)
        }
        /// I/O Error
        Io(err: IOError) {
            from()
            source(err)
        }
    }
}

/// Coarse classification of a [`VolumeError`].
///
/// [`VolumeError`]: ./enum.VolumeError.html
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub enum ErrorKind {
    /// The locator does not resolve to a readable file.
    NotFound,
    /// Truncated payload or corrupted meta-data.
    Corrupted,
    /// Unknown format token, layout or reader capability.
    UnsupportedFormat,
    /// Out-of-range dimensions, time frames or ranges.
    InvalidParameters,
    /// A buffer of the computed size could not be allocated.
    AllocationFailure,
    /// Any other I/O failure during a read.
    Io,
}

impl VolumeError {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            VolumeError::NotFound(..) => ErrorKind::NotFound,
            VolumeError::Truncated(..) | VolumeError::CorruptedHeader(..) => ErrorKind::Corrupted,
            VolumeError::UnsupportedFormat(..) | VolumeError::UnsupportedOperation(..) => {
                ErrorKind::UnsupportedFormat
            }
            VolumeError::InvalidParameters(..) | VolumeError::TimeFrameNotInVolume(..) => {
                ErrorKind::InvalidParameters
            }
            VolumeError::Allocation(..) => ErrorKind::AllocationFailure,
            VolumeError::Io(..) => ErrorKind::Io,
        }
    }
}

/// Alias type for results originated from this crate.
pub type Result<T> = ::std::result::Result<T, VolumeError>;
