//! The reader capability interface and reader selection.
//!
//! Every format reader produces a [`VolumeBatch`] from a locator. Partial
//! reads are optional capabilities: a reader announces them through
//! `supports_slices` and `supports_bricks`, and the default methods fail
//! with `VolumeError::UnsupportedOperation`.
//!
//! [`VolumeBatch`]: ../volume/struct.VolumeBatch.html
use crate::error::{Result, VolumeError};
use crate::format::{DatVolumeReader, MhdVolumeReader, TiffStackReader};
use crate::raw::RawVoxelDecoder;
use crate::url::VolumeUrl;
use crate::vendor::{
    AnalyzeVolumeReader, PvmVolumeReader, QuadHidacVolumeReader, TaggedVolumeReader,
};
use crate::volume::VolumeBatch;

/// A reader of one volume file format.
pub trait VolumeReader: std::fmt::Debug {
    /// A human readable name of the format.
    fn name(&self) -> &'static str;

    /// Lower case file extensions handled by this reader.
    fn extensions(&self) -> &'static [&'static str];

    /// Locator protocols handled by this reader.
    fn protocols(&self) -> &'static [&'static str];

    /// Read every volume the locator designates.
    fn read(&mut self, url: &VolumeUrl) -> Result<VolumeBatch>;

    /// Whether `read_slices` is available.
    fn supports_slices(&self) -> bool {
        false
    }

    /// Read the slices `first..last` of the designated volume.
    fn read_slices(&mut self, _url: &VolumeUrl, _first: usize, _last: usize) -> Result<VolumeBatch> {
        Err(VolumeError::UnsupportedOperation("slice reads"))
    }

    /// Whether `read_brick` is available.
    fn supports_bricks(&self) -> bool {
        false
    }

    /// Read a cube of `size` voxels per side starting at voxel `start`.
    fn read_brick(&mut self, _url: &VolumeUrl, _start: [usize; 3], _size: usize) -> Result<VolumeBatch> {
        Err(VolumeError::UnsupportedOperation("brick reads"))
    }
}

impl VolumeReader for RawVoxelDecoder {
    fn name(&self) -> &'static str {
        "Raw Volume Reader"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["raw"]
    }

    fn protocols(&self) -> &'static [&'static str] {
        &["raw"]
    }

    fn read(&mut self, url: &VolumeUrl) -> Result<VolumeBatch> {
        RawVoxelDecoder::read(self, url)
    }

    fn supports_slices(&self) -> bool {
        true
    }

    fn read_slices(&mut self, url: &VolumeUrl, first: usize, last: usize) -> Result<VolumeBatch> {
        RawVoxelDecoder::read_slices(self, url, first, last)
    }

    fn supports_bricks(&self) -> bool {
        true
    }

    fn read_brick(&mut self, url: &VolumeUrl, start: [usize; 3], size: usize) -> Result<VolumeBatch> {
        RawVoxelDecoder::read_brick(self, url, start, size)
    }
}

/// All known readers, in selection order.
pub fn all_readers() -> Vec<Box<dyn VolumeReader>> {
    vec![
        Box::new(RawVoxelDecoder::default()),
        Box::new(DatVolumeReader::new()),
        Box::new(MhdVolumeReader::new()),
        Box::new(QuadHidacVolumeReader::new()),
        Box::new(PvmVolumeReader::new()),
        Box::new(TaggedVolumeReader::new()),
        Box::new(AnalyzeVolumeReader::new()),
        Box::new(TiffStackReader::new()),
    ]
}

/// Choose a reader for a locator, by protocol first and file extension
/// second.
///
/// # Errors
///
/// - `VolumeError::UnsupportedFormat` if no reader claims the locator.
pub fn reader_for(url: &VolumeUrl) -> Result<Box<dyn VolumeReader>> {
    let mut readers = all_readers();
    let found = match url.protocol() {
        Some(p) => readers
            .iter()
            .position(|r| r.protocols().iter().any(|q| q.eq_ignore_ascii_case(p))),
        None => url.extension().and_then(|ext| {
            readers
                .iter()
                .position(|r| r.extensions().iter().any(|e| *e == ext))
        }),
    };
    match found {
        Some(i) => Ok(readers.swap_remove(i)),
        None => Err(VolumeError::UnsupportedFormat(format!(
            "no reader for {}",
            url
        ))),
    }
}

/// Read every volume the locator designates with the reader chosen by
/// `reader_for`.
pub fn read_volumes<U: Into<VolumeUrl>>(url: U) -> Result<VolumeBatch> {
    let url = url.into();
    let mut reader = reader_for(&url)?;
    reader.read(&url)
}
