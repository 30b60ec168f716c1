//! Readers for scientific volume files: raw voxel payloads described by a
//! text header or a vendor specific binary preamble, and multi-page TIFF
//! image stacks.
//!
//! Every reader produces a [`VolumeBatch`] of [`DecodedVolume`]s, each one
//! holding its voxels in the host's byte order, x varying fastest, together
//! with spacing, transform and an origin locator which reproduces the read.
//!
//! # Example
//!
//! ```no_run
//! use volread::{read_volumes, VolumeUrl};
//! # use volread::error::Result;
//!
//! # fn run() -> Result<()> {
//! let batch = read_volumes("scans/nucleon.dat")?;
//! for volume in &batch {
//!     println!("{:?} voxels from {}", volume.dim(), volume.origin());
//! }
//!
//! // a raw payload, described in the locator itself
//! let url = VolumeUrl::parse("raw://scans/head.raw?dim_x=256&dim_y=256&dim_z=109&format=USHORT");
//! let head = read_volumes(url)?;
//! # Ok(())
//! # }
//! ```
//!
//! [`VolumeBatch`]: ./volume/struct.VolumeBatch.html
//! [`DecodedVolume`]: ./volume/struct.DecodedVolume.html
#![deny(missing_debug_implementations)]
#![warn(missing_docs, unused_extern_crates, trivial_casts, unused_results)]

#[macro_use]
extern crate quick_error;
#[macro_use]
extern crate num_derive;

#[macro_use]
mod logging;

#[cfg(feature = "nalgebra_affine")]
pub mod affine;
pub mod error;
pub mod format;
pub mod hints;
pub mod raw;
pub mod reader;
pub mod text;
pub mod typedef;
pub mod url;
mod util;
pub mod vendor;
pub mod volume;
pub mod writer;

pub use crate::error::{ErrorKind, Result, VolumeError};
pub use crate::format::{DatVolumeReader, MhdVolumeReader, TiffStackReader};
pub use crate::hints::DecodeHints;
pub use crate::logging::Logger;
pub use crate::raw::{ProgressSink, RawVoxelDecoder};
pub use crate::reader::{read_volumes, reader_for, VolumeReader};
pub use crate::typedef::{ChannelLayout, Modality, ScalarFormat, SliceOrder, VoxelType};
pub use crate::url::VolumeUrl;
pub use crate::vendor::{
    AnalyzeVolumeReader, PvmVolumeReader, QuadHidacVolumeReader, TaggedVolumeReader,
};
#[cfg(feature = "ndarray_volumes")]
pub use crate::volume::ndarray::IntoNdArray;
pub use crate::volume::{DecodedVolume, VolumeBatch, VoxelBuffer};
pub use crate::writer::write_dat;
