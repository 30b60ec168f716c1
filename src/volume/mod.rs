//! This module defines the decoded volume types: the owned voxel buffer,
//! a decoded volume with its geometry and provenance, and the ordered batch
//! returned by every read operation.
//! An integration with `ndarray` allows for more elegant and
//! efficient approaches, and should be preferred when possible.
//! In order to do so, you must add the `ndarray_volumes` feature
//! to this crate.

pub mod element;
pub mod order;
mod util;

#[cfg(feature = "ndarray_volumes")]
pub mod ndarray;

pub use self::element::DataElement;
use self::util::{byte_len, coords_to_index};
use crate::error::{Result, VolumeError};
use crate::hints::IDENTITY;
use crate::typedef::{Axis, ChannelLayout, Modality, ScalarFormat, VoxelType};
use crate::url::VolumeUrl;
use crate::util::swap_bytes_in_place;
use byteordered::Endianness;
use num_traits::AsPrimitive;
use rgb::{FromSlice, RGB8, RGBA8};

/// An owned, contiguous voxel grid in x-fastest order, always held in the
/// host's byte order once decoding has finished.
#[derive(Debug, PartialEq, Clone)]
pub struct VoxelBuffer {
    dim: [usize; 3],
    voxel_type: VoxelType,
    raw_data: Vec<u8>,
}

impl VoxelBuffer {
    /// Allocate a zero filled buffer.
    ///
    /// # Errors
    ///
    /// - `VolumeError::Allocation` if the byte size overflows or the memory
    /// cannot be reserved.
    pub fn zeroed(dim: [usize; 3], voxel_type: VoxelType) -> Result<Self> {
        let len = byte_len(dim, voxel_type.bytes_per_voxel()).ok_or_else(|| {
            VolumeError::Allocation(
                dim.iter()
                    .fold(voxel_type.bytes_per_voxel() as u64, |a, &d| {
                        a.saturating_mul(d as u64)
                    }),
            )
        })?;
        let mut raw_data = Vec::new();
        raw_data
            .try_reserve_exact(len)
            .map_err(|_| VolumeError::Allocation(len as u64))?;
        raw_data.resize(len, 0);
        Ok(VoxelBuffer {
            dim,
            voxel_type,
            raw_data,
        })
    }

    /// Wrap existing bytes in host byte order.
    ///
    /// # Errors
    ///
    /// - `VolumeError::InvalidParameters` if the length does not match the
    /// shape and voxel type.
    pub fn from_raw_data(dim: [usize; 3], voxel_type: VoxelType, raw_data: Vec<u8>) -> Result<Self> {
        let expected = byte_len(dim, voxel_type.bytes_per_voxel());
        if expected != Some(raw_data.len()) {
            return Err(VolumeError::InvalidParameters(format!(
                "{} bytes do not hold {:?} voxels of type {}",
                raw_data.len(),
                dim,
                voxel_type
            )));
        }
        Ok(VoxelBuffer {
            dim,
            voxel_type,
            raw_data,
        })
    }

    /// The number of voxels along x, y and z.
    pub fn dim(&self) -> [usize; 3] {
        self.dim
    }

    /// The voxel type.
    pub fn voxel_type(&self) -> VoxelType {
        self.voxel_type
    }

    /// The scalar format of each channel.
    pub fn scalar_format(&self) -> ScalarFormat {
        self.voxel_type.format()
    }

    /// The number of bytes per voxel.
    pub fn bytes_per_voxel(&self) -> usize {
        self.voxel_type.bytes_per_voxel()
    }

    /// The number of voxels.
    pub fn voxel_count(&self) -> usize {
        self.dim.iter().product()
    }

    /// Retrieve a reference to the raw data.
    pub fn raw_data(&self) -> &[u8] {
        &self.raw_data
    }

    /// Retrieve a mutable reference to the raw data.
    pub fn raw_data_mut(&mut self) -> &mut [u8] {
        &mut self.raw_data
    }

    /// Retrieve the raw data, consuming the buffer.
    pub fn into_raw_data(self) -> Vec<u8> {
        self.raw_data
    }

    /// Fetch one channel of a voxel as a double precision value.
    ///
    /// # Errors
    ///
    /// - `VolumeError::InvalidParameters` if the coordinates or the channel
    /// are out of bounds.
    pub fn get_f64(&self, coords: [usize; 3], channel: usize) -> Result<f64> {
        let channels = self.voxel_type.channels();
        if channel >= channels {
            return Err(VolumeError::InvalidParameters(format!(
                "channel {} out of bounds for {} channels",
                channel, channels
            )));
        }
        let index = coords_to_index(coords, self.dim)?;
        let size = self.scalar_format().size_of();
        let at = &self.raw_data[(index * channels + channel) * size..];
        let e = Endianness::native();
        let v = match self.scalar_format() {
            ScalarFormat::Uint8 => read_as_f64::<u8>(at, e)?,
            ScalarFormat::Int8 => read_as_f64::<i8>(at, e)?,
            ScalarFormat::Uint16 | ScalarFormat::Uint16Bits12 => read_as_f64::<u16>(at, e)?,
            ScalarFormat::Int16 => read_as_f64::<i16>(at, e)?,
            ScalarFormat::Uint32 => read_as_f64::<u32>(at, e)?,
            ScalarFormat::Int32 => read_as_f64::<i32>(at, e)?,
            ScalarFormat::Uint64 => read_as_f64::<u64>(at, e)?,
            ScalarFormat::Int64 => read_as_f64::<i64>(at, e)?,
            ScalarFormat::Float32 => read_as_f64::<f32>(at, e)?,
            ScalarFormat::Float64 => read_as_f64::<f64>(at, e)?,
        };
        Ok(v)
    }

    /// Fetch one channel of a voxel as a single precision value.
    pub fn get_f32(&self, coords: [usize; 3], channel: usize) -> Result<f32> {
        let v = self.get_f64(coords, channel)?;
        Ok(v as f32)
    }

    /// Copy all scalars out as elements of type `T`, channels interleaved.
    ///
    /// # Errors
    ///
    /// - `VolumeError::UnsupportedFormat` if `T` does not match the buffer's
    /// scalar format.
    pub fn to_vec<T: DataElement>(&self) -> Result<Vec<T>> {
        if !T::accepts(self.scalar_format()) {
            return Err(VolumeError::UnsupportedFormat(format!(
                "cannot view {} data as {}",
                self.scalar_format(),
                T::SCALAR_FORMAT
            )));
        }
        Ok(T::from_raw_vec(&self.raw_data))
    }

    /// Copy the voxels out as colour triplets.
    ///
    /// # Errors
    ///
    /// - `VolumeError::UnsupportedFormat` unless the voxels are `RGB/UCHAR`.
    pub fn to_rgb8(&self) -> Result<Vec<RGB8>> {
        self.expect_colour(ChannelLayout::Rgb)?;
        Ok(self.raw_data.as_rgb().to_vec())
    }

    /// Copy the voxels out as colour quadruplets.
    ///
    /// # Errors
    ///
    /// - `VolumeError::UnsupportedFormat` unless the voxels are `RGBA/UCHAR`.
    pub fn to_rgba8(&self) -> Result<Vec<RGBA8>> {
        self.expect_colour(ChannelLayout::Rgba)?;
        Ok(self.raw_data.as_rgba().to_vec())
    }

    fn expect_colour(&self, layout: ChannelLayout) -> Result<()> {
        if self.voxel_type.layout() != layout || self.scalar_format() != ScalarFormat::Uint8 {
            return Err(VolumeError::UnsupportedFormat(format!(
                "cannot view {} data as {}/UCHAR",
                self.voxel_type, layout
            )));
        }
        Ok(())
    }

    /// Reverse the byte order of every scalar, in place.
    pub fn swap_endianness(&mut self) {
        let width = self.scalar_format().size_of();
        swap_bytes_in_place(&mut self.raw_data, width);
    }

    /// Reverse the voxels along an axis, in place.
    pub fn reverse_axis(&mut self, axis: Axis) {
        let voxel_size = self.bytes_per_voxel();
        order::reverse_axis(&mut self.raw_data, self.dim, voxel_size, axis);
    }
}

fn read_as_f64<T: DataElement>(at: &[u8], e: Endianness) -> Result<f64> {
    let v = T::from_raw(at, e)?;
    Ok(AsPrimitive::<f64>::as_(v))
}

/// One decoded volume: a voxel buffer with its geometry and a locator
/// which reproduces the read.
#[derive(Debug, PartialEq, Clone)]
pub struct DecodedVolume {
    buffer: VoxelBuffer,
    spacing: [f32; 3],
    transform: [[f32; 4]; 4],
    modality: Modality,
    time_step: f32,
    hash: Option<String>,
    origin: VolumeUrl,
}

impl DecodedVolume {
    /// Wrap a buffer with unit spacing, identity transform and the given
    /// origin.
    pub fn new(buffer: VoxelBuffer, origin: VolumeUrl) -> Self {
        DecodedVolume {
            buffer,
            spacing: [1.; 3],
            transform: IDENTITY,
            modality: Modality::Unknown,
            time_step: 0.,
            hash: None,
            origin,
        }
    }

    /// Set the spacing.
    pub fn with_spacing(mut self, spacing: [f32; 3]) -> Self {
        self.spacing = spacing;
        self
    }

    /// Set the voxel to world transform.
    pub fn with_transform(mut self, transform: [[f32; 4]; 4]) -> Self {
        self.transform = transform;
        self
    }

    /// Set the modality.
    pub fn with_modality(mut self, modality: Modality) -> Self {
        self.modality = modality;
        self
    }

    /// Set the content hash.
    pub fn with_hash(mut self, hash: Option<String>) -> Self {
        self.hash = hash;
        self
    }

    /// The voxel buffer.
    pub fn buffer(&self) -> &VoxelBuffer {
        &self.buffer
    }

    /// Mutable access to the voxel buffer.
    pub fn buffer_mut(&mut self) -> &mut VoxelBuffer {
        &mut self.buffer
    }

    /// Move the buffer out, discarding the rest.
    pub fn into_buffer(self) -> VoxelBuffer {
        self.buffer
    }

    /// Shorthand for the buffer's dimensions.
    pub fn dim(&self) -> [usize; 3] {
        self.buffer.dim()
    }

    /// Physical voxel size per axis.
    pub fn spacing(&self) -> [f32; 3] {
        self.spacing
    }

    /// Voxel to world transformation, row major.
    pub fn transform(&self) -> &[[f32; 4]; 4] {
        &self.transform
    }

    /// Acquisition modality.
    pub fn modality(&self) -> Modality {
        self.modality
    }

    /// Position of this volume in its time series.
    pub fn time_step(&self) -> f32 {
        self.time_step
    }

    /// Set the time step.
    pub fn set_time_step(&mut self, t: f32) {
        self.time_step = t;
    }

    /// Checksum carried over from the header.
    pub fn hash(&self) -> Option<&str> {
        self.hash.as_ref().map(String::as_str)
    }

    /// Locator which reproduces this volume.
    pub fn origin(&self) -> &VolumeUrl {
        &self.origin
    }

    /// Replace the origin locator.
    pub fn set_origin(&mut self, origin: VolumeUrl) {
        self.origin = origin;
    }
}

/// An ordered collection of decoded volumes.
#[derive(Debug, PartialEq, Clone, Default)]
pub struct VolumeBatch {
    volumes: Vec<DecodedVolume>,
}

impl VolumeBatch {
    /// An empty batch.
    pub fn new() -> Self {
        VolumeBatch::default()
    }

    /// Append a volume.
    pub fn push(&mut self, volume: DecodedVolume) {
        self.volumes.push(volume);
    }

    /// Append all volumes of another batch, keeping their order.
    pub fn append(&mut self, other: VolumeBatch) {
        self.volumes.extend(other.volumes);
    }

    /// The number of volumes.
    pub fn len(&self) -> usize {
        self.volumes.len()
    }

    /// Whether nothing was decoded.
    pub fn is_empty(&self) -> bool {
        self.volumes.is_empty()
    }

    /// The only volume, if the batch holds exactly one.
    pub fn single(&self) -> Option<&DecodedVolume> {
        match self.volumes.as_slice() {
            [v] => Some(v),
            _ => None,
        }
    }

    /// Consume the batch into its only volume, if it holds exactly one.
    pub fn into_single(mut self) -> Option<DecodedVolume> {
        if self.volumes.len() == 1 {
            self.volumes.pop()
        } else {
            None
        }
    }

    /// Get a volume by position.
    pub fn get(&self, i: usize) -> Option<&DecodedVolume> {
        self.volumes.get(i)
    }

    /// Iterate over the volumes in order.
    pub fn iter(&self) -> std::slice::Iter<DecodedVolume> {
        self.volumes.iter()
    }

    /// Retrieve the volumes, consuming the batch.
    pub fn into_vec(self) -> Vec<DecodedVolume> {
        self.volumes
    }
}

impl IntoIterator for VolumeBatch {
    type Item = DecodedVolume;
    type IntoIter = std::vec::IntoIter<DecodedVolume>;

    fn into_iter(self) -> Self::IntoIter {
        self.volumes.into_iter()
    }
}

impl<'a> IntoIterator for &'a VolumeBatch {
    type Item = &'a DecodedVolume;
    type IntoIter = std::slice::Iter<'a, DecodedVolume>;

    fn into_iter(self) -> Self::IntoIter {
        self.volumes.iter()
    }
}

impl std::iter::FromIterator<DecodedVolume> for VolumeBatch {
    fn from_iter<I: IntoIterator<Item = DecodedVolume>>(iter: I) -> Self {
        VolumeBatch {
            volumes: iter.into_iter().collect(),
        }
    }
}
