//! Interfaces and implementations specific to integration with `ndarray`.
//!
//! This module introduces the trait [`IntoNdArray`], which is implemented for
//! voxel buffers and decoded volumes and enables their mapping into a four
//! dimensional [`Array`] of the buffer's own element type.
//!
//! #### Note on memory order
//!
//! Voxels are stored with x varying fastest, so the array axes are
//! `(z, y, x, channel)` in standard (row major) layout. Intensity volumes
//! have a channel axis of length 1.
//!
//! [`IntoNdArray`]: ./trait.IntoNdArray.html
//! [`Array`]: ../../../ndarray/type.Array.html
use super::{DecodedVolume, VoxelBuffer};
use crate::error::{Result, VolumeError};
use crate::volume::element::DataElement;
use ::ndarray::{Array, Ix4};

/// Trait for volumes which can be converted to an ndarray.
///
/// Please see the [module-level documentation](index.html) for more details.
pub trait IntoNdArray {
    /// Consume the volume into an array of shape `(z, y, x, channel)`.
    ///
    /// # Errors
    ///
    /// - `VolumeError::UnsupportedFormat` if `T` does not match the scalar
    /// format of the voxels.
    fn into_ndarray<T>(self) -> Result<Array<T, Ix4>>
    where
        T: DataElement;
}

impl IntoNdArray for VoxelBuffer {
    fn into_ndarray<T>(self) -> Result<Array<T, Ix4>>
    where
        T: DataElement,
    {
        let [nx, ny, nz] = self.dim();
        let channels = self.voxel_type().channels();
        let data = self.to_vec::<T>()?;
        Array::from_shape_vec((nz, ny, nx, channels), data)
            .map_err(|e| VolumeError::InvalidParameters(e.to_string()))
    }
}

impl IntoNdArray for DecodedVolume {
    fn into_ndarray<T>(self) -> Result<Array<T, Ix4>>
    where
        T: DataElement,
    {
        self.into_buffer().into_ndarray()
    }
}
