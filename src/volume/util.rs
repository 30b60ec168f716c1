//! Miscellaneous volume-related functions
use crate::error::{Result, VolumeError};

/// Linear voxel index of x-fastest coordinates.
pub fn coords_to_index(coords: [usize; 3], dim: [usize; 3]) -> Result<usize> {
    if !coords.iter().zip(&dim).all(|(i, d)| i < d) {
        return Err(VolumeError::InvalidParameters(format!(
            "coordinates {:?} out of bounds for volume of {:?} voxels",
            coords, dim
        )));
    }
    Ok((coords[2] * dim[1] + coords[1]) * dim[0] + coords[0])
}

/// Total byte length of a buffer, or `None` on overflow.
pub fn byte_len(dim: [usize; 3], voxel_size: usize) -> Option<usize> {
    dim.iter()
        .try_fold(voxel_size, |acc, &d| acc.checked_mul(d))
}
