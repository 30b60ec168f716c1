//! Conversion of volume transforms into `nalgebra` matrices.
//!
//! Transforms are kept as row major `[[f32; 4]; 4]` arrays in the rest of
//! the crate. This module is only available with the `nalgebra_affine`
//! feature.
use nalgebra::{Matrix3, Matrix4, Scalar, Vector3, Vector4};

use crate::volume::DecodedVolume;

/// A 3x3 linear map.
pub type Affine3 = Matrix3<f32>;
/// A 4x4 homogeneous transform.
pub type Affine4 = Matrix4<f32>;

/// Convert a row major array into a matrix.
pub fn to_affine(transform: &[[f32; 4]; 4]) -> Affine4 {
    let rows: Vec<f32> = transform.iter().flat_map(|r| r.iter().cloned()).collect();
    Affine4::from_row_slice(&rows)
}

/// Convert a matrix into a row major array.
pub fn from_affine(affine: &Affine4) -> [[f32; 4]; 4] {
    let mut out = [[0.; 4]; 4];
    for (r, row) in out.iter_mut().enumerate() {
        for (c, v) in row.iter_mut().enumerate() {
            *v = affine[(r, c)];
        }
    }
    out
}

/// Separate a 4x4 affine into its 3x3 linear part and translation.
pub fn get_affine_and_translation<T: Scalar>(affine: &Matrix4<T>) -> (Matrix3<T>, Vector3<T>) {
    let translation = Vector3::new(
        affine[(0, 3)].clone(),
        affine[(1, 3)].clone(),
        affine[(2, 3)].clone(),
    );
    let linear = Matrix3::from_fn(|r, c| affine[(r, c)].clone());
    (linear, translation)
}

impl DecodedVolume {
    /// The stored transform as a matrix.
    pub fn affine(&self) -> Affine4 {
        to_affine(self.transform())
    }

    /// The map from voxel indices to world coordinates: the stored
    /// transform applied after scaling by the voxel spacing.
    pub fn voxel_to_world(&self) -> Affine4 {
        let [sx, sy, sz] = self.spacing();
        self.affine() * Affine4::from_diagonal(&Vector4::new(sx, sy, sz, 1.))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hints::IDENTITY;

    #[test]
    fn row_major_round_trip() {
        let mut t = IDENTITY;
        t[0][3] = 7.;
        t[1][0] = 2.;
        let a = to_affine(&t);
        assert_eq!(a[(0, 3)], 7.);
        assert_eq!(a[(1, 0)], 2.);
        assert_eq!(from_affine(&a), t);
        let (linear, translation) = get_affine_and_translation(&a);
        assert_eq!(translation, Vector3::new(7., 0., 0.));
        assert_eq!(linear[(1, 0)], 2.);
    }
}
