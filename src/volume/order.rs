//! In-place reversal of voxel data along one axis, used to normalize
//! payloads stored with a non-default slice order.
use crate::typedef::Axis;

/// Reverse the voxels of a contiguous x-fastest buffer along the given axis,
/// in place. `voxel_size` is the width of one voxel in bytes, so multi
/// channel voxels are moved as a whole.
///
/// Reversing twice along the same axis restores the original content.
///
/// # Panics
///
/// Panics if `data` is shorter than `dim[0] * dim[1] * dim[2] * voxel_size`.
pub fn reverse_axis(data: &mut [u8], dim: [usize; 3], voxel_size: usize, axis: Axis) {
    let [nx, ny, nz] = dim;
    let row = nx * voxel_size;
    let slice = row * ny;
    let data = &mut data[..slice * nz];
    match axis {
        Axis::X => {
            for line in data.chunks_exact_mut(row) {
                for i in 0..nx / 2 {
                    let j = nx - 1 - i;
                    let (head, tail) = line.split_at_mut(j * voxel_size);
                    head[i * voxel_size..(i + 1) * voxel_size]
                        .swap_with_slice(&mut tail[..voxel_size]);
                }
            }
        }
        Axis::Y => {
            for plane in data.chunks_exact_mut(slice) {
                swap_blocks(plane, row, ny);
            }
        }
        Axis::Z => swap_blocks(data, slice, nz),
    }
}

/// Swap block `i` with block `count - 1 - i` for the first half of a
/// sequence of `count` blocks of `block` bytes.
fn swap_blocks(data: &mut [u8], block: usize, count: usize) {
    for i in 0..count / 2 {
        let j = count - 1 - i;
        let (head, tail) = data.split_at_mut(j * block);
        head[i * block..(i + 1) * block].swap_with_slice(&mut tail[..block]);
    }
}

#[cfg(test)]
mod tests {
    use super::reverse_axis;
    use crate::typedef::Axis;
    use pretty_assertions::assert_eq;

    fn ramp(len: usize) -> Vec<u8> {
        (0..len).map(|i| i as u8).collect()
    }

    #[test]
    fn reverse_x_two_byte_voxels() {
        // 3x1x1 volume of 2 byte voxels
        let mut data = vec![1, 2, 3, 4, 5, 6];
        reverse_axis(&mut data, [3, 1, 1], 2, Axis::X);
        assert_eq!(data, vec![5, 6, 3, 4, 1, 2]);
    }

    #[test]
    fn reverse_y_rows() {
        let mut data = ramp(2 * 3);
        reverse_axis(&mut data, [2, 3, 1], 1, Axis::Y);
        assert_eq!(data, vec![4, 5, 2, 3, 0, 1]);
    }

    #[test]
    fn reverse_z_slices() {
        let mut data = ramp(2 * 2 * 2);
        reverse_axis(&mut data, [2, 2, 2], 1, Axis::Z);
        assert_eq!(data, vec![4, 5, 6, 7, 0, 1, 2, 3]);
    }

    #[test]
    fn double_reversal_is_identity() {
        for &dim in &[[3, 4, 5], [4, 3, 2], [1, 1, 1], [5, 5, 5]] {
            for &vs in &[1, 3, 24] {
                for &axis in &[Axis::X, Axis::Y, Axis::Z] {
                    let original = ramp(dim[0] * dim[1] * dim[2] * vs);
                    let mut data = original.clone();
                    reverse_axis(&mut data, dim, vs, axis);
                    if dim[match axis {
                        Axis::X => 0,
                        Axis::Y => 1,
                        Axis::Z => 2,
                    }] > 1
                    {
                        assert_ne!(data, original);
                    }
                    reverse_axis(&mut data, dim, vs, axis);
                    assert_eq!(data, original, "{:?} {} {:?}", dim, vs, axis);
                }
            }
        }
    }
}
