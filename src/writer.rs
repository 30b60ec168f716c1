//! Utility functions to write volumes as `.dat` headers with a raw payload.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use byteordered::Endianness;

use crate::error::Result;
use crate::hints::IDENTITY;
use crate::typedef::{ChannelLayout, Modality, TensorLayout, TensorOrdering};
use crate::util::{native_endianness, swap_bytes_in_place};
use crate::volume::{DecodedVolume, VoxelBuffer};

/// Write a volume as a `.dat` header at `header_path` and a little endian
/// payload next to it, named after the header with the `raw` extension.
/// Returns the path of the payload.
///
/// Decoded tensors are in upper triangular order, so they are declared as
/// `TENSOR_UP` whatever their source layout was.
pub fn write_dat<P: AsRef<Path>>(header_path: P, volume: &DecodedVolume) -> Result<PathBuf> {
    let header_path = header_path.as_ref();
    let raw_path = header_path.with_extension("raw");
    let raw_name = raw_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let f = File::create(header_path)?;
    let mut writer = BufWriter::new(f);
    write_header(&mut writer, &raw_name, volume)?;
    writer.flush()?;

    write_raw(&raw_path, volume.buffer())?;
    Ok(raw_path)
}

/// Write the voxels of a buffer in little endian byte order.
pub fn write_raw<P: AsRef<Path>>(path: P, buffer: &VoxelBuffer) -> Result<()> {
    let f = File::create(path)?;
    let mut writer = BufWriter::new(f);
    if native_endianness() == Endianness::Little {
        writer.write_all(buffer.raw_data())?;
    } else {
        let mut data = buffer.raw_data().to_vec();
        swap_bytes_in_place(&mut data, buffer.scalar_format().size_of());
        writer.write_all(&data)?;
    }
    writer.flush()?;
    Ok(())
}

fn write_header<W: Write>(writer: &mut W, raw_name: &str, volume: &DecodedVolume) -> Result<()> {
    let [x, y, z] = volume.dim();
    let [sx, sy, sz] = volume.spacing();
    let layout = match volume.buffer().voxel_type().layout() {
        ChannelLayout::Tensor2(_) => ChannelLayout::Tensor2(TensorLayout {
            ordering: TensorOrdering::Upper,
            fusion: false,
        }),
        l => l,
    };

    writeln!(writer, "ObjectFileName:\t{}", raw_name)?;
    writeln!(writer, "Resolution:\t{} {} {}", x, y, z)?;
    writeln!(writer, "SliceThickness:\t{} {} {}", sx, sy, sz)?;
    writeln!(writer, "Format:\t\t{}", volume.buffer().scalar_format())?;
    writeln!(writer, "ObjectModel:\t{}", layout)?;
    writeln!(writer, "ByteOrder:\tlittle-endian")?;
    if volume.modality() != Modality::Unknown {
        writeln!(writer, "Modality:\t{}", volume.modality())?;
    }
    if *volume.transform() != IDENTITY {
        for (i, row) in volume.transform().iter().enumerate() {
            writeln!(
                writer,
                "TransformMatrix: row{}\t{} {} {} {}",
                i, row[0], row[1], row[2], row[3]
            )?;
        }
    }
    if let Some(hash) = volume.hash() {
        writeln!(writer, "Checksum:\t{}", hash)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::typedef::{ScalarFormat, VoxelType};
    use crate::url::VolumeUrl;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn header_text() {
        let t = VoxelType::resolve(
            ChannelLayout::from_token("TENSOR_FUSION_DIAG").unwrap(),
            ScalarFormat::Float32,
        )
        .unwrap();
        let buffer = VoxelBuffer::zeroed([1, 2, 3], t).unwrap();
        let mut transform = IDENTITY;
        transform[0][3] = 5.;
        let volume = DecodedVolume::new(buffer, VolumeUrl::parse("a.raw"))
            .with_spacing([0.5, 1., 2.])
            .with_transform(transform)
            .with_modality(Modality::Dti);

        let dir = tempdir().unwrap();
        let path = dir.path().join("out.dat");
        let raw = write_dat(&path, &volume).unwrap();
        assert_eq!(raw, dir.path().join("out.raw"));
        assert_eq!(fs::metadata(&raw).unwrap().len(), 6 * 6 * 4);

        let text = fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("ObjectFileName:\tout.raw\n"));
        assert!(text.contains("Resolution:\t1 2 3\n"));
        assert!(text.contains("SliceThickness:\t0.5 1 2\n"));
        assert!(text.contains("Format:\t\tFLOAT\n"));
        assert!(text.contains("ObjectModel:\tTENSOR_UP\n"));
        assert!(text.contains("Modality:\tDTI\n"));
        assert!(text.contains("TransformMatrix: row0\t1 0 0 5\n"));
        assert!(!text.contains("Checksum"));
    }
}
