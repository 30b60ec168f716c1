#[macro_use]
extern crate pretty_assertions;

mod util;

use tempfile::tempdir;
use util::{write_bytes, write_text};
use volread::hints::IDENTITY;
use volread::typedef::Modality;
use volread::{read_volumes, write_dat, DecodedVolume, ScalarFormat, VolumeUrl, VoxelBuffer, VoxelType};

#[test]
fn write_read_back() {
    let dir = tempdir().unwrap();
    let t = VoxelType::resolve(volread::ChannelLayout::Intensity, ScalarFormat::Int32).unwrap();
    let data: Vec<u8> = (0..24i32).flat_map(|v| (v - 12).to_ne_bytes().to_vec()).collect();
    let buffer = VoxelBuffer::from_raw_data([2, 3, 4], t, data).unwrap();
    let mut transform = IDENTITY;
    transform[2][3] = -40.5;
    let volume = DecodedVolume::new(buffer, VolumeUrl::parse("memory"))
        .with_spacing([0.5, 0.75, 2.])
        .with_transform(transform)
        .with_modality(Modality::Ct)
        .with_hash(Some("0123456789abcdef0123456789abcdef".to_string()));

    let header = dir.path().join("out.dat");
    let _ = write_dat(&header, &volume).unwrap();

    let back = read_volumes(header.as_path()).unwrap().into_single().unwrap();
    assert_eq!(back.buffer(), volume.buffer());
    assert_eq!(back.spacing(), volume.spacing());
    assert_eq!(back.transform(), volume.transform());
    assert_eq!(back.modality(), Modality::Ct);
    assert_eq!(back.hash(), volume.hash());
    assert_eq!(back.buffer().get_f64([0, 0, 0], 0).unwrap(), -12.);
}

#[test]
fn tensors_written_in_upper_order() {
    let dir = tempdir().unwrap();
    let header = write_text(
        dir.path(),
        "dti.dat",
        "ObjectFileName: dti.raw\n\
         Resolution: 1 1 1\n\
         Format: FLOAT\n\
         ObjectModel: TENSOR_LOW\n",
    );
    // xx yx yy zx zy zz
    let values = [1f32, 2., 4., 3., 5., 6.];
    let bytes: Vec<u8> = values.iter().flat_map(|v| v.to_le_bytes().to_vec()).collect();
    let _ = write_bytes(dir.path(), "dti.raw", &bytes);

    let volume = read_volumes(header.as_path()).unwrap().into_single().unwrap();
    assert_eq!(
        volume.buffer().to_vec::<f32>().unwrap(),
        vec![1., 2., 3., 4., 5., 6.]
    );

    let copy = dir.path().join("copy.dat");
    let _ = write_dat(&copy, &volume).unwrap();
    let back = read_volumes(copy.as_path()).unwrap().into_single().unwrap();
    assert_eq!(
        back.buffer().to_vec::<f32>().unwrap(),
        vec![1., 2., 3., 4., 5., 6.]
    );
}
