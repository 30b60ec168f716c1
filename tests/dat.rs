#[macro_use]
extern crate pretty_assertions;

mod util;

use tempfile::tempdir;
use util::{nucleon_header, slice_index_payload, write_bytes, write_text};
use volread::{
    read_volumes, DatVolumeReader, ErrorKind, RawVoxelDecoder, VolumeReader, VolumeUrl,
};

#[test]
fn nucleon() {
    let dir = tempdir().unwrap();
    let header = write_text(dir.path(), "nucleon.dat", &nucleon_header("nucleon.raw"));
    let _ = write_bytes(dir.path(), "nucleon.raw", &slice_index_payload([41, 41, 41]));

    let batch = read_volumes(header.as_path()).unwrap();
    assert_eq!(batch.len(), 1);
    let volume = batch.single().unwrap();
    assert_eq!(volume.dim(), [41, 41, 41]);
    assert_eq!(volume.spacing(), [1., 1., 1.]);
    assert_eq!(volume.buffer().bytes_per_voxel(), 1);
    assert_eq!(volume.buffer().raw_data().len(), 68921);
    assert_eq!(volume.buffer().get_f64([3, 4, 17], 0).unwrap(), 17.);
    assert_eq!(volume.time_step(), 0.);
    assert_eq!(volume.origin().search_parameter("timeframe"), Some("0"));
}

#[test]
fn all_frames() {
    let dir = tempdir().unwrap();
    let header = write_text(
        dir.path(),
        "frames.dat",
        "ObjectFileName: frames.raw\n\
         Resolution: 10 10 10\n\
         Format: FLOAT\n\
         ObjectModel: I\n\
         NumFrames: 4\n",
    );
    let mut payload = Vec::with_capacity(16000);
    for frame in 0..4u32 {
        for _ in 0..1000 {
            payload.extend_from_slice(&(frame as f32 * 10.).to_le_bytes());
        }
    }
    let _ = write_bytes(dir.path(), "frames.raw", &payload);

    let mut url = VolumeUrl::from(header.as_path());
    url.add_search_parameter("timeframe", -1);
    let batch = DatVolumeReader::new().read(&url).unwrap();
    assert_eq!(batch.len(), 4);
    for (i, volume) in batch.iter().enumerate() {
        assert_eq!(volume.buffer().raw_data().len(), 4000);
        assert_eq!(volume.time_step(), i as f32);
        assert_eq!(volume.buffer().get_f32([9, 9, 9], 0).unwrap(), i as f32 * 10.);
    }

    url.add_search_parameter("timeframe", 2);
    let batch = DatVolumeReader::new().read(&url).unwrap();
    assert_eq!(batch.len(), 1);
    let volume = batch.single().unwrap();
    assert_eq!(volume.time_step(), 2.);
    assert_eq!(volume.origin().search_parameter("timeframe"), Some("2"));
}

#[test]
fn time_frame_out_of_range() {
    let dir = tempdir().unwrap();
    let header = write_text(
        dir.path(),
        "frames.dat",
        "ObjectFileName: frames.raw\nResolution: 2 2 2\nFormat: UCHAR\nNumFrames: 3\n",
    );
    let _ = write_bytes(dir.path(), "frames.raw", &[0u8; 24]);

    let mut url = VolumeUrl::from(header.as_path());
    url.add_search_parameter("timeframe", 3);
    let e = DatVolumeReader::new().read(&url).unwrap_err();
    assert_eq!(e.kind(), ErrorKind::InvalidParameters);
    assert!(e.to_string().to_lowercase().contains("time frame not in volume"));
}

#[test]
fn slice_range() {
    let dir = tempdir().unwrap();
    let header = write_text(dir.path(), "nucleon.dat", &nucleon_header("nucleon.raw"));
    let raw = write_bytes(dir.path(), "nucleon.raw", &slice_index_payload([41, 41, 41]));

    let url = VolumeUrl::from(header.as_path());
    let batch = DatVolumeReader::new().read_slices(&url, 10, 20).unwrap();
    let volume = batch.single().unwrap();
    assert_eq!(volume.dim(), [41, 41, 10]);
    assert_eq!(volume.buffer().get_f64([0, 0, 0], 0).unwrap(), 10.);
    assert_eq!(volume.buffer().get_f64([40, 40, 9], 0).unwrap(), 19.);

    // the payload locator of a bounded read folds the skipped slices into
    // the header skip
    let mut decoder = RawVoxelDecoder::default();
    let mut hints = volread::DatVolumeReader::new()
        .parse_header(&header)
        .unwrap()
        .hints;
    hints.time_frame = Some(0);
    decoder.set_hints(hints);
    let direct = decoder
        .read_slices(&VolumeUrl::from(raw.as_path()), 10, 20)
        .unwrap()
        .into_single()
        .unwrap();
    assert_eq!(direct.origin().search_parameter("headerskip"), Some("16810"));
    assert_eq!(direct.origin().search_parameter("dim_z"), Some("10"));
    let replayed = decoder.read(direct.origin()).unwrap().into_single().unwrap();
    assert_eq!(replayed.buffer(), direct.buffer());
}

#[test]
fn big_endian_words() {
    let dir = tempdir().unwrap();
    let header = write_text(
        dir.path(),
        "words.dat",
        "ObjectFileName: words.raw\n\
         Resolution: 2 1 1\n\
         Format: USHORT\n\
         ByteOrder: big-endian\n",
    );
    let _ = write_bytes(dir.path(), "words.raw", &[0x01, 0x02, 0xAB, 0xCD]);
    let volume = read_volumes(header.as_path()).unwrap().into_single().unwrap();
    assert_eq!(volume.buffer().to_vec::<u16>().unwrap(), vec![0x0102, 0xABCD]);
}

#[test]
fn truncated_payload() {
    let dir = tempdir().unwrap();
    let header = write_text(dir.path(), "nucleon.dat", &nucleon_header("nucleon.raw"));
    let _ = write_bytes(dir.path(), "nucleon.raw", &vec![0u8; 68920]);

    let e = read_volumes(header.as_path()).unwrap_err();
    assert_eq!(e.kind(), ErrorKind::Corrupted);

    // a bounded read within the available bytes still succeeds
    let url = VolumeUrl::from(header.as_path());
    let batch = DatVolumeReader::new().read_slices(&url, 0, 10).unwrap();
    assert_eq!(batch.len(), 1);
}

#[test]
fn zero_dimension() {
    let dir = tempdir().unwrap();
    let header = write_text(
        dir.path(),
        "empty.dat",
        "ObjectFileName: empty.raw\nResolution: 0 10 10\nFormat: UCHAR\n",
    );
    let e = read_volumes(header.as_path()).unwrap_err();
    assert_eq!(e.kind(), ErrorKind::Corrupted);
}

#[test]
fn missing_payload() {
    let dir = tempdir().unwrap();
    let header = write_text(dir.path(), "nucleon.dat", &nucleon_header("nowhere.raw"));
    let e = read_volumes(header.as_path()).unwrap_err();
    assert_eq!(e.kind(), ErrorKind::NotFound);
    let e = read_volumes(dir.path().join("absent.dat").as_path()).unwrap_err();
    assert_eq!(e.kind(), ErrorKind::NotFound);
}

#[test]
fn relative_payload_in_subdirectory() {
    let dir = tempdir().unwrap();
    std::fs::create_dir(dir.path().join("data")).unwrap();
    let header = write_text(dir.path(), "sub.dat", &nucleon_header("data/nucleon.raw"));
    let raw = write_bytes(&dir.path().join("data"), "nucleon.raw", &[7u8; 68921]);
    let reader = DatVolumeReader::new();
    assert_eq!(reader.related_raw_file(&header).unwrap(), raw);
}

#[test]
fn brick() {
    let dir = tempdir().unwrap();
    let header = write_text(dir.path(), "nucleon.dat", &nucleon_header("nucleon.raw"));
    let _ = write_bytes(dir.path(), "nucleon.raw", &slice_index_payload([41, 41, 41]));

    let mut reader = DatVolumeReader::new();
    assert!(reader.supports_bricks());
    let batch = reader
        .read_brick(&VolumeUrl::from(header.as_path()), [8, 8, 30], 4)
        .unwrap();
    let volume = batch.single().unwrap();
    assert_eq!(volume.dim(), [4, 4, 4]);
    assert_eq!(volume.buffer().get_f64([0, 0, 0], 0).unwrap(), 30.);
    assert_eq!(volume.buffer().get_f64([3, 3, 3], 0).unwrap(), 33.);
    assert_eq!(volume.origin().search_parameter("brick_size"), Some("4"));

    let e = reader
        .read_brick(&VolumeUrl::from(header.as_path()), [40, 0, 0], 4)
        .unwrap_err();
    assert_eq!(e.kind(), ErrorKind::InvalidParameters);
}

#[test]
fn tensor_brick_matches_full_read() {
    let dir = tempdir().unwrap();
    let header = write_text(
        dir.path(),
        "dti.dat",
        "ObjectFileName: dti.raw\n\
         Resolution: 2 2 2\n\
         Format: FLOAT\n\
         ObjectModel: TENSOR_DIAG\n",
    );
    // xx yy zz xy xz yz, offset by ten times the voxel index
    let mut bytes = Vec::new();
    for i in 0..8 {
        let base = i as f32 * 10.;
        for v in &[1f32, 4., 6., 2., 3., 5.] {
            bytes.extend_from_slice(&(base + v).to_le_bytes());
        }
    }
    let _ = write_bytes(dir.path(), "dti.raw", &bytes);

    let url = VolumeUrl::from(header.as_path());
    let mut reader = DatVolumeReader::new();
    let full = reader.read(&url).unwrap().into_single().unwrap();
    let brick = reader
        .read_brick(&url, [1, 0, 1], 1)
        .unwrap()
        .into_single()
        .unwrap();
    let values = brick.buffer().to_vec::<f32>().unwrap();
    assert_eq!(values, vec![51., 52., 53., 54., 55., 56.]);
    for (c, v) in values.iter().enumerate() {
        assert_eq!(f64::from(*v), full.buffer().get_f64([1, 0, 1], c).unwrap());
    }
}
