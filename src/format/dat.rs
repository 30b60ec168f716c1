//! Reader for `.dat` headers: a `Key: value` text file naming a raw payload
//! and describing its layout.
//!
//! ```text
//! ObjectFileName: nucleon.raw
//! Resolution:     41 41 41
//! SliceThickness: 1.0 1.0 1.0
//! Format:         UCHAR
//! ObjectModel:    I
//! ```
use super::{frame_range, requested_time_frame};
use crate::error::{Result, VolumeError};
use crate::hints::DecodeHints;
use crate::logging::Logger;
use crate::raw::RawVoxelDecoder;
use crate::reader::VolumeReader;
use crate::text::{ArgStream, TextHeaderReader};
use crate::typedef::{Modality, ScalarFormat, ChannelLayout, SliceOrder};
use crate::url::VolumeUrl;
use crate::util::resolve_relative;
use byteordered::Endianness;
use std::io::BufRead;
use std::path::{Path, PathBuf};

/// Separators between a key and its arguments.
pub const DAT_SEPARATORS: &str = " \t:";

/// The content of a `.dat` header.
#[derive(Debug, Clone, PartialEq)]
pub struct DatHeader {
    /// Payload file name as written in the header.
    pub object_file_name: String,
    /// Hints describing the payload.
    pub hints: DecodeHints,
    /// Number of consecutive frames in the payload.
    pub num_frames: usize,
    /// Declared `TimeStep`, if any.
    pub time_step: Option<f32>,
    /// Number of significant bits per scalar.
    pub bits_stored: Option<u32>,
    /// Value mapped to zero by the acquisition device.
    pub zero_point: Option<f32>,
    /// Free text meta information.
    pub meta_string: Option<String>,
    /// Name of an accompanying tag file.
    pub tagged_file_name: Option<String>,
    /// Number of tags in the tag file.
    pub nbr_tags: Option<i32>,
    /// Declared object type.
    pub object_type: Option<String>,
    /// Declared grid type.
    pub grid_type: Option<String>,
}

impl DatHeader {
    /// Parse a header from a text source. `path` names the header in error
    /// messages.
    ///
    /// Unknown keys are logged and ignored. Arguments which fail to parse
    /// are logged and make the whole header fail once it has been read.
    ///
    /// # Errors
    ///
    /// - `VolumeError::CorruptedHeader` if any argument failed to parse,
    /// `ObjectFileName` is missing or `Resolution` is missing or not
    /// positive.
    /// - `VolumeError::UnsupportedFormat` on unknown `Format` or
    /// `ObjectModel` tokens.
    pub fn from_reader<R: BufRead>(source: R, path: &Path, logger: &Logger) -> Result<Self> {
        let mut reader = TextHeaderReader::new(source);
        reader.set_separators(DAT_SEPARATORS);

        let mut header = DatHeader {
            object_file_name: String::new(),
            hints: DecodeHints::default(),
            num_frames: 1,
            time_step: None,
            bits_stored: None,
            zero_point: None,
            meta_string: None,
            tagged_file_name: None,
            nbr_tags: None,
            object_type: None,
            grid_type: None,
        };
        let mut resolution: Option<[i64; 3]> = None;
        let mut errors: Vec<String> = Vec::new();

        while let Some(line) = reader.next_line(true)? {
            let mut args = line.arg_stream();
            match line.key.as_str() {
                "objectfilename" => {
                    header.object_file_name = line.args.clone();
                    log_debug!(logger, "ObjectFileName: {}", line.args);
                }
                "resolution" => {
                    resolution = args.read_array3();
                    log_debug!(logger, "Resolution: {:?}", resolution);
                }
                "slicethickness" | "thicknesses" | "spacings" => {
                    if let Some(s) = args.read_array3() {
                        header.hints.spacing = s;
                    }
                }
                "format" => {
                    let token = args.token().unwrap_or("");
                    header.hints.format = token.parse::<ScalarFormat>()?;
                }
                "objectmodel" => {
                    let token = args.token().unwrap_or("");
                    header.hints.layout = token.parse::<ChannelLayout>()?;
                }
                "numframes" => {
                    if let Some(n) = args.read::<usize>() {
                        header.num_frames = n;
                    }
                }
                "byteorder" => match args.token() {
                    Some("big-endian") | Some("bigendian") | Some("bigEndian") => {
                        header.hints.endianness = Endianness::Big;
                    }
                    Some("little-endian") | Some("littleendian") | Some("littleEndian") => {
                        header.hints.endianness = Endianness::Little;
                    }
                    other => log_error!(logger, "Unknown byte order: {}", other.unwrap_or("")),
                },
                "transformmatrix" => {
                    if !read_transform_row(&mut args, &mut header.hints.transform) {
                        errors.push(format!("malformed TransformMatrix row {:?}", line.args));
                    }
                }
                "modality" => {
                    if let Some(m) = args.token() {
                        header.hints.modality = Modality::from_token(m);
                    }
                }
                "checksum" => {
                    if let Some(c) = args.token() {
                        if c.len() == 32 {
                            header.hints.hash = Some(c.to_string());
                        } else {
                            log_warn!(logger, "Ignoring checksum of length {}", c.len());
                        }
                    }
                }
                "timestep" => {
                    header.time_step = args.read();
                    header.hints.time_step = header.time_step;
                }
                "sliceorder" => match args.token().map(str::parse::<SliceOrder>) {
                    Some(Ok(order)) => header.hints.slice_order = order,
                    _ => errors.push(format!("invalid SliceOrder {:?}", line.args)),
                },
                "bitsstored" => header.bits_stored = args.read(),
                "zeropoint" => header.zero_point = args.read(),
                "metastring" => header.meta_string = Some(line.args.clone()),
                "taggedfilename" => header.tagged_file_name = args.token().map(str::to_string),
                "nbrtags" => header.nbr_tags = args.read(),
                "objecttype" => header.object_type = args.token().map(str::to_string),
                "gridtype" => header.grid_type = args.token().map(str::to_string),
                _ => {
                    log_error!(logger, "Unknown type: {}", line.key);
                    continue;
                }
            }
            if args.failed() {
                log_error!(logger, "Format error in {}: {:?}", line.key, line.args);
                errors.push(format!("unparseable arguments for {}: {:?}", line.key, line.args));
            }
        }

        if header.object_file_name.is_empty() {
            log_error!(logger, "No raw file specified");
            errors.push("no raw file specified".to_string());
        }
        match resolution {
            Some([x, y, z]) if x > 0 && y > 0 && z > 0 => {
                header.hints.dimensions = [x as usize, y as usize, z as usize];
            }
            r => {
                log_error!(logger, "Invalid resolution or resolution not specified: {:?}", r);
                errors.push(format!("invalid resolution {:?}", r));
            }
        }
        if header.num_frames == 0 {
            errors.push("NumFrames must be positive".to_string());
        }
        if !errors.is_empty() {
            return Err(VolumeError::CorruptedHeader(path.to_owned(), errors.join("; ")));
        }
        Ok(header)
    }

    /// Parse the header file at the given path.
    pub fn from_file<P: AsRef<Path>>(path: P, logger: &Logger) -> Result<Self> {
        let path = path.as_ref();
        let reader = TextHeaderReader::open(path)?;
        DatHeader::from_reader(reader.into_inner(), path, logger)
    }

    /// The payload path, resolved against the header's directory.
    pub fn raw_path<P: AsRef<Path>>(&self, header_path: P) -> PathBuf {
        resolve_relative(header_path, &self.object_file_name)
    }
}

/// `row<i> a b c d`, the row index being the last character of the first
/// token.
fn read_transform_row(args: &mut ArgStream, transform: &mut [[f32; 4]; 4]) -> bool {
    let index = args
        .token()
        .and_then(|row| row.chars().last())
        .and_then(|c| c.to_digit(10))
        .map(|d| d as usize);
    match index {
        Some(i) if i < 4 => {
            let mut row = [0f32; 4];
            for v in row.iter_mut() {
                match args.read() {
                    Some(x) => *v = x,
                    None => return false,
                }
            }
            transform[i] = row;
            true
        }
        _ => false,
    }
}

/// Reader of `.dat` described volumes.
#[derive(Debug)]
pub struct DatVolumeReader {
    logger: Logger,
    decoder: RawVoxelDecoder,
}

impl Default for DatVolumeReader {
    fn default() -> Self {
        DatVolumeReader::new()
    }
}

impl DatVolumeReader {
    /// Create a reader with its default logger.
    pub fn new() -> Self {
        DatVolumeReader::with_logger(Logger::new("volread.DatVolumeReader"))
    }

    /// Create a reader logging under the given handle.
    pub fn with_logger(logger: Logger) -> Self {
        DatVolumeReader {
            logger,
            decoder: RawVoxelDecoder::default(),
        }
    }

    /// The payload decoder, e.g. to attach a progress sink.
    pub fn decoder_mut(&mut self) -> &mut RawVoxelDecoder {
        &mut self.decoder
    }

    /// Parse a header file.
    pub fn parse_header<P: AsRef<Path>>(&self, path: P) -> Result<DatHeader> {
        DatHeader::from_file(path, &self.logger)
    }

    /// The resolved payload path named by a header file.
    pub fn related_raw_file<P: AsRef<Path>>(&self, path: P) -> Result<PathBuf> {
        let path = path.as_ref();
        let mut reader = TextHeaderReader::open(path)?;
        reader.set_separators(DAT_SEPARATORS);
        while let Some(line) = reader.next_line(true)? {
            if line.key == "objectfilename" {
                return Ok(resolve_relative(path, &line.args));
            }
        }
        Err(VolumeError::CorruptedHeader(
            path.to_owned(),
            "no raw file specified".to_string(),
        ))
    }

    /// Read the slices `first..last` of one frame, or of every frame when
    /// `time_frame` is `None`. Both slice bounds zero read whole frames.
    ///
    /// # Errors
    ///
    /// - `VolumeError::TimeFrameNotInVolume` if the frame is not below
    /// `NumFrames`.
    /// - Any header or payload error; no partial batch is returned.
    pub fn read_frames(
        &mut self,
        url: &VolumeUrl,
        first: usize,
        last: usize,
        time_frame: Option<usize>,
    ) -> Result<crate::volume::VolumeBatch> {
        let header_path = url.file_path();
        log_info!(self.logger, "Loading dat file {}", header_path.display());
        let header = self.parse_header(&header_path)?;
        let raw = VolumeUrl::new(None, header.raw_path(&header_path));
        let frames = frame_range(time_frame, header.num_frames)?;

        let mut batch = crate::volume::VolumeBatch::new();
        for frame in frames {
            self.decoder
                .set_hints(header.hints.clone().with_time_frame(Some(frame)));
            let decoded = self.decoder.read_slices(&raw, first, last)?;
            for mut volume in decoded {
                let mut origin = VolumeUrl::new(None, &header_path);
                origin.add_search_parameter("timeframe", frame);
                volume.set_origin(origin);
                volume.set_time_step(frame as f32);
                batch.push(volume);
            }
        }
        Ok(batch)
    }
}

impl VolumeReader for DatVolumeReader {
    fn name(&self) -> &'static str {
        "Dat Volume Reader"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["dat"]
    }

    fn protocols(&self) -> &'static [&'static str] {
        &["dat"]
    }

    fn read(&mut self, url: &VolumeUrl) -> Result<crate::volume::VolumeBatch> {
        let frame = requested_time_frame(url)?;
        self.read_frames(url, 0, 0, frame)
    }

    fn supports_slices(&self) -> bool {
        true
    }

    fn read_slices(&mut self, url: &VolumeUrl, first: usize, last: usize) -> Result<crate::volume::VolumeBatch> {
        let frame = requested_time_frame(url)?;
        self.read_frames(url, first, last, frame)
    }

    fn supports_bricks(&self) -> bool {
        true
    }

    fn read_brick(&mut self, url: &VolumeUrl, start: [usize; 3], size: usize) -> Result<crate::volume::VolumeBatch> {
        let header_path = url.file_path();
        let header = self.parse_header(&header_path)?;
        let frame = requested_time_frame(url)?.unwrap_or(0);
        let _ = frame_range(Some(frame), header.num_frames)?;
        let raw = VolumeUrl::new(None, header.raw_path(&header_path));
        self.decoder
            .set_hints(header.hints.clone().with_time_frame(Some(frame)));
        self.decoder.read_brick(&raw, start, size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::typedef::{Axis, TensorOrdering, TensorLayout};
    use pretty_assertions::assert_eq;
    use std::io::Cursor;

    fn parse(text: &str) -> Result<DatHeader> {
        DatHeader::from_reader(
            Cursor::new(text),
            Path::new("/data/head.dat"),
            &Logger::new("test"),
        )
    }

    #[test]
    fn full_header() {
        let h = parse(
            "ObjectFileName: vol.raw\n\
             Resolution: 4 5 6\n\
             Spacings: 0.5 0.5 2\n\
             Format: USHORT\n\
             ObjectModel: tensor_low\n\
             NumFrames: 3\n\
             ByteOrder: bigEndian\n\
             TransformMatrix: row0 1 0 0 10\n\
             TransformMatrix: row3 0 0 0 1\n\
             Modality: CT\n\
             Checksum: 0123456789abcdef0123456789abcdef\n\
             TimeStep: 2.5\n\
             SliceOrder: -x\n\
             BitsStored: 12\n\
             ZeroPoint: -1024\n\
             MetaString: free text here\n\
             GridType: EQUIDISTANT\n\
             Nonsense: 1\n",
        )
        .unwrap();
        assert_eq!(h.object_file_name, "vol.raw");
        assert_eq!(h.hints.dimensions, [4, 5, 6]);
        assert_eq!(h.hints.spacing, [0.5, 0.5, 2.]);
        assert_eq!(h.hints.format, ScalarFormat::Uint16);
        assert_eq!(
            h.hints.layout,
            ChannelLayout::Tensor2(TensorLayout {
                ordering: TensorOrdering::Lower,
                fusion: false,
            })
        );
        assert_eq!(h.num_frames, 3);
        assert!(h.hints.big_endian());
        assert_eq!(h.hints.transform[0], [1., 0., 0., 10.]);
        assert_eq!(h.hints.modality, Modality::Ct);
        assert_eq!(h.hints.hash.as_ref().map(String::len), Some(32));
        assert_eq!(h.time_step, Some(2.5));
        assert_eq!(h.hints.slice_order.reversal(), Some(Axis::X));
        assert_eq!(h.bits_stored, Some(12));
        assert_eq!(h.zero_point, Some(-1024.));
        assert_eq!(h.meta_string.as_ref().map(String::as_str), Some("free text here"));
        assert_eq!(h.grid_type.as_ref().map(String::as_str), Some("EQUIDISTANT"));
        assert_eq!(h.raw_path("/data/head.dat"), Path::new("/data/vol.raw"));
    }

    #[test]
    fn short_checksum_ignored() {
        let h = parse("ObjectFileName: a.raw\nResolution: 1 1 1\nChecksum: abc\n").unwrap();
        assert_eq!(h.hints.hash, None);
    }

    #[test]
    fn missing_object_file() {
        let e = parse("Resolution: 1 1 1\n").unwrap_err();
        assert_eq!(e.kind(), ErrorKind::Corrupted);
    }

    #[test]
    fn bad_resolution() {
        for r in &["0 10 10", "-1 10 10", "10 10", "a b c"] {
            let e = parse(&format!("ObjectFileName: a.raw\nResolution: {}\n", r)).unwrap_err();
            assert_eq!(e.kind(), ErrorKind::Corrupted, "{}", r);
        }
    }

    #[test]
    fn malformed_optional_field_fails_header() {
        let e = parse("ObjectFileName: a.raw\nResolution: 1 1 1\nNumFrames: many\n").unwrap_err();
        assert_eq!(e.kind(), ErrorKind::Corrupted);
        let e = parse("ObjectFileName: a.raw\nResolution: 1 1 1\nTransformMatrix: rowX 1 2 3 4\n")
            .unwrap_err();
        assert_eq!(e.kind(), ErrorKind::Corrupted);
    }

    #[test]
    fn unknown_format() {
        let e = parse("ObjectFileName: a.raw\nResolution: 1 1 1\nFormat: HALF\n").unwrap_err();
        assert_eq!(e.kind(), ErrorKind::UnsupportedFormat);
    }
}
