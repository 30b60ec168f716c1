//! Reader for MetaImage `.mhd` headers.
//!
//! ```text
//! ObjectType = Image
//! NDims = 3
//! DimSize = 64 64 32
//! ElementSpacing = 0.8 0.8 2.5
//! ElementType = MET_SHORT
//! BinaryDataByteOrderMSB = False
//! ElementDataFile = scan.raw
//! ```
//!
//! `ElementDataFile` ends the header. With the value `LOCAL` the voxels
//! follow the header within the same file. A fourth dimension is read as a
//! sequence of time frames.
use super::{frame_range, requested_time_frame};
use crate::error::{Result, VolumeError};
use crate::hints::{check_dimensions, DecodeHints};
use crate::logging::Logger;
use crate::raw::RawVoxelDecoder;
use crate::reader::VolumeReader;
use crate::text::TextHeaderReader;
use crate::typedef::{ChannelLayout, Modality, ScalarFormat};
use crate::url::VolumeUrl;
use crate::util::{open_file, resolve_relative};
use crate::volume::VolumeBatch;
use byteordered::Endianness;
use std::io::BufRead;
use std::path::{Path, PathBuf};

/// Where the voxels of a MetaImage are stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ElementData {
    /// Right after the header, in the header file.
    Local,
    /// In a separate file, as named in the header.
    File(String),
}

/// The content of a MetaImage header.
#[derive(Debug, Clone, PartialEq)]
pub struct MhdHeader {
    /// Number of dimensions, 2 to 4.
    pub ndims: usize,
    /// Hints describing the payload. `header_skip` is only final once the
    /// payload location is resolved, see `MhdVolumeReader::payload`.
    pub hints: DecodeHints,
    /// Number of time frames (the fourth dimension).
    pub num_frames: usize,
    /// Declared `HeaderSize`; `-1` places the voxels at the end of the file.
    pub header_size: i64,
    /// Location of the voxels.
    pub element_data: ElementData,
    /// Byte offset of the voxels when they are stored locally.
    pub local_offset: u64,
}

fn met_format(token: &str) -> Option<ScalarFormat> {
    let format = match token {
        "MET_UCHAR" => ScalarFormat::Uint8,
        "MET_CHAR" => ScalarFormat::Int8,
        "MET_USHORT" => ScalarFormat::Uint16,
        "MET_SHORT" => ScalarFormat::Int16,
        "MET_UINT" | "MET_ULONG" => ScalarFormat::Uint32,
        "MET_INT" | "MET_LONG" => ScalarFormat::Int32,
        "MET_ULONG_LONG" => ScalarFormat::Uint64,
        "MET_LONG_LONG" => ScalarFormat::Int64,
        "MET_FLOAT" => ScalarFormat::Float32,
        "MET_DOUBLE" => ScalarFormat::Float64,
        _ => return None,
    };
    Some(format)
}

fn parse_bool(token: &str) -> Option<bool> {
    match token.to_ascii_lowercase().as_str() {
        "true" | "1" => Some(true),
        "false" | "0" => Some(false),
        _ => None,
    }
}

impl MhdHeader {
    /// Parse a header from a text source, stopping after
    /// `ElementDataFile`. `path` names the header in error messages.
    ///
    /// # Errors
    ///
    /// - `VolumeError::CorruptedHeader` on unparseable values, or when
    /// `DimSize` or `ElementDataFile` is missing.
    /// - `VolumeError::UnsupportedFormat` on compressed or ASCII data,
    /// unknown element types, file lists and more than four channels.
    pub fn from_reader<R: BufRead>(source: R, path: &Path, logger: &Logger) -> Result<Self> {
        let mut reader = TextHeaderReader::new(source);
        reader.set_separators("=");

        let corrupted = |reason: String| VolumeError::CorruptedHeader(path.to_owned(), reason);
        let mut hints = DecodeHints::default();
        let mut ndims = 3;
        let mut dim_size: Option<Vec<usize>> = None;
        let mut spacing: Option<Vec<f32>> = None;
        let mut channels = 1;
        let mut header_size = 0i64;
        let mut element_data = None;

        while let Some(line) = reader.next_line(true)? {
            let value = line.args.as_str();
            let numbers = || -> Option<Vec<f32>> {
                value.split_whitespace().map(|v| v.parse().ok()).collect()
            };
            match line.key.as_str() {
                "objecttype" => {
                    if !value.eq_ignore_ascii_case("image") {
                        log_warn!(logger, "Unexpected ObjectType {}", value);
                    }
                }
                "ndims" => {
                    ndims = value
                        .parse()
                        .ok()
                        .filter(|n| (2..=4).contains(n))
                        .ok_or_else(|| corrupted(format!("NDims = {}", value)))?;
                }
                "dimsize" => {
                    let dims: Option<Vec<usize>> =
                        value.split_whitespace().map(|v| v.parse().ok()).collect();
                    dim_size = Some(dims.ok_or_else(|| corrupted(format!("DimSize = {}", value)))?);
                }
                "elementspacing" | "elementsize" => {
                    spacing = Some(numbers().ok_or_else(|| corrupted(format!("ElementSpacing = {}", value)))?);
                }
                "elementtype" => {
                    hints.format = met_format(value).ok_or_else(|| {
                        VolumeError::UnsupportedFormat(format!("element type {}", value))
                    })?;
                }
                "elementnumberofchannels" => {
                    channels = value
                        .parse()
                        .map_err(|_| corrupted(format!("ElementNumberOfChannels = {}", value)))?;
                }
                "binarydatabyteordermsb" | "elementbyteordermsb" => {
                    let msb = parse_bool(value)
                        .ok_or_else(|| corrupted(format!("{} = {}", line.key, value)))?;
                    hints.endianness = if msb {
                        Endianness::Big
                    } else {
                        Endianness::Little
                    };
                }
                "binarydata" => {
                    if parse_bool(value) == Some(false) {
                        return Err(VolumeError::UnsupportedFormat("ASCII MetaImage data".to_string()));
                    }
                }
                "compresseddata" => {
                    if parse_bool(value) == Some(true) {
                        return Err(VolumeError::UnsupportedFormat(
                            "compressed MetaImage data".to_string(),
                        ));
                    }
                }
                "headersize" => {
                    header_size = value
                        .parse()
                        .map_err(|_| corrupted(format!("HeaderSize = {}", value)))?;
                }
                "transformmatrix" | "rotation" | "orientation" => {
                    let m = numbers()
                        .filter(|m| m.len() == 9)
                        .ok_or_else(|| corrupted(format!("{} = {}", line.key, value)))?;
                    for (r, row) in m.chunks(3).enumerate() {
                        hints.transform[r][..3].copy_from_slice(row);
                    }
                }
                "offset" | "position" | "origin" => {
                    let o = numbers()
                        .filter(|o| o.len() == 3)
                        .ok_or_else(|| corrupted(format!("{} = {}", line.key, value)))?;
                    for (r, v) in o.iter().enumerate() {
                        hints.transform[r][3] = *v;
                    }
                }
                "modality" => {
                    hints.modality = Modality::from_token(value.trim_start_matches("MET_MOD_"));
                }
                "elementdatafile" => {
                    element_data = Some(if value.eq_ignore_ascii_case("local") {
                        ElementData::Local
                    } else if value.eq_ignore_ascii_case("list") || value.contains('%') {
                        return Err(VolumeError::UnsupportedFormat(
                            "MetaImage file lists".to_string(),
                        ));
                    } else {
                        ElementData::File(value.to_string())
                    });
                    break;
                }
                _ => log_debug!(logger, "Ignoring MetaImage key {}", line.key),
            }
        }

        let element_data = element_data.ok_or_else(|| corrupted("no ElementDataFile".to_string()))?;
        let dims = dim_size.ok_or_else(|| corrupted("no DimSize".to_string()))?;
        if dims.len() < ndims {
            return Err(corrupted(format!("DimSize has {} of {} values", dims.len(), ndims)));
        }
        hints.dimensions = [dims[0], dims[1], if ndims > 2 { dims[2] } else { 1 }];
        check_dimensions(hints.dimensions)?;
        let num_frames = if ndims > 3 { dims[3] } else { 1 };
        if num_frames == 0 {
            return Err(corrupted("empty time dimension".to_string()));
        }
        if let Some(s) = spacing {
            for (d, v) in hints.spacing.iter_mut().zip(s) {
                *d = v;
            }
        }
        hints.layout = match channels {
            1 => ChannelLayout::Intensity,
            2 => ChannelLayout::LuminanceAlpha,
            3 => ChannelLayout::Rgb,
            4 => ChannelLayout::Rgba,
            n => {
                return Err(VolumeError::UnsupportedFormat(format!(
                    "{} channels per element",
                    n
                )))
            }
        };

        Ok(MhdHeader {
            ndims,
            hints,
            num_frames,
            header_size,
            element_data,
            local_offset: reader.bytes_consumed(),
        })
    }

    /// Parse the header file at the given path.
    pub fn from_file<P: AsRef<Path>>(path: P, logger: &Logger) -> Result<Self> {
        let path = path.as_ref();
        let reader = TextHeaderReader::open(path)?;
        MhdHeader::from_reader(reader.into_inner(), path, logger)
    }

    /// The bytes of one frame, `None` if it does not fit in a `u64`.
    pub fn frame_bytes(&self) -> Option<u64> {
        let bpv = (self.hints.format.size_of() * self.hints.layout.channels()) as u64;
        self.hints.voxel_count()?.checked_mul(bpv)
    }
}

/// Reader of MetaImage volumes.
#[derive(Debug)]
pub struct MhdVolumeReader {
    logger: Logger,
    decoder: RawVoxelDecoder,
}

impl Default for MhdVolumeReader {
    fn default() -> Self {
        MhdVolumeReader::new()
    }
}

impl MhdVolumeReader {
    /// Create a reader with its default logger.
    pub fn new() -> Self {
        MhdVolumeReader {
            logger: Logger::new("volread.MhdVolumeReader"),
            decoder: RawVoxelDecoder::default(),
        }
    }

    /// Parse a header file.
    pub fn parse_header<P: AsRef<Path>>(&self, path: P) -> Result<MhdHeader> {
        MhdHeader::from_file(path, &self.logger)
    }

    /// The payload path of a header and the decode hints with the final
    /// byte offset of the first frame.
    pub fn payload(&self, header: &MhdHeader, header_path: &Path) -> Result<(PathBuf, DecodeHints)> {
        let mut hints = header.hints.clone();
        let (path, base) = match &header.element_data {
            ElementData::Local => (header_path.to_owned(), header.local_offset),
            ElementData::File(name) => (resolve_relative(header_path, name), 0),
        };
        let out_of_range = || {
            VolumeError::CorruptedHeader(header_path.to_owned(), "data size out of range".to_string())
        };
        hints.header_skip = if header.header_size >= 0 {
            base.checked_add(header.header_size as u64)
                .ok_or_else(out_of_range)?
        } else {
            let len = open_file(&path)?.metadata()?.len();
            let data = header
                .frame_bytes()
                .and_then(|b| b.checked_mul(header.num_frames as u64))
                .ok_or_else(out_of_range)?;
            len.checked_sub(data)
                .ok_or_else(|| VolumeError::Truncated(path.clone(), data, len))?
        };
        Ok((path, hints))
    }

    fn read_frames(&mut self, url: &VolumeUrl, first: usize, last: usize) -> Result<VolumeBatch> {
        let header_path = url.file_path();
        log_info!(self.logger, "Loading MetaImage {}", header_path.display());
        let header = self.parse_header(&header_path)?;
        let frames = frame_range(requested_time_frame(url)?, header.num_frames)?;
        let (path, hints) = self.payload(&header, &header_path)?;
        let raw = VolumeUrl::new(None, &path);

        let mut batch = VolumeBatch::new();
        for frame in frames {
            self.decoder.set_hints(hints.clone().with_time_frame(Some(frame)));
            for mut volume in self.decoder.read_slices(&raw, first, last)? {
                let mut origin = VolumeUrl::new(None, &header_path);
                origin.add_search_parameter("timeframe", frame);
                volume.set_origin(origin);
                batch.push(volume);
            }
        }
        Ok(batch)
    }
}

impl VolumeReader for MhdVolumeReader {
    fn name(&self) -> &'static str {
        "MetaImage Reader"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["mhd"]
    }

    fn protocols(&self) -> &'static [&'static str] {
        &["mhd"]
    }

    fn read(&mut self, url: &VolumeUrl) -> Result<VolumeBatch> {
        self.read_frames(url, 0, 0)
    }

    fn supports_slices(&self) -> bool {
        true
    }

    fn read_slices(&mut self, url: &VolumeUrl, first: usize, last: usize) -> Result<VolumeBatch> {
        self.read_frames(url, first, last)
    }
}
