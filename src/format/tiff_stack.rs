//! Reader for multi-page TIFF files holding a stack of z slices, one page
//! per slice.
//!
//! Pages whose size or colour type differ from the first page are logged
//! and skipped. A slice range selects pages by index; the origin locator
//! carries it as `firstSlice` and `lastSlice`.
use crate::error::{Result, VolumeError};
use crate::hints::check_dimensions;
use crate::logging::Logger;
use crate::reader::VolumeReader;
use crate::typedef::{ChannelLayout, ScalarFormat, VoxelType};
use crate::url::VolumeUrl;
use crate::util::open_file;
use crate::volume::{DecodedVolume, VolumeBatch, VoxelBuffer};
use std::io::BufReader;
use std::path::Path;
use tiff::decoder::{Decoder, DecodingResult, Limits};
use tiff::{ColorType, TiffError};

/// Query key of the first page of a slice range.
pub const FIRST_SLICE: &str = "firstSlice";
/// Query key of the page after the last one of a slice range.
pub const LAST_SLICE: &str = "lastSlice";

fn tiff_error(path: &Path, e: TiffError) -> VolumeError {
    match e {
        TiffError::IoError(e) => VolumeError::Io(e),
        TiffError::UnsupportedError(e) => VolumeError::UnsupportedFormat(e.to_string()),
        other => VolumeError::CorruptedHeader(path.to_owned(), other.to_string()),
    }
}

/// The channel layout and bits per sample of a page.
fn page_layout(colour: ColorType) -> Option<(ChannelLayout, u8)> {
    match colour {
        ColorType::Gray(bits) => Some((ChannelLayout::Intensity, bits)),
        ColorType::GrayA(bits) => Some((ChannelLayout::LuminanceAlpha, bits)),
        ColorType::RGB(bits) => Some((ChannelLayout::Rgb, bits)),
        ColorType::RGBA(bits) => Some((ChannelLayout::Rgba, bits)),
        _ => None,
    }
}

/// Append the samples of a decoded page in host byte order.
fn append_page(page: DecodingResult, data: &mut Vec<u8>) -> Option<ScalarFormat> {
    let format = match page {
        DecodingResult::U8(v) => {
            data.extend_from_slice(&v);
            ScalarFormat::Uint8
        }
        DecodingResult::I8(v) => {
            data.extend_from_slice(bytemuck::cast_slice(&v));
            ScalarFormat::Int8
        }
        DecodingResult::U16(v) => {
            data.extend_from_slice(bytemuck::cast_slice(&v));
            ScalarFormat::Uint16
        }
        DecodingResult::I16(v) => {
            data.extend_from_slice(bytemuck::cast_slice(&v));
            ScalarFormat::Int16
        }
        DecodingResult::U32(v) => {
            data.extend_from_slice(bytemuck::cast_slice(&v));
            ScalarFormat::Uint32
        }
        DecodingResult::I32(v) => {
            data.extend_from_slice(bytemuck::cast_slice(&v));
            ScalarFormat::Int32
        }
        DecodingResult::U64(v) => {
            data.extend_from_slice(bytemuck::cast_slice(&v));
            ScalarFormat::Uint64
        }
        DecodingResult::I64(v) => {
            data.extend_from_slice(bytemuck::cast_slice(&v));
            ScalarFormat::Int64
        }
        DecodingResult::F32(v) => {
            data.extend_from_slice(bytemuck::cast_slice(&v));
            ScalarFormat::Float32
        }
        DecodingResult::F64(v) => {
            data.extend_from_slice(bytemuck::cast_slice(&v));
            ScalarFormat::Float64
        }
        #[allow(unreachable_patterns)]
        _ => return None,
    };
    Some(format)
}

fn slice_parameter(url: &VolumeUrl, key: &str) -> Result<Option<usize>> {
    url.search_parameter(key)
        .map(|v| {
            v.trim().parse().map_err(|_| {
                VolumeError::InvalidParameters(format!("invalid value {:?} for {}", v, key))
            })
        })
        .transpose()
}

/// Reader of TIFF image stacks.
#[derive(Debug)]
pub struct TiffStackReader {
    logger: Logger,
}

impl Default for TiffStackReader {
    fn default() -> Self {
        TiffStackReader::new()
    }
}

impl TiffStackReader {
    /// Create a reader with its default logger.
    pub fn new() -> Self {
        TiffStackReader {
            logger: Logger::new("volread.TiffStackReader"),
        }
    }

    /// Decode the pages `first..last` into one volume. Both zero decodes
    /// every page.
    ///
    /// # Errors
    ///
    /// - `VolumeError::InvalidParameters` if the range is empty or exceeds
    /// the number of pages.
    /// - `VolumeError::UnsupportedFormat` on palette, CMYK and YCbCr pages,
    /// and on samples narrower than a byte.
    /// - `VolumeError::CorruptedHeader` if the file is not a valid TIFF.
    pub fn read_stack(&mut self, path: &Path, first: usize, last: usize) -> Result<DecodedVolume> {
        let bounded = !(first == 0 && last == 0);
        if bounded && last <= first {
            return Err(VolumeError::InvalidParameters(format!(
                "empty slice range {}..{}",
                first, last
            )));
        }
        let tiff_err = |e| tiff_error(path, e);
        let source = BufReader::new(open_file(path)?);
        let mut decoder = Decoder::new(source).map_err(tiff_err)?.with_limits(Limits::unlimited());
        let size = decoder.dimensions().map_err(tiff_err)?;
        let colour = decoder.colortype().map_err(tiff_err)?;
        let (layout, bits) = page_layout(colour)
            .filter(|&(_, bits)| bits >= 8 && bits % 8 == 0)
            .ok_or_else(|| VolumeError::UnsupportedFormat(format!("TIFF colour type {:?}", colour)))?;
        log_info!(
            self.logger,
            "Reading TIFF stack {} ({}x{} pages, {:?})",
            path.display(),
            size.0,
            size.1,
            colour
        );

        let mut data = Vec::new();
        let mut format = None;
        let mut depth = 0;
        let mut page = 0;
        loop {
            if !bounded || page >= first {
                let page_size = decoder.dimensions().map_err(tiff_err)?;
                let page_colour = decoder.colortype().map_err(tiff_err)?;
                if page_size != size || page_colour != colour {
                    log_error!(
                        self.logger,
                        "Skipping page {}: {}x{} {:?} instead of {}x{} {:?}",
                        page,
                        page_size.0,
                        page_size.1,
                        page_colour,
                        size.0,
                        size.1,
                        colour
                    );
                } else {
                    let decoded = decoder.read_image().map_err(tiff_err)?;
                    let page_format = append_page(decoded, &mut data)
                        .filter(|f| f.size_of() * 8 == bits as usize)
                        .ok_or_else(|| {
                            VolumeError::UnsupportedFormat(format!("TIFF samples of {} bits", bits))
                        })?;
                    format = Some(page_format);
                    depth += 1;
                }
            }
            page += 1;
            if bounded && page == last {
                break;
            }
            if !decoder.more_images() {
                if bounded {
                    return Err(VolumeError::InvalidParameters(format!(
                        "slice range {}..{} outside of 0..{}",
                        first, last, page
                    )));
                }
                break;
            }
            decoder.next_image().map_err(tiff_err)?;
        }

        let format = format.ok_or_else(|| {
            VolumeError::CorruptedHeader(path.to_owned(), "no readable pages".to_string())
        })?;
        let dim = [size.0 as usize, size.1 as usize, depth];
        check_dimensions(dim)?;
        let voxel_type = VoxelType::resolve(layout, format)?;
        let buffer = VoxelBuffer::from_raw_data(dim, voxel_type, data)?;

        let mut origin = VolumeUrl::new(Some("tiff"), path);
        if bounded {
            origin.add_search_parameter(FIRST_SLICE, first);
            origin.add_search_parameter(LAST_SLICE, last);
        }
        Ok(DecodedVolume::new(buffer, origin))
    }
}

impl VolumeReader for TiffStackReader {
    fn name(&self) -> &'static str {
        "TIFF Stack Reader"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["tif", "tiff"]
    }

    fn protocols(&self) -> &'static [&'static str] {
        &["tiff"]
    }

    fn read(&mut self, url: &VolumeUrl) -> Result<VolumeBatch> {
        let first = slice_parameter(url, FIRST_SLICE)?.unwrap_or(0);
        let last = slice_parameter(url, LAST_SLICE)?.unwrap_or(0);
        let volume = self.read_stack(&url.file_path(), first, last)?;
        Ok(std::iter::once(volume).collect())
    }

    fn supports_slices(&self) -> bool {
        true
    }

    fn read_slices(&mut self, url: &VolumeUrl, first: usize, last: usize) -> Result<VolumeBatch> {
        let volume = self.read_stack(&url.file_path(), first, last)?;
        Ok(std::iter::once(volume).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn layouts() {
        assert_eq!(page_layout(ColorType::Gray(16)), Some((ChannelLayout::Intensity, 16)));
        assert_eq!(page_layout(ColorType::RGBA(8)), Some((ChannelLayout::Rgba, 8)));
        assert_eq!(page_layout(ColorType::Palette(8)), None);
    }

    #[test]
    fn host_order_samples() {
        let mut data = vec![9u8];
        let format = append_page(DecodingResult::U16(vec![0x0102, 0x0304]), &mut data);
        assert_eq!(format, Some(ScalarFormat::Uint16));
        let mut expected = vec![9u8];
        expected.extend_from_slice(&0x0102u16.to_ne_bytes());
        expected.extend_from_slice(&0x0304u16.to_ne_bytes());
        assert_eq!(data, expected);
    }

    #[test]
    fn slice_keys() {
        let url = VolumeUrl::parse("tiff://a.tif?firstSlice=2&lastSlice=x");
        assert_eq!(slice_parameter(&url, FIRST_SLICE).unwrap(), Some(2));
        let e = slice_parameter(&url, LAST_SLICE).unwrap_err();
        assert_eq!(e.kind(), ErrorKind::InvalidParameters);
        assert_eq!(slice_parameter(&url, "other").unwrap(), None);
    }
}
