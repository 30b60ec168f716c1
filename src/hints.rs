//! Decode hints: the format independent parameters needed to interpret a
//! raw binary payload as a voxel grid, and their query string encoding.
use crate::error::{Result, VolumeError};
use crate::typedef::{ChannelLayout, Modality, ScalarFormat, SliceOrder, VoxelType};
use crate::url::VolumeUrl;
use byteordered::Endianness;
use std::path::Path;
use std::str::FromStr;

/// Largest accepted extent along any axis.
pub const MAX_DIMENSION: usize = 10_000;

/// The 4x4 identity matrix.
pub const IDENTITY: [[f32; 4]; 4] = [
    [1., 0., 0., 0.],
    [0., 1., 0., 0.],
    [0., 0., 1., 0.],
    [0., 0., 0., 1.],
];

/// Query keys understood by [`DecodeHints::from_url`].
///
/// [`DecodeHints::from_url`]: ./struct.DecodeHints.html#method.from_url
pub mod keys {
    /// Channel layout token.
    pub const OBJECT_MODEL: &str = "objectModel";
    /// Scalar format token.
    pub const FORMAT: &str = "format";
    /// Byte offset of the voxel data.
    pub const HEADER_SKIP: &str = "headerskip";
    /// Zero based frame index, `-1` for all frames.
    pub const TIME_FRAME: &str = "timeframe";
    /// `1` when the payload is big endian.
    pub const BIG_ENDIAN: &str = "bigEndian";
    /// Extent along x.
    pub const DIM_X: &str = "dim_x";
    /// Extent along y.
    pub const DIM_Y: &str = "dim_y";
    /// Extent along z.
    pub const DIM_Z: &str = "dim_z";
    /// Voxel size along x.
    pub const SPACING_X: &str = "spacing_x";
    /// Voxel size along y.
    pub const SPACING_Y: &str = "spacing_y";
    /// Voxel size along z.
    pub const SPACING_Z: &str = "spacing_z";
    /// Slice traversal order, when not `+z`.
    pub const SLICE_ORDER: &str = "sliceorder";
}

/// The contract between header parsing and binary decoding.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodeHints {
    /// Voxel counts along x, y and z.
    pub dimensions: [usize; 3],
    /// Physical voxel size along each axis.
    pub spacing: [f32; 3],
    /// Channel layout of the voxels.
    pub layout: ChannelLayout,
    /// Scalar format of every channel.
    pub format: ScalarFormat,
    /// Frame to read from a multi-frame payload, `None` for all frames.
    pub time_frame: Option<usize>,
    /// Byte offset of the voxel data in the payload file.
    pub header_skip: u64,
    /// Byte order of the payload.
    pub endianness: Endianness,
    /// Voxel to world transformation, row major.
    pub transform: [[f32; 4]; 4],
    /// Acquisition modality.
    pub modality: Modality,
    /// Checksum propagated verbatim to the decoded volume.
    pub hash: Option<String>,
    /// Time step of the decoded volume. When absent the frame index is used.
    pub time_step: Option<f32>,
    /// Traversal order of the slices in the payload.
    pub slice_order: SliceOrder,
}

impl Default for DecodeHints {
    fn default() -> Self {
        DecodeHints {
            dimensions: [0; 3],
            spacing: [1.; 3],
            layout: ChannelLayout::Intensity,
            format: ScalarFormat::Uint8,
            time_frame: None,
            header_skip: 0,
            endianness: Endianness::Little,
            transform: IDENTITY,
            modality: Modality::Unknown,
            hash: None,
            time_step: None,
            slice_order: SliceOrder::default(),
        }
    }
}

impl DecodeHints {
    /// Hints for an intensity volume with the given shape and format.
    pub fn new(dimensions: [usize; 3], format: ScalarFormat) -> Self {
        DecodeHints {
            dimensions,
            format,
            ..Default::default()
        }
    }

    /// Set the voxel spacing.
    pub fn with_spacing(mut self, spacing: [f32; 3]) -> Self {
        self.spacing = spacing;
        self
    }

    /// Set the channel layout.
    pub fn with_layout(mut self, layout: ChannelLayout) -> Self {
        self.layout = layout;
        self
    }

    /// Set the scalar format.
    pub fn with_format(mut self, format: ScalarFormat) -> Self {
        self.format = format;
        self
    }

    /// Select a single time frame.
    pub fn with_time_frame(mut self, frame: Option<usize>) -> Self {
        self.time_frame = frame;
        self
    }

    /// Set the byte offset of the voxel data.
    pub fn with_header_skip(mut self, skip: u64) -> Self {
        self.header_skip = skip;
        self
    }

    /// Set the payload byte order.
    pub fn with_endianness(mut self, e: Endianness) -> Self {
        self.endianness = e;
        self
    }

    /// Set the voxel to world transform.
    pub fn with_transform(mut self, transform: [[f32; 4]; 4]) -> Self {
        self.transform = transform;
        self
    }

    /// Set the modality.
    pub fn with_modality(mut self, modality: Modality) -> Self {
        self.modality = modality;
        self
    }

    /// Set the slice order.
    pub fn with_slice_order(mut self, order: SliceOrder) -> Self {
        self.slice_order = order;
        self
    }

    /// Whether the payload is big endian.
    pub fn big_endian(&self) -> bool {
        self.endianness == Endianness::Big
    }

    /// Number of voxels in one frame, `None` if it does not fit in a `u64`.
    pub fn voxel_count(&self) -> Option<u64> {
        self.dimensions
            .iter()
            .try_fold(1u64, |n, &d| n.checked_mul(d as u64))
    }

    /// Check the dimensions and resolve the voxel type.
    ///
    /// # Errors
    ///
    /// - `VolumeError::InvalidParameters` if any dimension is zero or
    /// larger than `MAX_DIMENSION`.
    /// - `VolumeError::UnsupportedFormat` if the layout and format have no
    /// voxel type.
    pub fn validate(&self) -> Result<VoxelType> {
        check_dimensions(self.dimensions)?;
        VoxelType::resolve(self.layout, self.format)
    }

    /// Encode these hints as query parameters of the given locator.
    pub fn encode_into(&self, url: &mut VolumeUrl) {
        url.add_search_parameter(keys::OBJECT_MODEL, self.layout);
        url.add_search_parameter(keys::FORMAT, self.format);
        url.add_search_parameter(keys::HEADER_SKIP, self.header_skip);
        match self.time_frame {
            Some(t) => url.add_search_parameter(keys::TIME_FRAME, t),
            None => url.add_search_parameter(keys::TIME_FRAME, -1),
        }
        if self.big_endian() {
            url.add_search_parameter(keys::BIG_ENDIAN, 1);
        }
        url.add_search_parameter(keys::DIM_X, self.dimensions[0]);
        url.add_search_parameter(keys::DIM_Y, self.dimensions[1]);
        url.add_search_parameter(keys::DIM_Z, self.dimensions[2]);
        url.add_search_parameter(keys::SPACING_X, self.spacing[0]);
        url.add_search_parameter(keys::SPACING_Y, self.spacing[1]);
        url.add_search_parameter(keys::SPACING_Z, self.spacing[2]);
        if !self.slice_order.is_default() {
            url.add_search_parameter(keys::SLICE_ORDER, self.slice_order);
        }
    }

    /// A `raw://` locator for the given payload which reproduces a read
    /// with these hints.
    pub fn to_url<P: AsRef<Path>>(&self, payload: P) -> VolumeUrl {
        let mut url = VolumeUrl::new(Some("raw"), payload);
        self.encode_into(&mut url);
        url
    }

    /// Decode hints from the query of a locator. Keys which are absent keep
    /// their default value.
    ///
    /// # Errors
    ///
    /// - `VolumeError::InvalidParameters` if a value cannot be parsed.
    /// - `VolumeError::UnsupportedFormat` on unknown layout or format tokens.
    pub fn from_url(url: &VolumeUrl) -> Result<Self> {
        let mut hints = DecodeHints::default();
        if let Some(v) = url.search_parameter(keys::OBJECT_MODEL) {
            hints.layout = v.parse()?;
        }
        if let Some(v) = url.search_parameter(keys::FORMAT) {
            hints.format = v.parse()?;
        }
        if let Some(v) = url.search_parameter(keys::HEADER_SKIP) {
            hints.header_skip = parse_param(keys::HEADER_SKIP, v)?;
        }
        if let Some(v) = url.search_parameter(keys::TIME_FRAME) {
            let t: i64 = parse_param(keys::TIME_FRAME, v)?;
            hints.time_frame = if t < 0 { None } else { Some(t as usize) };
        }
        if let Some(v) = url.search_parameter(keys::BIG_ENDIAN) {
            let big = v == "1" || v.eq_ignore_ascii_case("true");
            hints.endianness = if big {
                Endianness::Big
            } else {
                Endianness::Little
            };
        }
        let dim_keys = [keys::DIM_X, keys::DIM_Y, keys::DIM_Z];
        for (d, key) in hints.dimensions.iter_mut().zip(dim_keys.iter()) {
            if let Some(v) = url.search_parameter(key) {
                *d = parse_param(key, v)?;
            }
        }
        let spacing_keys = [keys::SPACING_X, keys::SPACING_Y, keys::SPACING_Z];
        for (s, key) in hints.spacing.iter_mut().zip(spacing_keys.iter()) {
            if let Some(v) = url.search_parameter(key) {
                *s = parse_param(key, v)?;
            }
        }
        if let Some(v) = url.search_parameter(keys::SLICE_ORDER) {
            hints.slice_order = v.parse()?;
        }
        Ok(hints)
    }
}

/// Check that every extent is positive and at most `MAX_DIMENSION`.
pub fn check_dimensions(dimensions: [usize; 3]) -> Result<()> {
    if dimensions.iter().any(|&d| d == 0 || d > MAX_DIMENSION) {
        return Err(VolumeError::InvalidParameters(format!(
            "invalid volume dimensions {:?}",
            dimensions
        )));
    }
    Ok(())
}

fn parse_param<T: FromStr>(key: &str, value: &str) -> Result<T> {
    value.trim().parse().map_err(|_| {
        VolumeError::InvalidParameters(format!("invalid value {:?} for {}", value, key))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::typedef::Axis;
    use pretty_assertions::assert_eq;

    #[test]
    fn query_round_trip() {
        let hints = DecodeHints::new([41, 42, 43], ScalarFormat::Int16)
            .with_layout(ChannelLayout::LuminanceAlpha)
            .with_spacing([0.5, 1.25, 3.])
            .with_header_skip(1024)
            .with_endianness(Endianness::Big)
            .with_time_frame(Some(2))
            .with_slice_order(SliceOrder {
                axis: Axis::Y,
                reversed: true,
            });
        let url = hints.to_url("/data/a.raw");
        let reparsed = VolumeUrl::parse(&url.to_string());
        assert_eq!(reparsed.protocol(), Some("raw"));
        let back = DecodeHints::from_url(&reparsed).unwrap();
        assert_eq!(back, hints);
    }

    #[test]
    fn encoding_order() {
        let hints = DecodeHints::new([2, 3, 4], ScalarFormat::Uint8);
        let url = hints.to_url("a.raw");
        assert_eq!(
            url.to_string(),
            "raw://a.raw?objectModel=I&format=UCHAR&headerskip=0&timeframe=-1\
             &dim_x=2&dim_y=3&dim_z=4&spacing_x=1&spacing_y=1&spacing_z=1"
        );
    }

    #[test]
    fn bad_values() {
        let url = VolumeUrl::parse("raw://a.raw?dim_x=ten");
        let e = DecodeHints::from_url(&url).unwrap_err();
        assert_eq!(e.kind(), ErrorKind::InvalidParameters);
        let url = VolumeUrl::parse("raw://a.raw?format=HALF");
        let e = DecodeHints::from_url(&url).unwrap_err();
        assert_eq!(e.kind(), ErrorKind::UnsupportedFormat);
    }

    #[test]
    fn dimension_bounds() {
        assert!(check_dimensions([1, 1, 1]).is_ok());
        assert!(check_dimensions([10_000, 1, 1]).is_ok());
        assert!(check_dimensions([0, 10, 10]).is_err());
        assert!(check_dimensions([10, 10_001, 10]).is_err());
    }
}
