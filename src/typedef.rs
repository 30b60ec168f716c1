//! This module contains the closed set of voxel types understood by the
//! readers: scalar formats, channel layouts and their resolved pairing,
//! together with the small enumerations found in volume headers
//! (modality, slice order).

use crate::error::{Result, VolumeError};
use std::fmt;
use std::str::FromStr;

/// Data type of a single scalar element in a raw voxel payload.
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy, FromPrimitive)]
pub enum ScalarFormat {
    /// unsigned char.
    Uint8 = 1,
    /// signed char.
    Int8 = 2,
    /// unsigned short.
    Uint16 = 3,
    /// unsigned short holding 12 significant bits.
    Uint16Bits12 = 4,
    /// signed short.
    Int16 = 5,
    /// unsigned int.
    Uint32 = 6,
    /// signed int.
    Int32 = 7,
    /// unsigned long long.
    Uint64 = 8,
    /// signed long long.
    Int64 = 9,
    /// 32 bit float.
    Float32 = 10,
    /// 64 bit float = double.
    Float64 = 11,
}

impl ScalarFormat {
    /// All scalar formats, in declaration order.
    pub const ALL: [ScalarFormat; 11] = [
        ScalarFormat::Uint8,
        ScalarFormat::Int8,
        ScalarFormat::Uint16,
        ScalarFormat::Uint16Bits12,
        ScalarFormat::Int16,
        ScalarFormat::Uint32,
        ScalarFormat::Int32,
        ScalarFormat::Uint64,
        ScalarFormat::Int64,
        ScalarFormat::Float32,
        ScalarFormat::Float64,
    ];

    /// Retrieve the size of an element of this data type, in bytes.
    pub fn size_of(self) -> usize {
        use ScalarFormat::*;
        match self {
            Uint8 | Int8 => 1,
            Uint16 | Uint16Bits12 | Int16 => 2,
            Uint32 | Int32 | Float32 => 4,
            Uint64 | Int64 | Float64 => 8,
        }
    }

    /// The header token naming this format.
    pub fn token(self) -> &'static str {
        use ScalarFormat::*;
        match self {
            Uint8 => "UCHAR",
            Int8 => "CHAR",
            Uint16 => "USHORT",
            Uint16Bits12 => "USHORT_12",
            Int16 => "SHORT",
            Uint32 => "UINT",
            Int32 => "INT",
            Uint64 => "UINT64",
            Int64 => "INT64",
            Float32 => "FLOAT",
            Float64 => "DOUBLE",
        }
    }

    /// Resolve a header token (case insensitive) into a scalar format.
    pub fn from_token(token: &str) -> Option<Self> {
        let token = token.trim();
        ScalarFormat::ALL
            .iter()
            .cloned()
            .find(|f| f.token().eq_ignore_ascii_case(token))
    }

    /// Whether this is a floating point format.
    pub fn is_float(self) -> bool {
        self == ScalarFormat::Float32 || self == ScalarFormat::Float64
    }
}

impl fmt::Display for ScalarFormat {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.token())
    }
}

impl FromStr for ScalarFormat {
    type Err = VolumeError;

    fn from_str(s: &str) -> Result<Self> {
        ScalarFormat::from_token(s)
            .ok_or_else(|| VolumeError::UnsupportedFormat(format!("format {:?}", s)))
    }
}

/// Element ordering of a symmetric second order tensor in its source file.
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub enum TensorOrdering {
    /// `xx xy xz yy yz zz`, the stored order.
    Upper,
    /// `xx yx yy zx zy zz`.
    Lower,
    /// `xx yy zz xy xz yz`.
    Diagonal,
}

impl TensorOrdering {
    /// For each element in the source order, its position in the
    /// upper-triangular order.
    pub(crate) fn destinations(self) -> [usize; 6] {
        match self {
            TensorOrdering::Upper => [0, 1, 2, 3, 4, 5],
            TensorOrdering::Lower => [0, 1, 3, 2, 4, 5],
            TensorOrdering::Diagonal => [0, 3, 5, 1, 2, 4],
        }
    }
}

/// Source layout of a tensor volume.
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub struct TensorLayout {
    /// Element ordering in the source.
    pub ordering: TensorOrdering,
    /// Whether the six elements are stored as separate planes
    /// (all `xx` values, then all `xy` values, ...) instead of interleaved.
    pub fusion: bool,
}

/// The number and meaning of channels in one voxel.
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub enum ChannelLayout {
    /// Single intensity channel.
    Intensity,
    /// Luminance and alpha.
    LuminanceAlpha,
    /// Red, green, blue.
    Rgb,
    /// Red, green, blue, alpha.
    Rgba,
    /// A 3x3 matrix in row major order.
    Matrix3x3,
    /// A symmetric second order tensor.
    Tensor2(TensorLayout),
}

impl ChannelLayout {
    /// The number of scalar channels per voxel, once decoded.
    pub fn channels(self) -> usize {
        match self {
            ChannelLayout::Intensity => 1,
            ChannelLayout::LuminanceAlpha => 2,
            ChannelLayout::Rgb => 3,
            ChannelLayout::Rgba => 4,
            ChannelLayout::Matrix3x3 => 9,
            ChannelLayout::Tensor2(_) => 6,
        }
    }

    /// The header token naming this layout.
    pub fn token(self) -> &'static str {
        use TensorOrdering::*;
        match self {
            ChannelLayout::Intensity => "I",
            ChannelLayout::LuminanceAlpha => "LA",
            ChannelLayout::Rgb => "RGB",
            ChannelLayout::Rgba => "RGBA",
            ChannelLayout::Matrix3x3 => "MAT3",
            ChannelLayout::Tensor2(TensorLayout { ordering, fusion }) => {
                match (ordering, fusion) {
                    (Upper, false) => "TENSOR_UP",
                    (Lower, false) => "TENSOR_LOW",
                    (Diagonal, false) => "TENSOR_DIAG",
                    (Upper, true) => "TENSOR_FUSION_UP",
                    (Lower, true) => "TENSOR_FUSION_LOW",
                    (Diagonal, true) => "TENSOR_FUSION_DIAG",
                }
            }
        }
    }

    /// Resolve a header token (case insensitive) into a channel layout.
    pub fn from_token(token: &str) -> Option<Self> {
        let token = token.trim().to_ascii_uppercase();
        let layout = match token.as_str() {
            "I" => ChannelLayout::Intensity,
            "LA" => ChannelLayout::LuminanceAlpha,
            "RGB" => ChannelLayout::Rgb,
            "RGBA" => ChannelLayout::Rgba,
            "MAT3" => ChannelLayout::Matrix3x3,
            t if t.starts_with("TENSOR_") => {
                let rest = &t["TENSOR_".len()..];
                let (fusion, rest) = if rest.starts_with("FUSION_") {
                    (true, &rest["FUSION_".len()..])
                } else {
                    (false, rest)
                };
                let ordering = match rest {
                    "UP" => TensorOrdering::Upper,
                    "LOW" => TensorOrdering::Lower,
                    "DIAG" => TensorOrdering::Diagonal,
                    _ => return None,
                };
                ChannelLayout::Tensor2(TensorLayout { ordering, fusion })
            }
            _ => return None,
        };
        Some(layout)
    }

    /// Whether this is a tensor layout stored as separate planes.
    pub fn is_fused(self) -> bool {
        match self {
            ChannelLayout::Tensor2(TensorLayout { fusion, .. }) => fusion,
            _ => false,
        }
    }
}

impl fmt::Display for ChannelLayout {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.token())
    }
}

impl FromStr for ChannelLayout {
    type Err = VolumeError;

    fn from_str(s: &str) -> Result<Self> {
        ChannelLayout::from_token(s)
            .ok_or_else(|| VolumeError::UnsupportedFormat(format!("object model {:?}", s)))
    }
}

/// A resolved pairing of channel layout and scalar format: the concrete
/// voxel type of a decoded buffer.
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub struct VoxelType {
    layout: ChannelLayout,
    format: ScalarFormat,
}

impl VoxelType {
    /// Resolve a layout and format pairing.
    ///
    /// # Errors
    ///
    /// - `VolumeError::UnsupportedFormat` naming the pairing if it has no
    /// known voxel type. Matrix and tensor layouts only exist for `FLOAT`.
    pub fn resolve(layout: ChannelLayout, format: ScalarFormat) -> Result<Self> {
        match layout {
            ChannelLayout::Intensity
            | ChannelLayout::LuminanceAlpha
            | ChannelLayout::Rgb
            | ChannelLayout::Rgba => Ok(VoxelType { layout, format }),
            ChannelLayout::Matrix3x3 | ChannelLayout::Tensor2(_)
                if format == ScalarFormat::Float32 =>
            {
                Ok(VoxelType { layout, format })
            }
            _ => Err(VolumeError::UnsupportedFormat(format!(
                "object model {} with format {}",
                layout, format
            ))),
        }
    }

    /// The channel layout of the voxel.
    pub fn layout(self) -> ChannelLayout {
        self.layout
    }

    /// The scalar format of each channel.
    pub fn format(self) -> ScalarFormat {
        self.format
    }

    /// The number of channels per voxel.
    pub fn channels(self) -> usize {
        self.layout.channels()
    }

    /// The number of bytes taken by one voxel.
    pub fn bytes_per_voxel(self) -> usize {
        self.layout.channels() * self.format.size_of()
    }
}

impl fmt::Display for VoxelType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}/{}", self.layout, self.format)
    }
}

/// Acquisition modality of a volume. Informational only.
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub enum Modality {
    /// Not declared or not recognized.
    Unknown,
    /// Computed tomography.
    Ct,
    /// Magnetic resonance.
    Mr,
    /// Positron emission tomography.
    Pet,
    /// Single photon emission computed tomography.
    Spect,
    /// Ultrasound.
    Ultrasound,
    /// Diffusion tensor imaging.
    Dti,
    /// Segmentation masks.
    Segmentation,
}

impl Default for Modality {
    fn default() -> Self {
        Modality::Unknown
    }
}

impl Modality {
    /// The header token naming this modality.
    pub fn token(self) -> &'static str {
        match self {
            Modality::Unknown => "unknown",
            Modality::Ct => "CT",
            Modality::Mr => "MR",
            Modality::Pet => "PET",
            Modality::Spect => "SPECT",
            Modality::Ultrasound => "US",
            Modality::Dti => "DTI",
            Modality::Segmentation => "SEG",
        }
    }

    /// Resolve a header token, case insensitive. Unrecognized names map to
    /// `Modality::Unknown`.
    pub fn from_token(token: &str) -> Self {
        match token.trim().to_ascii_uppercase().as_str() {
            "CT" => Modality::Ct,
            "MR" | "MRI" => Modality::Mr,
            "PET" => Modality::Pet,
            "SPECT" => Modality::Spect,
            "US" | "ULTRASOUND" => Modality::Ultrasound,
            "DTI" => Modality::Dti,
            "SEG" | "SEGMENTATION" => Modality::Segmentation,
            _ => Modality::Unknown,
        }
    }
}

impl fmt::Display for Modality {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.token())
    }
}

/// One of the three spatial axes of a volume.
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub enum Axis {
    /// The fastest varying axis.
    X,
    /// Rows.
    Y,
    /// Slices.
    Z,
}

/// The traversal direction of the slices in a payload. Anything other
/// than `+z` makes the decoder reverse the named axis after reading.
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub struct SliceOrder {
    /// The axis along which slices are stored.
    pub axis: Axis,
    /// Whether the traversal runs from the last index to the first.
    pub reversed: bool,
}

impl Default for SliceOrder {
    fn default() -> Self {
        SliceOrder {
            axis: Axis::Z,
            reversed: false,
        }
    }
}

impl SliceOrder {
    /// The axis to reverse after decoding, if any.
    pub fn reversal(self) -> Option<Axis> {
        if self.reversed {
            Some(self.axis)
        } else {
            None
        }
    }

    /// Whether this is the default `+z` order.
    pub fn is_default(self) -> bool {
        self == SliceOrder::default()
    }
}

impl fmt::Display for SliceOrder {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let sign = if self.reversed { '-' } else { '+' };
        let axis = match self.axis {
            Axis::X => 'x',
            Axis::Y => 'y',
            Axis::Z => 'z',
        };
        write!(f, "{}{}", sign, axis)
    }
}

impl FromStr for SliceOrder {
    type Err = VolumeError;

    fn from_str(s: &str) -> Result<Self> {
        let t = s.trim().to_ascii_lowercase();
        let (reversed, axis) = match t.as_bytes() {
            [b'-', a] => (true, *a),
            [b'+', a] | [a] => (false, *a),
            _ => return Err(VolumeError::InvalidParameters(format!("slice order {:?}", s))),
        };
        let axis = match axis {
            b'x' => Axis::X,
            b'y' => Axis::Y,
            b'z' => Axis::Z,
            _ => return Err(VolumeError::InvalidParameters(format!("slice order {:?}", s))),
        };
        Ok(SliceOrder { axis, reversed })
    }
}
