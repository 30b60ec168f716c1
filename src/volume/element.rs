//! This module defines the data element API, which maps primitive numeric
//! types onto the scalar formats of a voxel buffer and reads them from
//! byte sources.
use crate::error::Result;
use crate::typedef::ScalarFormat;
use byteordered::{ByteOrdered, Endian};
use bytemuck::Pod;
use num_traits::cast::AsPrimitive;
use std::io::Read;

/// Trait type for characterizing a voxel data element, implemented for
/// the primitive numeric types backing each scalar format.
pub trait DataElement:
    'static + Sized + Copy + Pod + AsPrimitive<f32> + AsPrimitive<f64>
{
    /// The scalar format mapped to this type.
    const SCALAR_FORMAT: ScalarFormat;

    /// Whether a buffer of the given scalar format can be viewed as
    /// elements of this type.
    fn accepts(format: ScalarFormat) -> bool {
        format == Self::SCALAR_FORMAT
    }

    /// Read a single element from the given byte source.
    fn from_raw<R, E>(src: R, endianness: E) -> Result<Self>
    where
        R: Read,
        E: Endian;

    /// Transform native order bytes into a vector of data elements.
    /// Trailing bytes which do not form a whole element are dropped.
    fn from_raw_vec(vec: &[u8]) -> Vec<Self> {
        let n = vec.len() / std::mem::size_of::<Self>() * std::mem::size_of::<Self>();
        bytemuck::pod_collect_to_vec(&vec[..n])
    }
}

impl DataElement for u8 {
    const SCALAR_FORMAT: ScalarFormat = ScalarFormat::Uint8;
    fn from_raw<R, E>(src: R, _: E) -> Result<Self>
    where
        R: Read,
        E: Endian,
    {
        ByteOrdered::native(src).read_u8().map_err(From::from)
    }
    fn from_raw_vec(vec: &[u8]) -> Vec<Self> {
        vec.to_vec()
    }
}

impl DataElement for i8 {
    const SCALAR_FORMAT: ScalarFormat = ScalarFormat::Int8;
    fn from_raw<R, E>(src: R, _: E) -> Result<Self>
    where
        R: Read,
        E: Endian,
    {
        ByteOrdered::native(src).read_i8().map_err(From::from)
    }
}

impl DataElement for u16 {
    const SCALAR_FORMAT: ScalarFormat = ScalarFormat::Uint16;
    fn accepts(format: ScalarFormat) -> bool {
        format == ScalarFormat::Uint16 || format == ScalarFormat::Uint16Bits12
    }
    fn from_raw<R, E>(src: R, e: E) -> Result<Self>
    where
        R: Read,
        E: Endian,
    {
        e.read_u16(src).map_err(From::from)
    }
}

impl DataElement for i16 {
    const SCALAR_FORMAT: ScalarFormat = ScalarFormat::Int16;
    fn from_raw<R, E>(src: R, e: E) -> Result<Self>
    where
        R: Read,
        E: Endian,
    {
        e.read_i16(src).map_err(From::from)
    }
}

impl DataElement for u32 {
    const SCALAR_FORMAT: ScalarFormat = ScalarFormat::Uint32;
    fn from_raw<R, E>(src: R, e: E) -> Result<Self>
    where
        R: Read,
        E: Endian,
    {
        e.read_u32(src).map_err(From::from)
    }
}

impl DataElement for i32 {
    const SCALAR_FORMAT: ScalarFormat = ScalarFormat::Int32;
    fn from_raw<R, E>(src: R, e: E) -> Result<Self>
    where
        R: Read,
        E: Endian,
    {
        e.read_i32(src).map_err(From::from)
    }
}

impl DataElement for u64 {
    const SCALAR_FORMAT: ScalarFormat = ScalarFormat::Uint64;
    fn from_raw<R, E>(src: R, e: E) -> Result<Self>
    where
        R: Read,
        E: Endian,
    {
        e.read_u64(src).map_err(From::from)
    }
}

impl DataElement for i64 {
    const SCALAR_FORMAT: ScalarFormat = ScalarFormat::Int64;
    fn from_raw<R, E>(src: R, e: E) -> Result<Self>
    where
        R: Read,
        E: Endian,
    {
        e.read_i64(src).map_err(From::from)
    }
}

impl DataElement for f32 {
    const SCALAR_FORMAT: ScalarFormat = ScalarFormat::Float32;
    fn from_raw<R, E>(src: R, e: E) -> Result<Self>
    where
        R: Read,
        E: Endian,
    {
        e.read_f32(src).map_err(From::from)
    }
}

impl DataElement for f64 {
    const SCALAR_FORMAT: ScalarFormat = ScalarFormat::Float64;
    fn from_raw<R, E>(src: R, e: E) -> Result<Self>
    where
        R: Read,
        E: Endian,
    {
        e.read_f64(src).map_err(From::from)
    }
}

#[cfg(test)]
mod tests {
    use super::DataElement;
    use crate::typedef::ScalarFormat;
    use byteordered::Endianness;

    #[test]
    fn read_with_endianness() {
        let bytes = [0x01u8, 0x02];
        assert_eq!(u16::from_raw(&bytes[..], Endianness::Big).unwrap(), 0x0102);
        assert_eq!(u16::from_raw(&bytes[..], Endianness::Little).unwrap(), 0x0201);
        assert!(u32::from_raw(&bytes[..], Endianness::Little).is_err());
    }

    #[test]
    fn twelve_bit_alias() {
        assert!(u16::accepts(ScalarFormat::Uint16Bits12));
        assert!(!i16::accepts(ScalarFormat::Uint16));
    }

    #[test]
    fn raw_vec() {
        let values = [1.5f32, -2.];
        let bytes: &[u8] = bytemuck::cast_slice(&values);
        assert_eq!(f32::from_raw_vec(bytes), vec![1.5, -2.]);
        assert_eq!(u8::from_raw_vec(&[1, 2, 3]), vec![1, 2, 3]);
    }
}
