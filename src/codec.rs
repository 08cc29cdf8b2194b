//! Byte order conversion between the host and the device
//!
//! Every multi-byte field exchanged with the embedded CPUs, whether through
//! the mailbox or through program memory, is little-endian. The helpers here
//! convert single values. Whole structures are encoded with the [`byte`]
//! crate, using [`WIRE`] as context, through [`encode`] and [`decode`].

use byte::{ctx::Endian, BytesExt, TryRead, TryWrite};

/// Byte order of every field on the device side
pub const WIRE: Endian = byte::LE;

/// Reads a little-endian unsigned integer of `width` bytes from the start of
/// `bytes`
///
/// Only widths from 1 to 4 are meaningful. Larger widths are truncated to 4
/// and a width that exceeds `bytes` is truncated to its length, so this never
/// reads past the buffer.
pub fn int_from_bytes(bytes: &[u8], width: usize) -> u32 {
    bytes
        .iter()
        .take(width.min(4))
        .enumerate()
        .fold(0u32, |val, (i, b)| val | (*b as u32) << (i * 8))
}

/// Converts a host value to device byte order
#[inline(always)]
pub const fn host_to_wire_16(value: u16) -> u16 {
    value.to_le()
}

/// Converts a host value to device byte order
#[inline(always)]
pub const fn host_to_wire_32(value: u32) -> u32 {
    value.to_le()
}

/// Converts a host value to device byte order
#[inline(always)]
pub const fn host_to_wire_64(value: u64) -> u64 {
    value.to_le()
}

/// Converts a value in device byte order to host order
#[inline(always)]
pub const fn wire_to_host_16(value: u16) -> u16 {
    u16::from_le(value)
}

/// Converts a value in device byte order to host order
#[inline(always)]
pub const fn wire_to_host_32(value: u32) -> u32 {
    u32::from_le(value)
}

/// Converts a value in device byte order to host order
#[inline(always)]
pub const fn wire_to_host_64(value: u64) -> u64 {
    u64::from_le(value)
}

/// Fixed encoded size of a structure exchanged with the firmware
pub trait WireSize {
    /// Number of bytes the structure occupies on the wire
    const WIRE_LEN: usize;
}

/// Encodes `value` at the start of `bytes`, returning the number of bytes
/// written
pub fn encode<T>(value: T, bytes: &mut [u8]) -> byte::Result<usize>
where
    T: TryWrite<Endian>,
{
    let mut offset = 0;
    bytes.write_with(&mut offset, value, WIRE)?;
    Ok(offset)
}

/// Decodes a `T` from the start of `bytes`
pub fn decode<'a, T>(bytes: &'a [u8]) -> byte::Result<T>
where
    T: TryRead<'a, Endian>,
{
    bytes.read_with(&mut 0, WIRE)
}

/// Writes every element of `values` in device byte order
pub(crate) fn write_array<T>(bytes: &mut [u8], offset: &mut usize, values: &[T]) -> byte::Result<()>
where
    T: TryWrite<Endian> + Copy,
{
    for value in values {
        bytes.write_with(offset, *value, WIRE)?;
    }
    Ok(())
}

/// Fills `values` from bytes in device byte order
pub(crate) fn read_array<'a, T>(
    bytes: &'a [u8],
    offset: &mut usize,
    values: &mut [T],
) -> byte::Result<()>
where
    T: TryRead<'a, Endian>,
{
    for value in values.iter_mut() {
        *value = bytes.read_with(offset, WIRE)?;
    }
    Ok(())
}

/// Writes an `f32` as its IEEE-754 bit pattern
pub(crate) fn write_f32(bytes: &mut [u8], offset: &mut usize, value: f32) -> byte::Result<()> {
    bytes.write_with(offset, value.to_bits(), WIRE)
}

/// Reads an `f32` from its IEEE-754 bit pattern
pub(crate) fn read_f32(bytes: &[u8], offset: &mut usize) -> byte::Result<f32> {
    let bits: u32 = bytes.read_with(offset, WIRE)?;
    Ok(f32::from_bits(bits))
}

/// Writes a 64-bit word in device byte order
pub(crate) fn write_u64(bytes: &mut [u8], offset: &mut usize, value: u64) -> byte::Result<()> {
    let end = *offset + 8;
    let dst = bytes.get_mut(*offset..end).ok_or(byte::Error::Incomplete)?;
    dst.copy_from_slice(&host_to_wire_64(value).to_ne_bytes());
    *offset = end;
    Ok(())
}

/// Reads a 64-bit word in device byte order
pub(crate) fn read_u64(bytes: &[u8], offset: &mut usize) -> byte::Result<u64> {
    let end = *offset + 8;
    let src = bytes.get(*offset..end).ok_or(byte::Error::Incomplete)?;
    let mut raw = [0u8; 8];
    raw.copy_from_slice(src);
    *offset = end;
    Ok(wire_to_host_64(u64::from_ne_bytes(raw)))
}

/// Writes an `f64` as its IEEE-754 bit pattern
pub(crate) fn write_f64(bytes: &mut [u8], offset: &mut usize, value: f64) -> byte::Result<()> {
    write_u64(bytes, offset, value.to_bits())
}

/// Reads an `f64` from its IEEE-754 bit pattern
pub(crate) fn read_f64(bytes: &[u8], offset: &mut usize) -> byte::Result<f64> {
    read_u64(bytes, offset).map(f64::from_bits)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_int_from_bytes() {
        let bytes = [0x78, 0x56, 0x34, 0x12, 0xff];

        assert_eq!(int_from_bytes(&bytes, 1), 0x78);
        assert_eq!(int_from_bytes(&bytes, 2), 0x5678);
        assert_eq!(int_from_bytes(&bytes, 3), 0x34_5678);
        assert_eq!(int_from_bytes(&bytes, 4), 0x1234_5678);
        // Width is capped at four bytes
        assert_eq!(int_from_bytes(&bytes, 8), 0x1234_5678);
        assert_eq!(int_from_bytes(&bytes[..2], 4), 0x5678);
        assert_eq!(int_from_bytes(&bytes, 0), 0);
    }

    #[test]
    fn test_wire_round_trip() {
        for x in [0u16, 1, 0x00ff, 0x1234, 0x8000, u16::MAX] {
            assert_eq!(wire_to_host_16(host_to_wire_16(x)), x);
        }
        for x in [0u32, 1, 0x1234_5678, 0x8000_0000, u32::MAX] {
            assert_eq!(wire_to_host_32(host_to_wire_32(x)), x);
        }
        for x in [0u64, 1, 0x0123_4567_89ab_cdef, 1 << 63, u64::MAX] {
            assert_eq!(wire_to_host_64(host_to_wire_64(x)), x);
        }
    }

    #[test]
    fn test_wire_is_little_endian() {
        assert_eq!(host_to_wire_32(0x1234_5678).to_ne_bytes(), [0x78, 0x56, 0x34, 0x12]);
        assert_eq!(host_to_wire_16(0xbeef).to_ne_bytes(), [0xef, 0xbe]);
    }

    #[test]
    fn test_arrays_and_floats() {
        let mut bytes = [0u8; 10];
        let mut offset = 0;

        write_array(&mut bytes, &mut offset, &[-2i16, 0x0102]).unwrap();
        write_f32(&mut bytes, &mut offset, 0.5).unwrap();
        assert_eq!(offset, 8);
        assert_eq!(&bytes[..8], &[0xfe, 0xff, 0x02, 0x01, 0x00, 0x00, 0x00, 0x3f]);

        let mut offset = 0;
        let mut values = [0i16; 2];
        read_array(&bytes, &mut offset, &mut values).unwrap();
        assert_eq!(values, [-2, 0x0102]);
        assert_eq!(read_f32(&bytes, &mut offset).unwrap(), 0.5);

        // Not enough room left for another word
        assert!(read_f32(&bytes, &mut offset).is_err());
    }

    #[test]
    fn test_doubles() {
        let mut bytes = [0u8; 12];
        let mut offset = 2;

        write_f64(&mut bytes, &mut offset, -1.5).unwrap();
        assert_eq!(offset, 10);
        assert_eq!(&bytes[2..10], &(-1.5f64).to_bits().to_le_bytes());
        assert!(write_u64(&mut bytes, &mut offset, 1).is_err());
        assert_eq!(offset, 10);

        let mut offset = 2;
        assert_eq!(read_f64(&bytes, &mut offset).unwrap(), -1.5);
        assert!(read_u64(&bytes, &mut offset).is_err());
    }
}
