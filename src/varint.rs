//! Variable-length unsigned integer and zig-zag signed integer encodings.
//!
//! The unsigned varint packs 7 data bits per byte plus a continuation flag
//! (`0x80`) that is set on every non-terminal byte and clear on the last
//! one. Zig-zag interleaves negative and non-negative integers so that
//! small magnitudes produce small unsigned values, which is what makes the
//! varint encoding compact for signed fields.

use std::io::{Read, Write};

use crate::error::{Error, Result};

/// Maximum bytes a varint can occupy for a given width, `ceil(bits / 7)`.
const fn max_varint_bytes(bits: u32) -> usize {
    ((bits + 6) / 7) as usize
}

/// Encodes `n` as an unsigned varint and writes it to `out`.
///
/// At most 10 bytes are emitted for a full 64-bit input.
pub fn write_uvarint<W: Write>(out: &mut W, mut n: u64) -> Result<()> {
    let mut buf = [0u8; 10];
    let mut len = 0;
    loop {
        let mut byte = (n & 0x7F) as u8;
        n >>= 7;
        if n != 0 {
            byte |= 0x80;
        }
        buf[len] = byte;
        len += 1;
        if n == 0 {
            break;
        }
    }
    out.write_all(&buf[..len]).map_err(Error::from)
}

/// Decodes an unsigned varint from `input`, failing if more than
/// `max_varint_bytes(bits)` bytes are needed or the stream ends mid-varint.
fn read_uvarint_bits<R: Read>(input: &mut R, bits: u32) -> Result<u64> {
    let max_bytes = max_varint_bytes(bits);
    let mut result: u64 = 0;
    let mut shift: u32 = 0;
    for _ in 0..max_bytes {
        let mut byte = [0u8; 1];
        input.read_exact(&mut byte).map_err(|e| {
            if e.kind() == std::io::ErrorKind::UnexpectedEof {
                Error::MalformedVarint("transport ended mid-varint")
            } else {
                Error::from(e)
            }
        })?;
        let byte = byte[0];
        result |= u64::from(byte & 0x7F) << shift;
        if byte & 0x80 == 0 {
            if bits < 64 && result >> bits != 0 {
                return Err(Error::MalformedVarint(
                    "varint value exceeds target width",
                ));
            }
            return Ok(result);
        }
        shift += 7;
    }
    Err(Error::MalformedVarint(
        "varint continuation bit set past the maximum byte count for this width",
    ))
}

/// Decodes a 64-bit unsigned varint.
pub fn read_uvarint64<R: Read>(input: &mut R) -> Result<u64> {
    read_uvarint_bits(input, 64)
}

/// Decodes an unsigned varint bounded to 32 bits (used for sizes).
pub fn read_uvarint32<R: Read>(input: &mut R) -> Result<u32> {
    read_uvarint_bits(input, 32).map(|v| v as u32)
}

/// Zig-zag encodes a signed 16-bit integer.
pub const fn zigzag_encode_16(n: i16) -> u16 {
    ((n << 1) ^ (n >> 15)) as u16
}

/// Zig-zag decodes a 16-bit value produced by [`zigzag_encode_16`].
pub const fn zigzag_decode_16(u: u16) -> i16 {
    ((u >> 1) as i16) ^ -((u & 1) as i16)
}

/// Zig-zag encodes a signed 32-bit integer.
pub const fn zigzag_encode_32(n: i32) -> u32 {
    ((n << 1) ^ (n >> 31)) as u32
}

/// Zig-zag decodes a 32-bit value produced by [`zigzag_encode_32`].
pub const fn zigzag_decode_32(u: u32) -> i32 {
    ((u >> 1) as i32) ^ -((u & 1) as i32)
}

/// Zig-zag encodes a signed 64-bit integer.
pub const fn zigzag_encode_64(n: i64) -> u64 {
    ((n << 1) ^ (n >> 63)) as u64
}

/// Zig-zag decodes a 64-bit value produced by [`zigzag_encode_64`].
pub const fn zigzag_decode_64(u: u64) -> i64 {
    ((u >> 1) as i64) ^ -((u & 1) as i64)
}

/// Writes `n` as a zig-zag varint of 16-bit width.
pub fn write_zigzag_16<W: Write>(out: &mut W, n: i16) -> Result<()> {
    write_uvarint(out, u64::from(zigzag_encode_16(n)))
}

/// Reads a zig-zag varint of 16-bit width.
pub fn read_zigzag_16<R: Read>(input: &mut R) -> Result<i16> {
    let u = read_uvarint_bits(input, 16)?;
    Ok(zigzag_decode_16(u as u16))
}

/// Writes `n` as a zig-zag varint of 32-bit width.
pub fn write_zigzag_32<W: Write>(out: &mut W, n: i32) -> Result<()> {
    write_uvarint(out, u64::from(zigzag_encode_32(n)))
}

/// Reads a zig-zag varint of 32-bit width.
pub fn read_zigzag_32<R: Read>(input: &mut R) -> Result<i32> {
    let u = read_uvarint_bits(input, 32)?;
    Ok(zigzag_decode_32(u as u32))
}

/// Writes `n` as a zig-zag varint of 64-bit width.
pub fn write_zigzag_64<W: Write>(out: &mut W, n: i64) -> Result<()> {
    write_uvarint(out, zigzag_encode_64(n))
}

/// Reads a zig-zag varint of 64-bit width.
pub fn read_zigzag_64<R: Read>(input: &mut R) -> Result<i64> {
    let u = read_uvarint_bits(input, 64)?;
    Ok(zigzag_decode_64(u))
}
