//! Primitive codec: fixnum integers and length-prefixed byte sequences
//! (distilled spec §4.2), resolved against `original_source/marshal48/unmarshal.c`.

use crate::errors::{MarshalError, Result};
use crate::stream::{ByteReader, ByteWriter};
use std::io::{Read, Write};

/// Decode one fixnum, little-endian multi-byte forms as prescribed by the
/// format. The `0xFC..0xFE` long-negative forms are unimplemented in the
/// original and remain so here; see SPEC_FULL.md §9.
pub fn decode_fixnum<R: Read>(reader: &mut ByteReader<R>) -> Result<i32> {
    let c = reader.next_byte()?;
    match c {
        0x00 => Ok(0),
        0x01..=0x03 => {
            let bytes = reader.next_bytes(c as usize)?;
            let mut value: i64 = 0;
            for (shift, b) in bytes.iter().enumerate() {
                value += (*b as i64) << (shift * 8);
            }
            Ok(value as i32)
        }
        0xff => {
            let b = reader.next_byte()?;
            Ok(1 - b as i32)
        }
        0xfc..=0xfe => Err(MarshalError::BadFixnum { header: c }),
        _ if c < 0x80 => Ok(c as i32 - 5),
        _ => Ok(0x80 - c as i32 - 5),
    }
}

/// Encode a fixnum using the shortest representation that round-trips
/// through [`decode_fixnum`].
///
/// Form selection, shortest first:
/// - `0` → the single `0x00` byte.
/// - `1..=122` → one-byte positive shortform (`value + 5`).
/// - `-128..=-5` → one-byte negative shortform (`123 - value`, i.e. the
///   `0x80 − value − 5` rule from the decode table, landing in `0x80..=0xFB`).
/// - everything else in `-254..=-1` → the two-byte `0xFF b` form
///   (`b = 1 - value`); this is the only form that reaches `-1..=-4` and
///   `-129..=-254`, since the one-byte shortform tops out at `-128`.
/// - positive magnitudes above `122` and up to `0x00FF_FFFF` → the long
///   positive form (`0x01..=0x03` header plus that many little-endian
///   magnitude bytes).
/// - negative magnitudes below `-254`, and positive magnitudes above
///   `0x00FF_FFFF`, have no implemented wire form (the decoder only
///   recognizes `0x01..=0x03` as length-prefix headers — see SPEC_FULL.md
///   §9) and are rejected with `EncodeOverflow`.
pub fn encode_fixnum<W: Write>(writer: &mut ByteWriter<W>, value: i32) -> Result<()> {
    if value == 0 {
        return writer.put_byte(0x00);
    }
    if (1..=122).contains(&value) {
        return writer.put_byte((value + 5) as u8);
    }
    if (-128..=-5).contains(&value) {
        return writer.put_byte((123 - value) as u8);
    }
    if (-254..=-1).contains(&value) {
        writer.put_byte(0xff)?;
        return writer.put_byte((1 - value) as u8);
    }

    if value < 0 {
        return Err(MarshalError::EncodeOverflow(format!(
            "negative fixnum {value} has no supported long-form encoding"
        )));
    }

    let magnitude = value as u32;
    if magnitude > 0x00ff_ffff {
        // The decoder only recognizes header bytes 0x01..=0x03 as
        // multi-byte length prefixes (header 0x04 would decode as a
        // one-byte shortform instead), so a 4-byte long form would not
        // round-trip. Reject rather than emit a form our own decoder
        // can't read back.
        return Err(MarshalError::EncodeOverflow(format!(
            "positive fixnum {value} has no supported long-form encoding"
        )));
    }
    let width = if magnitude <= 0xff {
        1
    } else if magnitude <= 0xffff {
        2
    } else {
        3
    };
    writer.put_byte(width as u8)?;
    for shift in 0..width {
        writer.put_byte(((magnitude >> (shift * 8)) & 0xff) as u8)?;
    }
    Ok(())
}

/// Decode a length-prefixed byte sequence: `fixnum(length) · bytes(length)`.
pub fn decode_byteseq<R: Read>(reader: &mut ByteReader<R>) -> Result<Vec<u8>> {
    let len = decode_fixnum(reader)?;
    if len < 0 {
        return Err(MarshalError::TypeMismatch(format!(
            "byte sequence length must be non-negative, got {len}"
        )));
    }
    reader.next_bytes(len as usize)
}

/// Encode a length-prefixed byte sequence.
pub fn encode_byteseq<W: Write>(writer: &mut ByteWriter<W>, bytes: &[u8]) -> Result<()> {
    let len = i32::try_from(bytes.len())
        .map_err(|_| MarshalError::EncodeOverflow("byte sequence too long".into()))?;
    encode_fixnum(writer, len)?;
    writer.put_bytes(bytes)
}
