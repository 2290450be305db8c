use std::io::Cursor;

use crate::byte_reader::ByteReader;
use crate::error::{DecodeError, ErrorKind};

type Reader<'a> = ByteReader<Cursor<&'a [u8]>>;

fn reader(buf: &[u8]) -> Reader<'_> {
    ByteReader::new(Cursor::new(buf))
}

fn err(r: &Reader<'_>, tag: u8, detail: impl Into<String>) -> DecodeError {
    DecodeError::new(ErrorKind::CorruptedEncoding, r.offset(), tag, detail)
}

/// Decode a ziplist blob into its ordered sequence of byte strings.
pub fn decode_ziplist(buf: &[u8]) -> Result<Vec<Vec<u8>>, DecodeError> {
    let mut r = reader(buf);
    r.skip(4)?; // zlbytes
    r.skip(4)?; // zltail
    r.skip(2)?; // zllen (sentinel-only; real count inferred by iterating)

    let mut out = Vec::new();
    loop {
        // prevlen doubles as the terminator slot: 0xFF here ends the list.
        let prevlen_marker = r.read_u8()?;
        if prevlen_marker == 0xFF {
            break;
        }
        if prevlen_marker == 254 {
            r.skip(4)?;
        }
        out.push(decode_ziplist_entry(&mut r)?);
    }
    Ok(out)
}

fn decode_ziplist_entry(r: &mut Reader<'_>) -> Result<Vec<u8>, DecodeError> {
    let tag = r.read_u8()?;
    match tag {
        t if t & 0xC0 == 0x00 => {
            let len = (t & 0x3F) as usize;
            Ok(r.read_exact(len)?)
        }
        t if t & 0xC0 == 0x40 => {
            let next = r.read_u8()? as usize;
            let len = (((t & 0x3F) as usize) << 8) | next;
            Ok(r.read_exact(len)?)
        }
        t if t & 0xC0 == 0x80 => {
            let len = r.read_u32_le()? as usize;
            Ok(r.read_exact(len)?)
        }
        0xC0 => Ok(r.read_i16_le()?.to_string().into_bytes()),
        0xD0 => Ok(r.read_i32_le()?.to_string().into_bytes()),
        0xE0 => Ok(r.read_i64_le()?.to_string().into_bytes()),
        0xF0 => {
            let b = r.read_exact(3)?;
            let mut v = ((b[2] as i32) << 16) | ((b[1] as i32) << 8) | (b[0] as i32);
            if v & 0x00800000 != 0 {
                v |= -0x0100_0000i32 as i32;
            }
            Ok(v.to_string().into_bytes())
        }
        0xFE => Ok(r.read_i8()?.to_string().into_bytes()),
        t if (0xF1..=0xFD).contains(&t) => {
            let v = (t & 0x0F) as i64 - 1;
            Ok(v.to_string().into_bytes())
        }
        other => Err(err(r, other, "unknown ziplist entry encoding")),
    }
}

/// Decode a listpack blob into its ordered sequence of byte strings.
pub fn decode_listpack(buf: &[u8]) -> Result<Vec<Vec<u8>>, DecodeError> {
    let mut r = reader(buf);
    r.skip(4)?; // total_bytes
    r.skip(2)?; // num_elements

    let mut out = Vec::new();
    loop {
        let first = r.read_u8()?;
        if first == 0xFF {
            break;
        }
        let (value, encoded_len) = decode_listpack_element(&mut r, first)?;
        out.push(value);
        r.skip(backlen_width(encoded_len))?;
    }
    Ok(out)
}

/// Returns the decoded element and the number of bytes its *encoding* (not
/// its decoded payload) occupied, for backlen-width computation.
fn decode_listpack_element(r: &mut Reader<'_>, first: u8) -> Result<(Vec<u8>, usize), DecodeError> {
    if first & 0x80 == 0x00 {
        let v = first & 0x7F;
        return Ok((v.to_string().into_bytes(), 1));
    }
    if first & 0xC0 == 0x80 {
        let len = (first & 0x3F) as usize;
        let data = r.read_exact(len)?;
        return Ok((data, 1 + len));
    }
    if first == 0xF0 {
        let len = r.read_u32_le()? as usize;
        let data = r.read_exact(len)?;
        return Ok((data, 5 + len));
    }
    if first == 0xF1 {
        let v = r.read_i16_le()?;
        return Ok((v.to_string().into_bytes(), 3));
    }
    if first == 0xF2 {
        let b = r.read_exact(3)?;
        let mut v = ((b[2] as i32) << 16) | ((b[1] as i32) << 8) | (b[0] as i32);
        if v & 0x00800000 != 0 {
            v |= -0x0100_0000i32 as i32;
        }
        return Ok((v.to_string().into_bytes(), 4));
    }
    if first == 0xF3 {
        let v = r.read_i32_le()?;
        return Ok((v.to_string().into_bytes(), 5));
    }
    if first == 0xF4 {
        let v = r.read_i64_le()?;
        return Ok((v.to_string().into_bytes(), 9));
    }
    if first & 0xF0 == 0xE0 {
        let next = r.read_u8()? as usize;
        let len = (((first & 0x0F) as usize) << 8) | next;
        let data = r.read_exact(len)?;
        return Ok((data, 2 + len));
    }
    if first & 0xE0 == 0xC0 {
        let next = r.read_u8()?;
        let raw = (((first & 0x1F) as i32) << 8) | next as i32;
        let v = if raw & 0x1000 != 0 { raw - 0x2000 } else { raw };
        return Ok((v.to_string().into_bytes(), 2));
    }
    Err(err(r, first, "unknown listpack element encoding"))
}

/// Byte width of the backlen trailer, derived from the *encoded* element
/// size (not its decoded length) per the listpack format.
fn backlen_width(encoded_len: usize) -> usize {
    if encoded_len < 128 {
        1
    } else if encoded_len < 16384 {
        2
    } else if encoded_len < 2_097_152 {
        3
    } else if encoded_len < 268_435_456 {
        4
    } else {
        5
    }
}

/// Decode an intset blob into its ordered sequence of decimal byte strings.
pub fn decode_intset(buf: &[u8]) -> Result<Vec<Vec<u8>>, DecodeError> {
    let mut r = reader(buf);
    let encoding = r.read_u32_le()?;
    let length = r.read_u32_le()?;
    let mut out = Vec::with_capacity(length as usize);
    for _ in 0..length {
        let v: i64 = match encoding {
            2 => r.read_i16_le()? as i64,
            4 => r.read_i32_le()? as i64,
            8 => r.read_i64_le()?,
            other => return Err(err(&r, other as u8, "unknown intset encoding width")),
        };
        out.push(v.to_string().into_bytes());
    }
    Ok(out)
}

/// Decode a zipmap blob into its ordered sequence of (field, value) byte
/// strings, flattened as `[field0, value0, field1, value1, ...]`.
pub fn decode_zipmap(buf: &[u8]) -> Result<Vec<Vec<u8>>, DecodeError> {
    let mut r = reader(buf);
    r.skip(1)?; // zmlen, unreliable above 254 entries; scan to terminator instead

    let mut out = Vec::new();
    loop {
        let marker = r.read_u8()?;
        if marker == 0xFF {
            break;
        }
        let field_len = zipmap_length(&mut r, marker)?;
        let field = r.read_exact(field_len)?;

        let value_marker = r.read_u8()?;
        let value_len = zipmap_length(&mut r, value_marker)?;
        let free = r.read_u8()? as usize;
        let value = r.read_exact(value_len)?;
        r.skip(free)?;

        out.push(field);
        out.push(value);
    }
    Ok(out)
}

fn zipmap_length(r: &mut Reader<'_>, marker: u8) -> Result<usize, DecodeError> {
    if marker == 0xFE {
        Ok(r.read_u32_le()? as usize)
    } else {
        Ok(marker as usize)
    }
}
