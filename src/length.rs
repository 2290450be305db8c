use std::io::Read;

use crate::byte_reader::ByteReader;
use crate::error::{DecodeError, ErrorKind};

/// Result of decoding one RDB length prefix: either a regular length or a
/// special string-encoding tag (caller dispatches to `StringCodec`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Length {
    Value(u64),
    Special(u8),
}

/// Decode one length prefix per the top-2-bits scheme.
pub fn read_length<R: Read>(r: &mut ByteReader<R>) -> Result<Length, DecodeError> {
    let offset = r.offset();
    let first = r.read_u8()?;
    match first >> 6 {
        0b00 => Ok(Length::Value((first & 0x3F) as u64)),
        0b01 => {
            let low = (first & 0x3F) as u64;
            let next = r.read_u8()? as u64;
            Ok(Length::Value((low << 8) | next))
        }
        0b10 => match first {
            0x80 => {
                let v = r.read_u32_be()?;
                Ok(Length::Value(v as u64))
            }
            0x81 => {
                let v = r.read_u64_le()?;
                Ok(Length::Value(v))
            }
            other => {
                log::warn!("tolerant 10xxxxxx length fallback for byte 0x{other:02x}");
                let v = r.read_u32_be()?;
                Ok(Length::Value(v as u64))
            }
        },
        0b11 => Ok(Length::Special(first & 0x3F)),
        _ => unreachable!(),
    }
    .map_err(|e: DecodeError| DecodeError::new(e.kind, offset, first, e.detail))
}

/// Convenience wrapper for call sites that never expect a special tag
/// (RESIZEDB counts, collection lengths, stream metadata fields, ...).
pub fn read_length_value<R: Read>(r: &mut ByteReader<R>) -> Result<u64, DecodeError> {
    let offset = r.offset();
    match read_length(r)? {
        Length::Value(v) => Ok(v),
        Length::Special(tag) => Err(DecodeError::new(
            ErrorKind::CorruptedEncoding,
            offset,
            tag,
            "expected a plain length, found a special string-encoding tag",
        )),
    }
}
