use std::io::Read;

use crate::byte_reader::ByteReader;
use crate::error::{DecodeError, ErrorKind};
use crate::length::{read_length, Length};
use crate::lzf;

const INT8: u8 = 0;
const INT16: u8 = 1;
const INT32: u8 = 2;
const LZF: u8 = 3;

/// Decode one RDB string: either a length-prefixed raw byte run, or one of
/// the special integer/LZF encodings, textualised where the format calls
/// for it.
pub fn read_string<R: Read>(r: &mut ByteReader<R>) -> Result<Vec<u8>, DecodeError> {
    let offset = r.offset();
    match read_length(r)? {
        Length::Value(len) => r.read_exact(len as usize),
        Length::Special(INT8) => Ok(r.read_i8()?.to_string().into_bytes()),
        Length::Special(INT16) => Ok(r.read_i16_le()?.to_string().into_bytes()),
        Length::Special(INT32) => Ok(r.read_i32_le()?.to_string().into_bytes()),
        Length::Special(LZF) => {
            let compressed_len = require_value(r, offset)?;
            let uncompressed_len = require_value(r, offset)?;
            let compressed = r.read_exact(compressed_len as usize)?;
            lzf::decompress(&compressed, uncompressed_len as usize)
        }
        Length::Special(tag) => Err(DecodeError::new(
            ErrorKind::CorruptedEncoding,
            offset,
            tag,
            "unknown special string-encoding tag",
        )),
    }
}

fn require_value<R: Read>(r: &mut ByteReader<R>, offset: u64) -> Result<u64, DecodeError> {
    match read_length(r)? {
        Length::Value(v) => Ok(v),
        Length::Special(tag) => Err(DecodeError::new(
            ErrorKind::CorruptedEncoding,
            offset,
            tag,
            "expected a plain length inside an LZF header",
        )),
    }
}
