use std::io::Read;

use crate::byte_reader::ByteReader;
use crate::entry::EntryValue;
use crate::error::{DecodeError, ErrorKind};
use crate::length::read_length_value;
use crate::packed;
use crate::strings::read_string;

pub const STRING: u8 = 0;
pub const LIST: u8 = 1;
pub const SET: u8 = 2;
pub const ZSET: u8 = 3;
pub const HASH: u8 = 4;
pub const ZSET_2: u8 = 5;
pub const MODULE: u8 = 6;
pub const MODULE_2: u8 = 7;
pub const HASH_ZIPMAP: u8 = 9;
pub const LIST_ZIPLIST: u8 = 10;
pub const SET_INTSET: u8 = 11;
pub const ZSET_ZIPLIST: u8 = 12;
pub const HASH_ZIPLIST: u8 = 13;
pub const LIST_QUICKLIST: u8 = 14;
pub const STREAM_LISTPACKS: u8 = 15;
pub const HASH_LISTPACK: u8 = 16;
pub const ZSET_LISTPACK: u8 = 17;
pub const LIST_QUICKLIST_2: u8 = 18;
pub const STREAM_LISTPACKS_2: u8 = 19;
pub const SET_LISTPACK: u8 = 20;
pub const STREAM_LISTPACKS_3: u8 = 21;

const MODULE_NAME_CHARSET: &[u8; 64] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789-_";

/// Decode one value given its type opcode. The key has already been read
/// by the caller (`StreamLoop`); this only decodes the value payload.
pub fn decode_value<R: Read>(
    r: &mut ByteReader<R>,
    type_opcode: u8,
) -> Result<EntryValue, DecodeError> {
    match type_opcode {
        STRING => Ok(EntryValue::String(read_string(r)?)),
        LIST => Ok(EntryValue::List(read_string_seq(r)?)),
        SET => Ok(EntryValue::Set(read_string_seq(r)?)),
        ZSET => Ok(EntryValue::SortedSet(read_zset_ascii(r)?)),
        HASH => Ok(EntryValue::Hash(read_pairs(r)?)),
        ZSET_2 => Ok(EntryValue::SortedSet(read_zset_binary(r)?)),
        MODULE => Err(DecodeError::new(
            ErrorKind::UnsupportedModule,
            r.offset(),
            type_opcode,
            "type-6 MODULE has no opcode framing; size cannot be inferred",
        )),
        MODULE_2 => Ok(EntryValue::Module(decode_module(r)?)),
        HASH_ZIPMAP => {
            let blob = read_string(r)?;
            let flat = packed::decode_zipmap(&blob)?;
            Ok(EntryValue::Hash(to_pairs(flat)))
        }
        LIST_ZIPLIST => {
            let blob = read_string(r)?;
            Ok(EntryValue::List(packed::decode_ziplist(&blob)?))
        }
        SET_INTSET => {
            let blob = read_string(r)?;
            Ok(EntryValue::Set(packed::decode_intset(&blob)?))
        }
        ZSET_ZIPLIST => {
            let blob = read_string(r)?;
            let flat = packed::decode_ziplist(&blob)?;
            Ok(EntryValue::SortedSet(to_scored_pairs(flat)?))
        }
        HASH_ZIPLIST => {
            let blob = read_string(r)?;
            let flat = packed::decode_ziplist(&blob)?;
            Ok(EntryValue::Hash(to_pairs(flat)))
        }
        LIST_QUICKLIST => {
            let nodes = read_length_value(r)?;
            let mut items = Vec::new();
            for _ in 0..nodes {
                let blob = read_string(r)?;
                items.extend(packed::decode_ziplist(&blob)?);
            }
            Ok(EntryValue::List(items))
        }
        STREAM_LISTPACKS => {
            skip_stream(r, 1)?;
            Ok(EntryValue::Stream)
        }
        HASH_LISTPACK => {
            let blob = read_string(r)?;
            let flat = packed::decode_listpack(&blob)?;
            Ok(EntryValue::Hash(to_pairs(flat)))
        }
        ZSET_LISTPACK => {
            let blob = read_string(r)?;
            let flat = packed::decode_listpack(&blob)?;
            Ok(EntryValue::SortedSet(to_scored_pairs(flat)?))
        }
        LIST_QUICKLIST_2 => {
            let nodes = read_length_value(r)?;
            let mut items = Vec::new();
            for _ in 0..nodes {
                let container = read_length_value(r)?;
                let blob = read_string(r)?;
                match container {
                    1 => items.push(blob),
                    2 => items.extend(packed::decode_listpack(&blob)?),
                    other => {
                        return Err(DecodeError::new(
                            ErrorKind::CorruptedEncoding,
                            r.offset(),
                            other as u8,
                            "unknown quicklist2 container tag",
                        ))
                    }
                }
            }
            Ok(EntryValue::List(items))
        }
        STREAM_LISTPACKS_2 => {
            skip_stream(r, 2)?;
            Ok(EntryValue::Stream)
        }
        SET_LISTPACK => {
            let blob = read_string(r)?;
            Ok(EntryValue::Set(packed::decode_listpack(&blob)?))
        }
        STREAM_LISTPACKS_3 => {
            // Parity with _2 per the design notes: no additional logic for _3.
            skip_stream(r, 2)?;
            Ok(EntryValue::Stream)
        }
        other => Err(DecodeError::new(
            ErrorKind::CorruptedEncoding,
            r.offset(),
            other,
            "unknown value-type opcode",
        )),
    }
}

fn read_string_seq<R: Read>(r: &mut ByteReader<R>) -> Result<Vec<Vec<u8>>, DecodeError> {
    let len = read_length_value(r)?;
    let mut out = Vec::with_capacity(len as usize);
    for _ in 0..len {
        out.push(read_string(r)?);
    }
    Ok(out)
}

fn read_pairs<R: Read>(r: &mut ByteReader<R>) -> Result<Vec<(Vec<u8>, Vec<u8>)>, DecodeError> {
    let len = read_length_value(r)?;
    let mut out = Vec::with_capacity(len as usize);
    for _ in 0..len {
        let field = read_string(r)?;
        let value = read_string(r)?;
        out.push((field, value));
    }
    Ok(out)
}

fn to_pairs(flat: Vec<Vec<u8>>) -> Vec<(Vec<u8>, Vec<u8>)> {
    flat.chunks_exact(2)
        .map(|c| (c[0].clone(), c[1].clone()))
        .collect()
}

fn to_scored_pairs(flat: Vec<Vec<u8>>) -> Result<Vec<(Vec<u8>, f64)>, DecodeError> {
    let mut out = Vec::with_capacity(flat.len() / 2);
    for c in flat.chunks_exact(2) {
        let member = c[0].clone();
        let score = parse_ascii_double(&c[1])?;
        out.push((member, score));
    }
    Ok(out)
}

fn read_zset_ascii<R: Read>(r: &mut ByteReader<R>) -> Result<Vec<(Vec<u8>, f64)>, DecodeError> {
    let len = read_length_value(r)?;
    let mut out = Vec::with_capacity(len as usize);
    for _ in 0..len {
        let member = read_string(r)?;
        let score_len = r.read_u8()?;
        let score = match score_len {
            255 => f64::NEG_INFINITY,
            254 => f64::INFINITY,
            253 => f64::NAN,
            n => {
                let bytes = r.read_exact(n as usize)?;
                parse_ascii_double(&bytes)?
            }
        };
        out.push((member, score));
    }
    Ok(out)
}

fn read_zset_binary<R: Read>(r: &mut ByteReader<R>) -> Result<Vec<(Vec<u8>, f64)>, DecodeError> {
    let len = read_length_value(r)?;
    let mut out = Vec::with_capacity(len as usize);
    for _ in 0..len {
        let member = read_string(r)?;
        let score = r.read_f64_le()?;
        out.push((member, score));
    }
    Ok(out)
}

fn parse_ascii_double(bytes: &[u8]) -> Result<f64, DecodeError> {
    let text = std::str::from_utf8(bytes).map_err(|e| {
        DecodeError::new(ErrorKind::CorruptedEncoding, 0, ZSET, format!("non-utf8 score: {e}"))
    })?;
    text.parse::<f64>().map_err(|e| {
        DecodeError::new(
            ErrorKind::CorruptedEncoding,
            0,
            ZSET,
            format!("invalid ASCII double {text:?}: {e}"),
        )
    })
}

/// Structural skip of a stream value: advances the cursor correctly without
/// surfacing any content. `version` is 1 for STREAM_LISTPACKS, 2 for
/// STREAM_LISTPACKS_2 and STREAM_LISTPACKS_3 (which the source treats
/// identically to _2 — see DESIGN.md's Open Question notes).
fn skip_stream<R: Read>(r: &mut ByteReader<R>, version: u8) -> Result<(), DecodeError> {
    let master_entries = read_length_value(r)?;
    for _ in 0..master_entries {
        read_string(r)?; // master ID
        read_string(r)?; // listpack
    }

    read_length_value(r)?; // length
    read_length_value(r)?; // last-id-ms
    read_length_value(r)?; // last-id-seq
    if version >= 2 {
        read_length_value(r)?; // first-id-ms
        read_length_value(r)?; // first-id-seq
        read_length_value(r)?; // max-deleted-ms
        read_length_value(r)?; // max-deleted-seq
        read_length_value(r)?; // entries-added
    }

    let groups = read_length_value(r)?;
    for _ in 0..groups {
        read_string(r)?; // name
        read_length_value(r)?; // last-delivered ms
        read_length_value(r)?; // last-delivered seq
        if version >= 2 {
            read_length_value(r)?; // entries-read
        }

        let pel = read_length_value(r)?;
        for _ in 0..pel {
            r.read_exact(16)?; // entry ID
            r.read_u64_le()?; // delivery time
            read_length_value(r)?; // delivery count
        }

        let consumers = read_length_value(r)?;
        for _ in 0..consumers {
            read_string(r)?; // name
            r.read_u64_le()?; // seen time
            let consumer_pel = read_length_value(r)?;
            for _ in 0..consumer_pel {
                r.read_exact(16)?; // entry ID
            }
        }
    }
    Ok(())
}

/// Decode the module name carried by a MODULE_2 opcode: drop the low 10
/// version bits, then read nine 6-bit characters from the remaining 54 bits
/// high-to-low, same order `moduleTypeEncodeId` writes them in.
fn decode_module<R: Read>(r: &mut ByteReader<R>) -> Result<String, DecodeError> {
    let id = read_length_value(r)?;
    let name = decode_module_name(id);
    skip_module_record_stream(r)?;
    Ok(name)
}

fn decode_module_name(id: u64) -> String {
    let mut id = id >> 10;
    let mut chars = [0u8; 9];
    for slot in chars.iter_mut().rev() {
        *slot = MODULE_NAME_CHARSET[(id & 63) as usize];
        id >>= 6;
    }
    String::from_utf8_lossy(&chars).trim_end_matches('\0').to_string()
}

/// Shared by MODULE_2 values and MODULE_AUX sidebands: a sequence of
/// opcode-tagged records terminated by opcode 0.
pub fn skip_module_record_stream<R: Read>(r: &mut ByteReader<R>) -> Result<(), DecodeError> {
    loop {
        let opcode = read_length_value(r)?;
        match opcode {
            0 => break,
            1 | 2 => {
                read_length_value(r)?;
            }
            3 | 4 => {
                r.read_f64_le()?;
            }
            5 => {
                read_string(r)?;
            }
            other => {
                return Err(DecodeError::new(
                    ErrorKind::CorruptedEncoding,
                    r.offset(),
                    other as u8,
                    "unknown module opcode-tagged record",
                ))
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn reader_for(bytes: Vec<u8>) -> ByteReader<Cursor<Vec<u8>>> {
        ByteReader::new(Cursor::new(bytes))
    }

    #[test]
    fn decodes_plain_string() {
        let mut r = reader_for(vec![0x05, b'h', b'e', b'l', b'l', b'o']);
        assert_eq!(
            decode_value(&mut r, STRING).unwrap(),
            EntryValue::String(b"hello".to_vec())
        );
    }

    #[test]
    fn decodes_list_of_strings() {
        let mut r = reader_for(vec![0x02, 0x01, b'a', 0x01, b'b']);
        assert_eq!(
            decode_value(&mut r, LIST).unwrap(),
            EntryValue::List(vec![b"a".to_vec(), b"b".to_vec()])
        );
    }

    #[test]
    fn decodes_zset_legacy_with_ascii_scores_and_sentinels() {
        let mut bytes = vec![0x02];
        bytes.extend([0x01, b'a', 0x03, b'1', b'0', b'0']);
        bytes.extend([0x01, b'b', 0xFF]); // 255 -> -inf
        let mut r = reader_for(bytes);
        let value = decode_value(&mut r, ZSET).unwrap();
        assert_eq!(
            value,
            EntryValue::SortedSet(vec![
                (b"a".to_vec(), 100.0),
                (b"b".to_vec(), f64::NEG_INFINITY)
            ])
        );
    }

    #[test]
    fn module_type_without_opcode_framing_is_unsupported_module() {
        let mut r = reader_for(vec![]);
        let err = decode_value(&mut r, MODULE).unwrap_err();
        assert_eq!(err.kind, ErrorKind::UnsupportedModule);
    }

    #[test]
    fn unknown_opcode_is_corrupted_encoding() {
        let mut r = reader_for(vec![]);
        let err = decode_value(&mut r, 200).unwrap_err();
        assert_eq!(err.kind, ErrorKind::CorruptedEncoding);
    }

    #[test]
    fn decodes_module_name_round_trip() {
        // Encode "mytype01" the way moduleTypeEncodeId does, then decode it.
        let name = b"mytype01Z"; // 9 chars, last is padding
        let mut id: u64 = 0;
        for &c in name {
            let idx = MODULE_NAME_CHARSET.iter().position(|&x| x == c).unwrap() as u64;
            id = (id << 6) | idx;
        }
        id = (id << 10) | 1; // encver = 1
        assert_eq!(decode_module_name(id), "mytype01Z");
    }
}
