use std::io::Read;

use crate::byte_reader::ByteReader;
use crate::command_emitter;
use crate::config::Config;
use crate::entry::DecodedEntry;
use crate::error::{DecodeError, ErrorKind};
use crate::length::read_length_value;
use crate::sink::EventSink;
use crate::strings::read_string;
use crate::types::{self, skip_module_record_stream};

const OP_EOF: u8 = 0xFF;
const OP_SELECTDB: u8 = 0xFE;
const OP_EXPIRETIME_MS: u8 = 0xFC;
const OP_EXPIRETIME: u8 = 0xFD;
const OP_RESIZEDB: u8 = 0xFB;
const OP_AUX: u8 = 0xFA;
const OP_FREQ: u8 = 0xF9;
const OP_IDLE: u8 = 0xF8;
const OP_MODULE_AUX: u8 = 0xF7;

/// Top-level scan of an RDB stream: magic header, the opcode-dispatch main
/// loop, sideband opcodes (expiry/aux/resize/selectdb), and the closing
/// EOF + checksum.
pub struct StreamLoop<'a, R, S: EventSink> {
    reader: ByteReader<R>,
    sink: &'a mut S,
    config: &'a Config,
}

impl<'a, R: Read, S: EventSink> StreamLoop<'a, R, S> {
    pub fn new(source: R, sink: &'a mut S, config: &'a Config) -> Self {
        StreamLoop {
            reader: ByteReader::new(source),
            sink,
            config,
        }
    }

    /// Runs the scan to completion, returning the total key count. On
    /// failure, `on_error` is invoked before the error is propagated.
    pub fn run(mut self) -> Result<u64, DecodeError> {
        match self.run_inner() {
            Ok(total) => Ok(total),
            Err(e) => {
                log::error!("{e}");
                self.sink.on_error(&e);
                Err(e)
            }
        }
    }

    fn run_inner(&mut self) -> Result<u64, DecodeError> {
        let magic = self.reader.read_exact(5)?;
        if magic != b"REDIS" {
            return Err(DecodeError::new(
                ErrorKind::CorruptedHeader,
                self.reader.offset(),
                0,
                "magic bytes are not \"REDIS\"",
            ));
        }
        let version_bytes = self.reader.read_exact(4)?;
        let version_str = std::str::from_utf8(&version_bytes).map_err(|e| {
            DecodeError::new(
                ErrorKind::CorruptedHeader,
                self.reader.offset(),
                0,
                format!("version field is not ASCII: {e}"),
            )
        })?;
        let version: u32 = version_str.parse().map_err(|e| {
            DecodeError::new(
                ErrorKind::CorruptedHeader,
                self.reader.offset(),
                0,
                format!("version field {version_str:?} is not decimal: {e}"),
            )
        })?;
        if !(1..=11).contains(&version) {
            log::warn!("RDB version {version} is outside the supported 1-11 range");
        }
        log::info!("parsed RDB header, version {version}");
        self.sink.on_start(version);

        let mut current_db: u64 = 0;
        let mut current_expire: i64 = -1;
        let mut total_keys: u64 = 0;

        loop {
            let opcode = self.reader.read_u8()?;
            match opcode {
                OP_EOF => {
                    let checksum_bytes = self.reader.read_exact(8)?;
                    let mut checksum = [0u8; 8];
                    checksum.copy_from_slice(&checksum_bytes);
                    log::info!("end of stream, {total_keys} keys decoded");
                    self.sink.on_end(checksum, total_keys);
                    return Ok(total_keys);
                }
                OP_SELECTDB => {
                    current_db = read_length_value(&mut self.reader)?;
                    log::debug!("select db {current_db}");
                    self.sink.on_db_select(current_db);
                }
                OP_EXPIRETIME => {
                    let secs = self.reader.read_u32_le()?;
                    current_expire = secs as i64 * 1000;
                }
                OP_EXPIRETIME_MS => {
                    current_expire = self.reader.read_i64_le()?;
                }
                OP_RESIZEDB => {
                    read_length_value(&mut self.reader)?; // hash table size
                    read_length_value(&mut self.reader)?; // expire table size
                }
                OP_AUX => {
                    let key = read_string(&mut self.reader)?;
                    let value = read_string(&mut self.reader)?;
                    log::trace!(
                        "aux field {}={}",
                        String::from_utf8_lossy(&key),
                        String::from_utf8_lossy(&value)
                    );
                }
                OP_FREQ => {
                    self.reader.read_u8()?;
                }
                OP_IDLE => {
                    read_length_value(&mut self.reader)?;
                }
                OP_MODULE_AUX => {
                    read_length_value(&mut self.reader)?; // module-id
                    read_length_value(&mut self.reader)?; // when
                    skip_module_record_stream(&mut self.reader)?;
                }
                type_opcode => {
                    let key = read_string(&mut self.reader)?;
                    log::trace!("decoding key {} (type {type_opcode})", String::from_utf8_lossy(&key));
                    let value = types::decode_value(&mut self.reader, type_opcode)?;
                    let entry = DecodedEntry {
                        key,
                        db: current_db,
                        expire_at_ms: current_expire,
                        value,
                    };
                    total_keys += 1;

                    if self.config.emit_entries {
                        self.sink.on_entry(&entry);
                    }
                    if self.config.emit_commands {
                        for emitted in command_emitter::emit(&entry, self.config) {
                            self.sink.on_command(
                                &emitted.command,
                                &emitted.source_key,
                                emitted.db,
                                emitted.seq,
                                emitted.total,
                            );
                        }
                    }
                    current_expire = -1;
                }
            }
        }
    }
}
