use std::io::Write;
use std::net::TcpStream;

use crate::command_emitter::ReplayCommand;
use crate::entry::{DecodedEntry, EntryValue};
use crate::error::DecodeError;
use crate::resp::{write_value, RespValue};
use crate::sink::EventSink;

/// Human-readable audit trail over any `Write` sink: stdout, or a file when
/// `--output` is set.
pub struct StdoutSink<W: Write> {
    out: W,
}

impl<W: Write> StdoutSink<W> {
    pub fn new(out: W) -> Self {
        StdoutSink { out }
    }
}

impl<W: Write> EventSink for StdoutSink<W> {
    fn on_start(&mut self, rdb_version: u32) {
        let _ = writeln!(self.out, "RDB version {rdb_version}");
    }

    fn on_db_select(&mut self, db: u64) {
        let _ = writeln!(self.out, "SELECT {db}");
    }

    fn on_entry(&mut self, entry: &DecodedEntry) {
        let _ = writeln!(self.out, "{}", format_entry(entry));
    }

    fn on_command(
        &mut self,
        command: &ReplayCommand,
        source_key: &[u8],
        db: u64,
        seq: u32,
        total: u32,
    ) {
        let _ = writeln!(
            self.out,
            "[db {db}] key {:?} ({seq}/{total}): {}",
            String::from_utf8_lossy(source_key),
            format_command(command),
        );
    }

    fn on_end(&mut self, checksum: [u8; 8], total_keys: u64) {
        let _ = writeln!(self.out, "EOF, {total_keys} keys, checksum {}", hex(&checksum));
    }

    fn on_error(&mut self, err: &DecodeError) {
        let _ = writeln!(self.out, "ERROR: {err}");
    }
}

fn format_entry(entry: &DecodedEntry) -> String {
    let key = String::from_utf8_lossy(&entry.key);
    let ttl = if entry.has_expiration() {
        format!(" ttl={}", entry.expire_at_ms)
    } else {
        String::new()
    };
    let shape = match &entry.value {
        EntryValue::String(v) => format!("string({} bytes)", v.len()),
        EntryValue::List(items) => format!("list({} items)", items.len()),
        EntryValue::Set(members) => format!("set({} members)", members.len()),
        EntryValue::SortedSet(entries) => format!("zset({} entries)", entries.len()),
        EntryValue::Hash(fields) => format!("hash({} fields)", fields.len()),
        EntryValue::Stream => "stream".to_string(),
        EntryValue::Module(name) => format!("module({name})"),
    };
    format!("db={} key={key:?} {shape}{ttl}", entry.db)
}

fn format_command(command: &ReplayCommand) -> String {
    let mut parts = vec![command.verb.clone()];
    parts.extend(command.args.iter().map(|a| format!("{:?}", String::from_utf8_lossy(a))));
    parts.join(" ")
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

/// Streams replay commands as RESP arrays to a live target, SELECTing the
/// right database before the first command for each db.
pub struct ReplaySink {
    stream: TcpStream,
    current_db: Option<u64>,
}

impl ReplaySink {
    pub fn new(stream: TcpStream) -> Self {
        ReplaySink { stream, current_db: None }
    }

    fn select_db(&mut self, db: u64) {
        if self.current_db == Some(db) {
            return;
        }
        let select = RespValue::array(vec![
            RespValue::bulk_string("SELECT"),
            RespValue::bulk_string(&db.to_string()),
        ]);
        if let Err(e) = write_value(&mut self.stream, &select) {
            log::error!("failed to write SELECT {db}: {e}");
            return;
        }
        self.current_db = Some(db);
    }
}

impl EventSink for ReplaySink {
    fn on_start(&mut self, rdb_version: u32) {
        log::info!("replaying RDB version {rdb_version} to target");
    }

    fn on_db_select(&mut self, _db: u64) {}

    fn on_command(
        &mut self,
        command: &ReplayCommand,
        _source_key: &[u8],
        db: u64,
        seq: u32,
        total: u32,
    ) {
        self.select_db(db);
        log::trace!("replaying {} ({seq}/{total})", command.verb);
        if let Err(e) = write_value(&mut self.stream, &command.to_resp()) {
            log::error!("failed to write replay command {}: {e}", command.verb);
        }
    }

    fn on_end(&mut self, checksum: [u8; 8], total_keys: u64) {
        log::info!("replay complete, {total_keys} keys, checksum {}", hex(&checksum));
    }

    fn on_error(&mut self, err: &DecodeError) {
        log::error!("replay aborted: {err}");
    }
}
