/// Integration tests driving `StreamLoop` end-to-end over hand-built RDB
/// fixtures, exercising the format described at
/// https://rdb.fnordig.de/file_format.html the way a real snapshot would
/// present it on the wire.
use std::io::Cursor;

use valkey_snap::command_emitter::ReplayCommand;
use valkey_snap::config::Config;
use valkey_snap::entry::{DecodedEntry, EntryValue};
use valkey_snap::error::DecodeError;
use valkey_snap::sink::EventSink;
use valkey_snap::stream_loop::StreamLoop;

/// Records every callback invocation; the integration-test equivalent of
/// the library's own unit-test `RecordingSink`, which isn't visible outside
/// the crate.
#[derive(Default)]
struct CollectingSink {
    started: Vec<u32>,
    db_selects: Vec<u64>,
    entries: Vec<DecodedEntry>,
    commands: Vec<(ReplayCommand, Vec<u8>, u64, u32, u32)>,
    ended: Option<([u8; 8], u64)>,
    errors: usize,
}

impl EventSink for CollectingSink {
    fn on_start(&mut self, rdb_version: u32) {
        self.started.push(rdb_version);
    }
    fn on_db_select(&mut self, db: u64) {
        self.db_selects.push(db);
    }
    fn on_entry(&mut self, entry: &DecodedEntry) {
        self.entries.push(entry.clone());
    }
    fn on_command(&mut self, command: &ReplayCommand, source_key: &[u8], db: u64, seq: u32, total: u32) {
        self.commands.push((command.clone(), source_key.to_vec(), db, seq, total));
    }
    fn on_end(&mut self, checksum: [u8; 8], total_keys: u64) {
        self.ended = Some((checksum, total_keys));
    }
    fn on_error(&mut self, _err: &DecodeError) {
        self.errors += 1;
    }
}

fn run(bytes: Vec<u8>, config: &Config) -> (Result<u64, DecodeError>, CollectingSink) {
    let mut sink = CollectingSink::default();
    let result = StreamLoop::new(Cursor::new(bytes), &mut sink, config).run();
    (result, sink)
}

fn encode_length(n: u64) -> Vec<u8> {
    if n < 64 {
        vec![n as u8]
    } else if n < 16384 {
        let n = n as u16;
        vec![0x40 | ((n >> 8) as u8), (n & 0xFF) as u8]
    } else {
        let mut v = vec![0x80];
        v.extend((n as u32).to_be_bytes());
        v
    }
}

fn write_string(buf: &mut Vec<u8>, bytes: &[u8]) {
    buf.extend(encode_length(bytes.len() as u64));
    buf.extend_from_slice(bytes);
}

fn build_rdb(version: &str, body: &[u8]) -> Vec<u8> {
    let mut rdb = Vec::new();
    rdb.extend_from_slice(b"REDIS");
    rdb.extend_from_slice(version.as_bytes());
    rdb.extend_from_slice(body);
    rdb.push(0xFF);
    rdb.extend([0u8; 8]); // checksum: observed, never verified by this crate
    rdb
}

#[test]
fn fixture_empty_db() {
    let mut body = Vec::new();
    body.push(0xFA);
    write_string(&mut body, b"redis-ver");
    write_string(&mut body, b"7.0.0");
    body.push(0xFE);
    body.extend(encode_length(0));
    body.push(0xFB);
    body.extend(encode_length(0));
    body.extend(encode_length(0));

    let (result, sink) = run(build_rdb("0009", &body), &Config::default());
    assert_eq!(result.unwrap(), 0);
    assert_eq!(sink.started, vec![9]);
    assert!(sink.entries.is_empty());
}

#[test]
fn fixture_string_keys() {
    let mut body = Vec::new();
    body.push(0xFE);
    body.extend(encode_length(0));
    body.push(0xFB);
    body.extend(encode_length(3));
    body.extend(encode_length(0));
    for (k, v) in [("name", "Redis"), ("version", "7.0.0"), ("lang", "C")] {
        body.push(0x00);
        write_string(&mut body, k.as_bytes());
        write_string(&mut body, v.as_bytes());
    }

    let (result, sink) = run(build_rdb("0009", &body), &Config::default());
    assert_eq!(result.unwrap(), 3);
    let values: Vec<(Vec<u8>, EntryValue)> =
        sink.entries.iter().map(|e| (e.key.clone(), e.value.clone())).collect();
    assert!(values.contains(&(b"name".to_vec(), EntryValue::String(b"Redis".to_vec()))));
    assert!(values.contains(&(b"version".to_vec(), EntryValue::String(b"7.0.0".to_vec()))));
    assert!(values.contains(&(b"lang".to_vec(), EntryValue::String(b"C".to_vec()))));
}

#[test]
fn fixture_with_expiry_surfaces_absolute_timestamps() {
    let mut body = Vec::new();
    body.push(0xFE);
    body.extend(encode_length(0));

    let future_ms: u64 = 4_102_444_800_000;
    body.push(0xFC);
    body.extend_from_slice(&future_ms.to_le_bytes());
    body.push(0x00);
    write_string(&mut body, b"session:abc");
    write_string(&mut body, b"user123");

    let future_sec: u32 = 4_102_444_800;
    body.push(0xFD);
    body.extend_from_slice(&future_sec.to_le_bytes());
    body.push(0x00);
    write_string(&mut body, b"session:def");
    write_string(&mut body, b"user456");

    body.push(0x00);
    write_string(&mut body, b"permanent");
    write_string(&mut body, b"stays");

    let (result, sink) = run(build_rdb("0009", &body), &Config::default());
    assert_eq!(result.unwrap(), 3);
    assert_eq!(sink.entries[0].expire_at_ms, future_ms as i64);
    assert_eq!(sink.entries[1].expire_at_ms, future_sec as i64 * 1000);
    assert_eq!(sink.entries[2].expire_at_ms, -1);
}

#[test]
fn fixture_integer_encoded_strings() {
    let mut body = Vec::new();
    body.push(0xFE);
    body.extend(encode_length(0));

    body.push(0x00);
    write_string(&mut body, b"small_num");
    body.push(0xC0);
    body.push(42);

    body.push(0x00);
    write_string(&mut body, b"neg_num");
    body.push(0xC0);
    body.push((-5i8) as u8);

    body.push(0x00);
    write_string(&mut body, b"medium_num");
    body.push(0xC1);
    body.extend_from_slice(&10_000i16.to_le_bytes());

    body.push(0x00);
    write_string(&mut body, b"large_num");
    body.push(0xC2);
    body.extend_from_slice(&1_000_000i32.to_le_bytes());

    let (result, sink) = run(build_rdb("0009", &body), &Config::default());
    assert_eq!(result.unwrap(), 4);
    assert_eq!(sink.entries[0].value, EntryValue::String(b"42".to_vec()));
    assert_eq!(sink.entries[1].value, EntryValue::String(b"-5".to_vec()));
    assert_eq!(sink.entries[2].value, EntryValue::String(b"10000".to_vec()));
    assert_eq!(sink.entries[3].value, EntryValue::String(b"1000000".to_vec()));
}

#[test]
fn fixture_multiple_databases_reports_each_select() {
    let mut body = Vec::new();
    body.push(0xFE);
    body.extend(encode_length(0));
    body.push(0x00);
    write_string(&mut body, b"db0:key1");
    write_string(&mut body, b"val1");

    body.push(0xFE);
    body.extend(encode_length(1));
    body.push(0x00);
    write_string(&mut body, b"db1:key1");
    write_string(&mut body, b"db1val");

    let (result, sink) = run(build_rdb("0009", &body), &Config::default());
    assert_eq!(result.unwrap(), 2);
    assert_eq!(sink.db_selects, vec![0, 1]);
    assert_eq!(sink.entries[0].db, 0);
    assert_eq!(sink.entries[1].db, 1);
}

#[test]
fn fixture_mixed_types_decodes_every_shape() {
    let mut body = Vec::new();
    body.push(0xFE);
    body.extend(encode_length(0));

    body.push(0x00);
    write_string(&mut body, b"string_key");
    write_string(&mut body, b"string_val");

    body.push(0x04); // hash
    write_string(&mut body, b"hash_key");
    body.extend(encode_length(1));
    write_string(&mut body, b"field");
    write_string(&mut body, b"value");

    body.push(0x02); // set
    write_string(&mut body, b"set_key");
    body.extend(encode_length(2));
    write_string(&mut body, b"member1");
    write_string(&mut body, b"member2");

    let (result, sink) = run(build_rdb("0009", &body), &Config::default());
    assert_eq!(result.unwrap(), 3);
    assert_eq!(sink.entries[0].value, EntryValue::String(b"string_val".to_vec()));
    assert_eq!(
        sink.entries[1].value,
        EntryValue::Hash(vec![(b"field".to_vec(), b"value".to_vec())])
    );
    assert_eq!(
        sink.entries[2].value,
        EntryValue::Set(vec![b"member1".to_vec(), b"member2".to_vec()])
    );
}

#[test]
fn fixture_with_past_expiry_still_surfaces_the_entry() {
    // Decoding is a pure reporting step; deciding what "expired" means is a
    // replay-time concern, not the stream scanner's.
    let mut body = Vec::new();
    body.push(0xFE);
    body.extend(encode_length(0));

    let past_ms: u64 = 946_684_800_000;
    body.push(0xFC);
    body.extend_from_slice(&past_ms.to_le_bytes());
    body.push(0x00);
    write_string(&mut body, b"expired1");
    write_string(&mut body, b"old_data");

    let (result, sink) = run(build_rdb("0009", &body), &Config::default());
    assert_eq!(result.unwrap(), 1);
    assert_eq!(sink.entries[0].key, b"expired1");
    assert_eq!(sink.entries[0].expire_at_ms, past_ms as i64);
}

#[test]
fn fixture_emits_commands_when_configured() {
    let mut body = Vec::new();
    body.push(0xFE);
    body.extend(encode_length(0));
    body.push(0x00);
    write_string(&mut body, b"greeting");
    write_string(&mut body, b"hello");

    let config = Config {
        emit_entries: false,
        emit_commands: true,
        ..Config::default()
    };
    let (result, sink) = run(build_rdb("0009", &body), &config);
    assert_eq!(result.unwrap(), 1);
    assert!(sink.entries.is_empty());
    assert_eq!(sink.commands.len(), 1);
    let (command, source_key, db, seq, total) = &sink.commands[0];
    assert_eq!(command.verb, "SET");
    assert_eq!(command.args, vec![b"greeting".to_vec(), b"hello".to_vec()]);
    assert_eq!(source_key, b"greeting");
    assert_eq!(*db, 0);
    assert_eq!((*seq, *total), (1, 1));
}

#[test]
fn aux_and_resizedb_opcodes_are_observed_without_affecting_key_count() {
    let mut body = Vec::new();
    body.push(0xFA);
    write_string(&mut body, b"redis-ver");
    write_string(&mut body, b"7.2.4");
    body.push(0xFA);
    write_string(&mut body, b"redis-bits");
    write_string(&mut body, b"64");

    body.push(0xFE);
    body.extend(encode_length(0));
    body.push(0xFB);
    body.extend(encode_length(1));
    body.extend(encode_length(0));

    body.push(0x00);
    write_string(&mut body, b"greeting");
    write_string(&mut body, b"hello");

    let (result, sink) = run(build_rdb("0011", &body), &Config::default());
    assert_eq!(result.unwrap(), 1);
    assert_eq!(sink.entries.len(), 1);
}
