use crate::command_emitter::ReplayCommand;
use crate::entry::DecodedEntry;
use crate::error::DecodeError;

/// Outbound observer invoked synchronously on the parsing thread. `on_entry`
/// and `on_command` are only called when the corresponding config option is
/// enabled, so they default to no-ops for sinks that only care about one
/// mode.
pub trait EventSink {
    fn on_start(&mut self, rdb_version: u32);
    fn on_db_select(&mut self, db: u64);

    fn on_entry(&mut self, _entry: &DecodedEntry) {}

    fn on_command(
        &mut self,
        _command: &ReplayCommand,
        _source_key: &[u8],
        _db: u64,
        _seq: u32,
        _total: u32,
    ) {
    }

    fn on_end(&mut self, checksum: [u8; 8], total_keys: u64);
    fn on_error(&mut self, err: &DecodeError);
}

#[cfg(test)]
pub(crate) mod tests_support {
    use super::*;

    /// Records every callback invocation for assertions in other modules'
    /// tests.
    #[derive(Default)]
    pub struct RecordingSink {
        pub started: Vec<u32>,
        pub db_selects: Vec<u64>,
        pub entries: Vec<DecodedEntry>,
        pub commands: Vec<(ReplayCommand, Vec<u8>, u64, u32, u32)>,
        pub ended: Option<([u8; 8], u64)>,
        pub errors: usize,
    }

    impl EventSink for RecordingSink {
        fn on_start(&mut self, rdb_version: u32) {
            self.started.push(rdb_version);
        }

        fn on_db_select(&mut self, db: u64) {
            self.db_selects.push(db);
        }

        fn on_entry(&mut self, entry: &DecodedEntry) {
            self.entries.push(entry.clone());
        }

        fn on_command(
            &mut self,
            command: &ReplayCommand,
            source_key: &[u8],
            db: u64,
            seq: u32,
            total: u32,
        ) {
            self.commands
                .push((command.clone(), source_key.to_vec(), db, seq, total));
        }

        fn on_end(&mut self, checksum: [u8; 8], total_keys: u64) {
            self.ended = Some((checksum, total_keys));
        }

        fn on_error(&mut self, _err: &DecodeError) {
            self.errors += 1;
        }
    }
}
