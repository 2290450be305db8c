use crate::config::Config;
use crate::entry::{DecodedEntry, EntryValue};

/// An uppercase ASCII verb and its ordered binary arguments — the only
/// shape a `ReplayCommand` surfaces through the event sink.
#[derive(Debug, Clone, PartialEq)]
pub struct ReplayCommand {
    pub verb: String,
    pub args: Vec<Vec<u8>>,
}

impl ReplayCommand {
    fn new(verb: &str, args: Vec<Vec<u8>>) -> Self {
        ReplayCommand {
            verb: verb.to_string(),
            args,
        }
    }
}

/// One emitted command plus the bookkeeping the sink callback needs
/// (`source_key`, `db`, `seq`, `total`).
pub struct EmittedCommand {
    pub command: ReplayCommand,
    pub source_key: Vec<u8>,
    pub db: u64,
    pub seq: u32,
    pub total: u32,
}

/// Translate one decoded entry into its replay commands, chunking oversized
/// collections per `config`'s ceilings and appending a `PEXPIREAT` when the
/// entry has an expiration.
pub fn emit(entry: &DecodedEntry, config: &Config) -> Vec<EmittedCommand> {
    let key = &entry.key;
    let mut commands: Vec<ReplayCommand> = match &entry.value {
        EntryValue::String(value) => vec![ReplayCommand::new("SET", vec![key.clone(), value.clone()])],
        EntryValue::List(items) => chunked_commands(
            "RPUSH",
            key,
            items.iter().map(|item| vec![item.clone()]).collect(),
            config,
        ),
        EntryValue::Set(members) => chunked_commands(
            "SADD",
            key,
            members.iter().map(|m| vec![m.clone()]).collect(),
            config,
        ),
        EntryValue::SortedSet(entries) => chunked_commands(
            "ZADD",
            key,
            entries
                .iter()
                .map(|(member, score)| vec![format_score(*score).into_bytes(), member.clone()])
                .collect(),
            config,
        ),
        EntryValue::Hash(fields) => chunked_commands(
            "HSET",
            key,
            fields
                .iter()
                .map(|(field, value)| vec![field.clone(), value.clone()])
                .collect(),
            config,
        ),
        EntryValue::Stream | EntryValue::Module(_) => Vec::new(),
    };

    if entry.has_expiration() {
        commands.push(ReplayCommand::new(
            "PEXPIREAT",
            vec![key.clone(), entry.expire_at_ms.to_string().into_bytes()],
        ));
    }

    let total = commands.len() as u32;
    commands
        .into_iter()
        .enumerate()
        .map(|(i, command)| EmittedCommand {
            command,
            source_key: key.clone(),
            db: entry.db,
            seq: (i + 1) as u32,
            total,
        })
        .collect()
}

fn chunked_commands(
    verb: &str,
    key: &[u8],
    items: Vec<Vec<Vec<u8>>>,
    config: &Config,
) -> Vec<ReplayCommand> {
    chunk_items(items, config.max_elements_per_command, config.max_bytes_per_command)
        .into_iter()
        .map(|chunk| {
            let mut args = vec![key.to_vec()];
            args.extend(chunk);
            ReplayCommand::new(verb, args)
        })
        .collect()
}

/// Greedily groups items (each a small bundle of primitive elements, e.g.
/// a score+member pair) into chunks that respect both ceilings. An
/// individual item that alone exceeds a ceiling still gets its own chunk —
/// chunking never splits an item.
fn chunk_items(
    items: Vec<Vec<Vec<u8>>>,
    max_elements: usize,
    max_bytes: usize,
) -> Vec<Vec<Vec<u8>>> {
    let mut chunks = Vec::new();
    let mut current: Vec<Vec<u8>> = Vec::new();
    let mut current_elems = 0usize;
    let mut current_bytes = 0usize;

    for item in items {
        let item_elems = item.len();
        let item_bytes: usize = item.iter().map(|a| a.len()).sum();
        if !current.is_empty()
            && (current_elems + item_elems > max_elements || current_bytes + item_bytes > max_bytes)
        {
            chunks.push(std::mem::take(&mut current));
            current_elems = 0;
            current_bytes = 0;
        }
        current.extend(item);
        current_elems += item_elems;
        current_bytes += item_bytes;
    }
    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

/// Score formatting: `+inf`/`-inf`/`nan`, whole numbers as decimal
/// integers, otherwise default f64 decimal rendering.
pub fn format_score(score: f64) -> String {
    if score.is_nan() {
        "nan".to_string()
    } else if score == f64::INFINITY {
        "+inf".to_string()
    } else if score == f64::NEG_INFINITY {
        "-inf".to_string()
    } else if score.fract() == 0.0 && score.abs() < 1e17 {
        format!("{}", score as i64)
    } else {
        format!("{score}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(value: EntryValue, expire_at_ms: i64) -> DecodedEntry {
        DecodedEntry {
            key: b"k".to_vec(),
            db: 0,
            expire_at_ms,
            value,
        }
    }

    #[test]
    fn string_without_ttl_emits_one_set() {
        let e = entry(EntryValue::String(b"v".to_vec()), -1);
        let commands = emit(&e, &Config::default());
        assert_eq!(commands.len(), 1);
        assert_eq!(commands[0].command.verb, "SET");
        assert_eq!(commands[0].seq, 1);
        assert_eq!(commands[0].total, 1);
    }

    #[test]
    fn string_with_ttl_emits_set_then_pexpireat() {
        let e = entry(EntryValue::String(b"v".to_vec()), 50_000_000);
        let commands = emit(&e, &Config::default());
        assert_eq!(commands.len(), 2);
        assert_eq!(commands[0].command.verb, "SET");
        assert_eq!(commands[1].command.verb, "PEXPIREAT");
        assert_eq!(commands[1].command.args[1], b"50000000");
        assert_eq!((commands[0].seq, commands[0].total), (1, 2));
        assert_eq!((commands[1].seq, commands[1].total), (2, 2));
    }

    #[test]
    fn large_set_chunks_per_max_elements() {
        let members: Vec<Vec<u8>> = (0..2500).map(|i| i.to_string().into_bytes()).collect();
        let e = entry(EntryValue::Set(members.clone()), -1);
        let config = Config {
            max_elements_per_command: 1000,
            ..Config::default()
        };
        let commands = emit(&e, &config);
        assert_eq!(commands.len(), 3);
        assert_eq!(commands[0].command.args.len() - 1, 1000);
        assert_eq!(commands[1].command.args.len() - 1, 1000);
        assert_eq!(commands[2].command.args.len() - 1, 500);
        let reassembled: Vec<Vec<u8>> = commands
            .iter()
            .flat_map(|c| c.command.args[1..].to_vec())
            .collect();
        assert_eq!(reassembled, members);
        assert_eq!(
            commands.iter().map(|c| c.seq).collect::<Vec<_>>(),
            vec![1, 2, 3]
        );
    }

    #[test]
    fn zadd_orders_score_before_member() {
        let e = entry(
            EntryValue::SortedSet(vec![(b"a".to_vec(), 100.0), (b"b".to_vec(), f64::NEG_INFINITY)]),
            -1,
        );
        let commands = emit(&e, &Config::default());
        assert_eq!(commands.len(), 1);
        assert_eq!(
            commands[0].command.args,
            vec![b"k".to_vec(), b"100".to_vec(), b"a".to_vec(), b"-inf".to_vec(), b"b".to_vec()]
        );
    }

    #[test]
    fn empty_collection_emits_nothing() {
        let e = entry(EntryValue::List(vec![]), -1);
        assert!(emit(&e, &Config::default()).is_empty());
    }

    #[test]
    fn stream_and_module_emit_nothing() {
        assert!(emit(&entry(EntryValue::Stream, -1), &Config::default()).is_empty());
        assert!(emit(&entry(EntryValue::Module("foo".to_string()), -1), &Config::default()).is_empty());
    }

    #[test]
    fn format_score_handles_infinities_and_whole_numbers() {
        assert_eq!(format_score(f64::INFINITY), "+inf");
        assert_eq!(format_score(f64::NEG_INFINITY), "-inf");
        assert_eq!(format_score(f64::NAN), "nan");
        assert_eq!(format_score(100.0), "100");
        assert_eq!(format_score(3.5), "3.5");
    }
}
