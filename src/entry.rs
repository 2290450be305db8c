/// The decoded shape of one RDB value, independent of its original wire
/// encoding (string/ziplist/listpack/intset/quicklist all fold into the
/// same `List`/`Set`/... shape).
#[derive(Debug, Clone, PartialEq)]
pub enum EntryValue {
    String(Vec<u8>),
    List(Vec<Vec<u8>>),
    Set(Vec<Vec<u8>>),
    SortedSet(Vec<(Vec<u8>, f64)>),
    Hash(Vec<(Vec<u8>, Vec<u8>)>),
    Stream,
    Module(String),
}

/// One decoded RDB entry: a key plus the database it belongs to, its
/// absolute expiration (if any), and its value.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedEntry {
    pub key: Vec<u8>,
    pub db: u64,
    /// -1 means no expiration; a positive value is an absolute Unix
    /// millisecond timestamp.
    pub expire_at_ms: i64,
    pub value: EntryValue,
}

impl DecodedEntry {
    pub fn has_expiration(&self) -> bool {
        self.expire_at_ms > 0
    }
}
