use std::fmt;

/// The failure kinds the core can raise while decoding an RDB stream.
///
/// spec.md's §7 error table lists a separate `UnsupportedType` kind for
/// "type-6 MODULE without opcode framing", but §4.6 assigns that exact
/// condition to `UnsupportedModule` instead. This crate follows §4.6 (see
/// DESIGN.md's Open Question decisions); `UnsupportedType` named nothing
/// this crate ever raises, so it is not declared here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ErrorKind {
    #[error("unexpected end of input")]
    UnexpectedEnd,
    #[error("corrupted header")]
    CorruptedHeader,
    #[error("corrupted encoding")]
    CorruptedEncoding,
    #[error("corrupted compression")]
    CorruptedCompression,
    #[error("unsupported module")]
    UnsupportedModule,
}

/// A parsing failure, carrying the byte offset and the opcode/encoding byte
/// that triggered it, per the diagnostics requirement.
#[derive(Debug, thiserror::Error)]
pub struct DecodeError {
    pub kind: ErrorKind,
    pub offset: u64,
    pub opcode: u8,
    pub detail: String,
}

impl DecodeError {
    pub fn new(kind: ErrorKind, offset: u64, opcode: u8, detail: impl Into<String>) -> Self {
        DecodeError {
            kind,
            offset,
            opcode,
            detail: detail.into(),
        }
    }
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} at offset {} (byte 0x{:02x}): {}",
            self.kind, self.offset, self.opcode, self.detail
        )
    }
}
