use std::io::{Read, Write};

use crate::command_emitter::ReplayCommand;

const MAX_LINE_LEN: usize = 64 * 1024;

#[derive(Debug, thiserror::Error)]
pub enum RespError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("line exceeded the {MAX_LINE_LEN}-byte ceiling")]
    LineTooLong,
    #[error("protocol error: {0}")]
    Protocol(String),
}

/// One of the five RESP2 wire forms.
#[derive(Debug, Clone, PartialEq)]
pub enum RespValue {
    SimpleString(Vec<u8>),
    Error(Vec<u8>),
    Integer(i64),
    BulkString(Option<Vec<u8>>),
    Array(Option<Vec<RespValue>>),
}

impl RespValue {
    pub fn simple_string(s: &str) -> Self {
        RespValue::SimpleString(s.as_bytes().to_vec())
    }

    pub fn bulk_string(s: &str) -> Self {
        RespValue::BulkString(Some(s.as_bytes().to_vec()))
    }

    pub fn bulk_bytes(bytes: Vec<u8>) -> Self {
        RespValue::BulkString(Some(bytes))
    }

    pub fn array(items: Vec<RespValue>) -> Self {
        RespValue::Array(Some(items))
    }

    pub fn as_string(&self) -> Result<String, RespError> {
        let bytes: &[u8] = match self {
            RespValue::SimpleString(b) | RespValue::Error(b) => b,
            RespValue::BulkString(Some(b)) => b,
            other => {
                return Err(RespError::Protocol(format!(
                    "expected a string-shaped value, got {other:?}"
                )))
            }
        };
        String::from_utf8(bytes.to_vec())
            .map_err(|e| RespError::Protocol(format!("not valid utf-8: {e}")))
    }

    pub fn serialize(&self) -> Vec<u8> {
        let mut out = Vec::new();
        self.write_into(&mut out);
        out
    }

    fn write_into(&self, out: &mut Vec<u8>) {
        match self {
            RespValue::SimpleString(s) => {
                out.push(b'+');
                out.extend_from_slice(s);
                out.extend_from_slice(b"\r\n");
            }
            RespValue::Error(s) => {
                out.push(b'-');
                out.extend_from_slice(s);
                out.extend_from_slice(b"\r\n");
            }
            RespValue::Integer(n) => {
                out.push(b':');
                out.extend_from_slice(n.to_string().as_bytes());
                out.extend_from_slice(b"\r\n");
            }
            RespValue::BulkString(None) => out.extend_from_slice(b"$-1\r\n"),
            RespValue::BulkString(Some(bytes)) => {
                out.push(b'$');
                out.extend_from_slice(bytes.len().to_string().as_bytes());
                out.extend_from_slice(b"\r\n");
                out.extend_from_slice(bytes);
                out.extend_from_slice(b"\r\n");
            }
            RespValue::Array(None) => out.extend_from_slice(b"*-1\r\n"),
            RespValue::Array(Some(items)) => {
                out.push(b'*');
                out.extend_from_slice(items.len().to_string().as_bytes());
                out.extend_from_slice(b"\r\n");
                for item in items {
                    item.write_into(out);
                }
            }
        }
    }
}

impl ReplayCommand {
    /// Render this command as a RESP array of bulk strings, the wire shape
    /// a real server expects a client command in.
    pub fn to_resp(&self) -> RespValue {
        let mut items = vec![RespValue::bulk_string(&self.verb)];
        items.extend(self.args.iter().cloned().map(RespValue::bulk_bytes));
        RespValue::array(items)
    }
}

/// Parses the five RESP2 wire forms from a blocking byte source.
pub struct RespDecoder<R> {
    reader: R,
}

impl<R: Read> RespDecoder<R> {
    pub fn new(reader: R) -> Self {
        RespDecoder { reader }
    }

    pub fn read_value(&mut self) -> Result<RespValue, RespError> {
        let line = read_line(&mut self.reader)?;
        let (&sigil, rest) = line
            .split_first()
            .ok_or_else(|| RespError::Protocol("empty line".to_string()))?;
        match sigil {
            b'+' => Ok(RespValue::SimpleString(rest.to_vec())),
            b'-' => Ok(RespValue::Error(rest.to_vec())),
            b':' => Ok(RespValue::Integer(parse_i64(rest)?)),
            b'$' => {
                let len = parse_i64(rest)?;
                if len < 0 {
                    return Ok(RespValue::BulkString(None));
                }
                let mut body = vec![0u8; len as usize];
                self.reader.read_exact(&mut body)?;
                let mut crlf = [0u8; 2];
                self.reader.read_exact(&mut crlf)?;
                Ok(RespValue::BulkString(Some(body)))
            }
            b'*' => {
                let len = parse_i64(rest)?;
                if len < 0 {
                    return Ok(RespValue::Array(None));
                }
                let mut items = Vec::with_capacity(len as usize);
                for _ in 0..len {
                    items.push(self.read_value()?);
                }
                Ok(RespValue::Array(Some(items)))
            }
            other => Err(RespError::Protocol(format!(
                "unknown RESP sigil {:?}",
                other as char
            ))),
        }
    }
}

fn parse_i64(bytes: &[u8]) -> Result<i64, RespError> {
    std::str::from_utf8(bytes)
        .ok()
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| RespError::Protocol(format!("not a decimal integer: {bytes:?}")))
}

fn read_line<R: Read>(reader: &mut R) -> Result<Vec<u8>, RespError> {
    let mut buf = Vec::new();
    let mut byte = [0u8; 1];
    loop {
        let n = reader.read(&mut byte)?;
        if n == 0 {
            return Err(RespError::Io(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                "stream ended before a CRLF-terminated line",
            )));
        }
        if byte[0] == b'\n' {
            if buf.last() == Some(&b'\r') {
                buf.pop();
            }
            break;
        }
        buf.push(byte[0]);
        if buf.len() > MAX_LINE_LEN {
            return Err(RespError::LineTooLong);
        }
    }
    Ok(buf)
}

/// The prefix that introduces the RDB payload: either a known byte count
/// or a diskless-mode sentinel to scan for.
#[derive(Debug, Clone, PartialEq)]
pub enum PayloadPrefix {
    Bounded(u64),
    Sentinel([u8; 40]),
}

/// Reads the `$<N>\r\n` or `$EOF:<40-byte-hex>\r\n` line that introduces
/// the RDB payload. Recognised by inspecting the line content, not by
/// parsing it as an ordinary bulk-string length.
pub fn read_payload_prefix<R: Read>(reader: &mut R) -> Result<PayloadPrefix, RespError> {
    let line = read_line(reader)?;
    let (&sigil, rest) = line
        .split_first()
        .ok_or_else(|| RespError::Protocol("empty payload prefix line".to_string()))?;
    if sigil != b'$' {
        return Err(RespError::Protocol(format!(
            "expected a payload prefix starting with '$', got {:?}",
            sigil as char
        )));
    }
    if let Some(hex) = rest.strip_prefix(b"EOF:") {
        if hex.len() != 40 {
            return Err(RespError::Protocol(format!(
                "EOF sentinel must be 40 bytes, got {}",
                hex.len()
            )));
        }
        let mut sentinel = [0u8; 40];
        sentinel.copy_from_slice(hex);
        Ok(PayloadPrefix::Sentinel(sentinel))
    } else {
        Ok(PayloadPrefix::Bounded(parse_i64(rest)? as u64))
    }
}

/// Writes a RESP value to any `Write` sink (e.g. a `TcpStream` to a replay
/// target).
pub fn write_value<W: Write>(w: &mut W, value: &RespValue) -> std::io::Result<()> {
    w.write_all(&value.serialize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn parses_simple_string() {
        let mut d = RespDecoder::new(Cursor::new(b"+PONG\r\n".to_vec()));
        assert_eq!(d.read_value().unwrap(), RespValue::SimpleString(b"PONG".to_vec()));
    }

    #[test]
    fn parses_bulk_string_and_null() {
        let mut d = RespDecoder::new(Cursor::new(b"$5\r\nhello\r\n".to_vec()));
        assert_eq!(
            d.read_value().unwrap(),
            RespValue::BulkString(Some(b"hello".to_vec()))
        );
        let mut d = RespDecoder::new(Cursor::new(b"$-1\r\n".to_vec()));
        assert_eq!(d.read_value().unwrap(), RespValue::BulkString(None));
    }

    #[test]
    fn parses_nested_array() {
        let mut d = RespDecoder::new(Cursor::new(
            b"*2\r\n$4\r\nPING\r\n*1\r\n:1\r\n".to_vec(),
        ));
        let value = d.read_value().unwrap();
        assert_eq!(
            value,
            RespValue::Array(Some(vec![
                RespValue::BulkString(Some(b"PING".to_vec())),
                RespValue::Array(Some(vec![RespValue::Integer(1)])),
            ]))
        );
    }

    #[test]
    fn line_too_long_fails() {
        let mut huge = vec![b'+'];
        huge.extend(std::iter::repeat(b'a').take(MAX_LINE_LEN + 1));
        huge.extend_from_slice(b"\r\n");
        let mut d = RespDecoder::new(Cursor::new(huge));
        assert!(matches!(d.read_value(), Err(RespError::LineTooLong)));
    }

    #[test]
    fn recognizes_bounded_payload_prefix() {
        let mut r = Cursor::new(b"$123\r\n".to_vec());
        assert_eq!(read_payload_prefix(&mut r).unwrap(), PayloadPrefix::Bounded(123));
    }

    #[test]
    fn recognizes_eof_sentinel_payload_prefix() {
        let sentinel = "a".repeat(40);
        let line = format!("$EOF:{sentinel}\r\n");
        let mut r = Cursor::new(line.into_bytes());
        let mut expected = [0u8; 40];
        expected.copy_from_slice(b"aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa");
        assert_eq!(
            read_payload_prefix(&mut r).unwrap(),
            PayloadPrefix::Sentinel(expected)
        );
    }

    #[test]
    fn replay_command_serializes_as_bulk_string_array() {
        let cmd = ReplayCommand {
            verb: "SET".to_string(),
            args: vec![b"k".to_vec(), b"v".to_vec()],
        };
        assert_eq!(
            cmd.to_resp().serialize(),
            b"*3\r\n$3\r\nSET\r\n$1\r\nk\r\n$1\r\nv\r\n".to_vec()
        );
    }
}
