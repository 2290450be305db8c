use std::io::{self, Read};

/// Wraps a stream known to carry exactly `remaining` more bytes of payload,
/// the `$<N>\r\n`-prefixed RDB transfer shape.
pub struct BoundedPayload<R> {
    inner: R,
    remaining: u64,
}

impl<R: Read> BoundedPayload<R> {
    pub fn new(inner: R, len: u64) -> Self {
        BoundedPayload { inner, remaining: len }
    }
}

impl<R: Read> Read for BoundedPayload<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.remaining == 0 {
            return Ok(0);
        }
        let cap = (buf.len() as u64).min(self.remaining) as usize;
        let n = self.inner.read(&mut buf[..cap])?;
        self.remaining -= n as u64;
        Ok(n)
    }
}

/// Wraps a diskless-mode stream terminated by a 40-byte sentinel instead of
/// a known length. Bytes are released to the caller only once they're
/// confirmed not to be a prefix of the sentinel; reaching an exact sentinel
/// match ends the stream.
pub struct SentinelPayload<R> {
    inner: R,
    sentinel: [u8; 40],
    tail: Vec<u8>,
    done: bool,
}

impl<R: Read> SentinelPayload<R> {
    pub fn new(inner: R, sentinel: [u8; 40]) -> Self {
        SentinelPayload {
            inner,
            sentinel,
            tail: Vec::with_capacity(40),
            done: false,
        }
    }

    fn fill_tail(&mut self) -> io::Result<bool> {
        let mut byte = [0u8; 1];
        while self.tail.len() < self.sentinel.len() {
            match self.inner.read(&mut byte)? {
                0 => {
                    if self.tail.is_empty() {
                        return Ok(false);
                    }
                    return Err(io::Error::new(
                        io::ErrorKind::UnexpectedEof,
                        "stream ended before the sentinel was seen in full",
                    ));
                }
                _ => self.tail.push(byte[0]),
            }
        }
        Ok(true)
    }
}

impl<R: Read> Read for SentinelPayload<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.done || buf.is_empty() {
            return Ok(0);
        }
        if !self.fill_tail()? {
            self.done = true;
            return Ok(0);
        }
        if self.tail == self.sentinel {
            self.done = true;
            return Ok(0);
        }
        // Release the oldest byte of the tail; it can no longer be part of
        // a sentinel match that starts later in the stream.
        let released = self.tail.remove(0);
        buf[0] = released;
        Ok(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn bounded_payload_stops_at_declared_length() {
        let mut r = BoundedPayload::new(Cursor::new(vec![1, 2, 3, 4, 5]), 3);
        let mut out = Vec::new();
        r.read_to_end(&mut out).unwrap();
        assert_eq!(out, vec![1, 2, 3]);
    }

    #[test]
    fn sentinel_payload_yields_bytes_before_sentinel_and_then_stops() {
        let sentinel = [b'a'; 40];
        let mut data = b"hello world".to_vec();
        data.extend_from_slice(&sentinel);
        let mut r = SentinelPayload::new(Cursor::new(data), sentinel);
        let mut out = Vec::new();
        r.read_to_end(&mut out).unwrap();
        assert_eq!(out, b"hello world".to_vec());
    }

    #[test]
    fn sentinel_payload_handles_empty_body() {
        let sentinel = [b'z'; 40];
        let r = SentinelPayload::new(Cursor::new(sentinel.to_vec()), sentinel);
        let mut out = Vec::new();
        let mut r = r;
        r.read_to_end(&mut out).unwrap();
        assert!(out.is_empty());
    }
}
