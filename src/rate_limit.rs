use std::io::{self, Read};
use std::time::{Duration, Instant};

/// Throttles a byte stream to a fixed rate using a token bucket: tokens
/// replenish continuously at `bytes_per_second` and burst is capped at one
/// second's worth. A rate of 0 disables throttling entirely.
pub struct TokenBucketReader<R> {
    inner: R,
    bytes_per_second: u64,
    tokens: f64,
    last_refill: Instant,
}

impl<R: Read> TokenBucketReader<R> {
    pub fn new(inner: R, bytes_per_second: u64) -> Self {
        TokenBucketReader {
            inner,
            bytes_per_second,
            tokens: bytes_per_second as f64,
            last_refill: Instant::now(),
        }
    }

    fn refill(&mut self) {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_refill).as_secs_f64();
        self.last_refill = now;
        let capacity = self.bytes_per_second as f64;
        self.tokens = (self.tokens + elapsed * capacity).min(capacity);
    }

    /// Blocks until at least one token is available, then spends up to
    /// `wanted` tokens, returning how many were actually granted.
    fn acquire(&mut self, wanted: usize) -> usize {
        self.refill();
        while self.tokens < 1.0 {
            let capacity = self.bytes_per_second as f64;
            let shortfall = 1.0 - self.tokens;
            let wait = Duration::from_secs_f64(shortfall / capacity);
            std::thread::sleep(wait);
            self.refill();
        }
        let granted = (wanted as f64).min(self.tokens) as usize;
        let granted = granted.max(1);
        self.tokens -= granted as f64;
        granted
    }
}

impl<R: Read> Read for TokenBucketReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.bytes_per_second == 0 || buf.is_empty() {
            return self.inner.read(buf);
        }
        let allowed = self.acquire(buf.len());
        self.inner.read(&mut buf[..allowed])
    }
}
