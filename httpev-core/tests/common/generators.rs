//! Seeded generators for HTTP messages and feed variations
//!
//! Uses a seeded RNG for reproducibility. Print the seed on failure for replay.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use httpev_core::MIN_BATCH_CAPACITY;

/// Seeded generator for reproducible stochastic tests
pub struct Gen {
    pub rng: StdRng,
    pub seed: u64,
}

const TOKEN_CHARS: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789-_";
const PATH_CHARS: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789-._~/%=&";
const METHODS: &[&str] = &["GET", "POST", "PUT", "DELETE", "PATCH", "OPTIONS", "PURGE", "REPORT"];
const STATUSES: &[u16] = &[200, 201, 202, 204, 301, 304, 400, 404, 500];

impl Gen {
    /// Create with specific seed (for reproduction)
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            seed,
        }
    }

    /// Create from environment or random seed
    pub fn from_env_or_random() -> Self {
        let seed = std::env::var("HTTPEV_TEST_SEED")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or_else(rand::random);
        Self::new(seed)
    }

    /// Geometric distribution: count until rand > alpha
    pub fn geometric(&mut self, alpha: f64) -> usize {
        let mut n = 0;
        while self.rng.gen::<f64>() < alpha {
            n += 1;
        }
        n
    }

    /// Poisson-like count (simplified)
    pub fn poisson(&mut self, lambda: f64) -> usize {
        let l = (-lambda).exp();
        let mut k = 0;
        let mut p = 1.0;
        loop {
            k += 1;
            p *= self.rng.gen::<f64>();
            if p <= l {
                break;
            }
        }
        k - 1
    }

    /// Random boolean with probability p
    pub fn chance(&mut self, p: f64) -> bool {
        self.rng.gen::<f64>() < p
    }

    /// Sorted chunk boundaries for an input of `len` bytes
    pub fn splits(&mut self, len: usize) -> Vec<usize> {
        if len == 0 {
            return Vec::new();
        }
        let count = self.geometric(0.85);
        let mut splits: Vec<usize> = (0..count).map(|_| self.rng.gen_range(0..=len)).collect();
        splits.sort_unstable();
        splits
    }

    /// Batch capacity biased toward the minimum
    pub fn batch_capacity(&mut self) -> usize {
        MIN_BATCH_CAPACITY + self.geometric(0.8)
    }

    fn pick(&mut self, chars: &[u8], len: usize) -> String {
        (0..len)
            .map(|_| chars[self.rng.gen_range(0..chars.len())] as char)
            .collect()
    }

    /// Header name that the parser does not interpret
    pub fn header_name(&mut self) -> String {
        let len = 1 + self.geometric(0.7);
        format!("X-{}", self.pick(TOKEN_CHARS, len))
    }

    /// Header value without leading or trailing whitespace
    pub fn header_value(&mut self) -> String {
        let len = self.geometric(0.85);
        let mut value = self.pick(TOKEN_CHARS, len);
        if !value.is_empty() && self.chance(0.3) {
            value.push_str(" and ");
            let more = 1 + self.geometric(0.5);
            value.push_str(&self.pick(TOKEN_CHARS, more));
        }
        value
    }

    pub fn path(&mut self) -> String {
        let len = self.geometric(0.8);
        format!("/{}", self.pick(PATH_CHARS, len))
    }

    pub fn body(&mut self) -> String {
        let len = self.geometric(0.95);
        self.pick(b"abcdefghij \r\n0123456789", len)
    }

    fn headers(&mut self, out: &mut String) {
        for _ in 0..self.geometric(0.6) {
            let name = self.header_name();
            let value = self.header_value();
            out.push_str(&format!("{}: {}\r\n", name, value));
        }
    }

    /// Body framed by Content-Length or chunked coding, or no body at all
    fn framed_body(&mut self, out: &mut String, allow_empty: bool) {
        if allow_empty && self.chance(0.3) {
            out.push_str("\r\n");
            return;
        }
        let body = self.body();
        if self.chance(0.5) {
            out.push_str(&format!("Content-Length: {}\r\n\r\n{}", body.len(), body));
        } else {
            out.push_str("Transfer-Encoding: chunked\r\n\r\n");
            let mut rest = body.as_str();
            while !rest.is_empty() {
                let take = self.rng.gen_range(1..=rest.len());
                out.push_str(&format!("{:x}\r\n{}\r\n", take, &rest[..take]));
                rest = &rest[take..];
            }
            out.push_str("0\r\n");
            if self.chance(0.3) {
                let name = self.header_name();
                out.push_str(&format!("{}: t\r\n", name));
            }
            out.push_str("\r\n");
        }
    }

    /// One complete, well-formed request
    pub fn request(&mut self) -> String {
        let method = METHODS[self.rng.gen_range(0..METHODS.len())];
        let minor = if self.chance(0.8) { 1 } else { 0 };
        let mut out = format!("{} {} HTTP/1.{}\r\n", method, self.path(), minor);
        self.headers(&mut out);
        self.framed_body(&mut out, true);
        out
    }

    /// One complete, well-formed response that does not rely on EOF framing
    pub fn response(&mut self) -> String {
        let status = STATUSES[self.rng.gen_range(0..STATUSES.len())];
        let mut out = format!("HTTP/1.1 {} Reason Phrase\r\n", status);
        self.headers(&mut out);
        if matches!(status, 204 | 304) {
            out.push_str("\r\n");
        } else {
            self.framed_body(&mut out, false);
        }
        out
    }

    /// Several pipelined requests
    pub fn requests(&mut self) -> String {
        (0..1 + self.geometric(0.5)).map(|_| self.request()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reproducibility() {
        let mut g1 = Gen::new(42);
        let mut g2 = Gen::new(42);

        for _ in 0..10 {
            assert_eq!(g1.request(), g2.request());
            assert_eq!(g1.splits(100), g2.splits(100));
        }
    }

    #[test]
    fn test_splits_in_range() {
        let mut gen = Gen::new(7);
        for _ in 0..100 {
            let splits = gen.splits(20);
            assert!(splits.windows(2).all(|w| w[0] <= w[1]));
            assert!(splits.iter().all(|&s| s <= 20));
        }
    }
}
