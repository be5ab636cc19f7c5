//! Session configuration.

use crate::error::{Error, Result};

/// Largest number of events a single engine step emits
/// (`Url` + `Path` + `QueryString` + `Fragment`).
pub const MAX_EVENTS_PER_STEP: usize = 4;

/// Smallest usable batch: one full step plus the terminal event.
pub const MIN_BATCH_CAPACITY: usize = MAX_EVENTS_PER_STEP + 1;

/// Tunables for a [`ParserSession`](crate::ParserSession).
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ParserConfig {
    /// Event slots per batch, terminal event included
    pub batch_capacity: usize,
    /// Longest start line, header line or chunk-size line, CRLF included
    pub max_line_len: usize,
    /// Most header lines per header or trailer block
    pub max_headers: usize,
    /// Emit `Path`/`QueryString`/`Fragment` after each `Url`
    pub url_components: bool,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            batch_capacity: 1000,
            max_line_len: 8 * 1024,
            max_headers: 100,
            url_components: false,
        }
    }
}

impl ParserConfig {
    pub fn batch_capacity(mut self, capacity: usize) -> Self {
        self.batch_capacity = capacity;
        self
    }

    pub fn max_line_len(mut self, len: usize) -> Self {
        self.max_line_len = len;
        self
    }

    pub fn max_headers(mut self, count: usize) -> Self {
        self.max_headers = count;
        self
    }

    pub fn url_components(mut self, enabled: bool) -> Self {
        self.url_components = enabled;
        self
    }

    /// Reject configurations the engine cannot make progress with.
    pub fn validate(&self) -> Result<()> {
        if self.batch_capacity < MIN_BATCH_CAPACITY {
            return Err(Error::InvalidConfig(format!(
                "batch_capacity must be at least {}, got {}",
                MIN_BATCH_CAPACITY, self.batch_capacity
            )));
        }
        // "HTTP/1.1 200\r\n" is the shortest meaningful start line
        if self.max_line_len < 16 {
            return Err(Error::InvalidConfig(format!(
                "max_line_len must be at least 16, got {}",
                self.max_line_len
            )));
        }
        if self.max_headers == 0 {
            return Err(Error::InvalidConfig("max_headers must be non-zero".into()));
        }
        Ok(())
    }
}
