//! Grammar engine seam.
//!
//! A [`GrammarEngine`] owns the byte-level state machine. The session hands
//! it one window of input and an [`EventSink`]; the engine advances over the
//! bytes in whole steps and reports how far it got and why it stopped. The
//! session turns that [`Halt`] into the terminal event of the batch.
//!
//! Engines must be resumable at step granularity: every byte before
//! `Halt::consumed` is fully accounted for in emitted events and internal
//! state, and every byte after it will be presented again on the next call.

mod http1;
mod token;

pub use http1::Http1Engine;

use crate::batch::EventSink;
use crate::config::ParserConfig;
use crate::event::ParseErrorCode;
use crate::session::Direction;
use crate::span::ByteSpan;

/// One call's worth of input.
#[derive(Debug, Clone, Copy)]
pub struct Window<'a> {
    bytes: &'a [u8],
    base: usize,
}

impl<'a> Window<'a> {
    /// `bytes` is `buffer[base..base + bytes.len()]`.
    pub fn new(bytes: &'a [u8], base: usize) -> Self {
        Self { bytes, base }
    }

    #[inline]
    pub fn bytes(&self) -> &'a [u8] {
        self.bytes
    }

    /// Absolute position of `bytes[0]` in the caller's buffer.
    #[inline]
    pub fn base(&self) -> usize {
        self.base
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// An empty window signals end of input.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Absolute span for window-relative `start..end`.
    #[inline]
    pub fn span(&self, start: usize, end: usize) -> ByteSpan {
        ByteSpan::from_bounds(self.base + start, self.base + end)
    }

    /// Absolute position for a window-relative one.
    #[inline]
    pub fn at(&self, rel: usize) -> usize {
        self.base + rel
    }
}

/// Why an engine stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HaltReason {
    /// Window exhausted, or only an incomplete token remains
    NeedsInput,
    /// Next step does not fit in the batch
    BatchFull,
    /// Grammar violation at window-relative `at`
    Error { at: usize, code: ParseErrorCode },
}

/// Result of [`GrammarEngine::execute`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Halt {
    /// Window bytes fully processed
    pub consumed: usize,
    pub reason: HaltReason,
}

impl Halt {
    pub fn needs_input(consumed: usize) -> Self {
        Self {
            consumed,
            reason: HaltReason::NeedsInput,
        }
    }

    pub fn batch_full(consumed: usize) -> Self {
        Self {
            consumed,
            reason: HaltReason::BatchFull,
        }
    }

    pub fn error(consumed: usize, at: usize, code: ParseErrorCode) -> Self {
        Self {
            consumed,
            reason: HaltReason::Error { at, code },
        }
    }
}

/// Byte-level HTTP grammar state machine.
pub trait GrammarEngine {
    /// Return to the "expecting message start" state for `direction`.
    fn reset(&mut self, direction: Direction, config: &ParserConfig);

    /// Advance over `window`, writing events to `sink`.
    ///
    /// An empty window is an end-of-input signal.
    fn execute(&mut self, window: Window<'_>, sink: &mut EventSink<'_>) -> Halt;

    /// True once the engine handed the connection to another protocol.
    fn is_upgraded(&self) -> bool {
        false
    }
}
