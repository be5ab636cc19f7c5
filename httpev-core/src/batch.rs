//! Fixed-capacity event storage and the per-call read view.
//!
//! # Architecture
//!
//! ```text
//!  Host buffer          Session                      Host
//!      │                   │                           │
//!      │──execute(buf)────▶│                           │
//!      │                   │──engine──▶ EventSink      │
//!      │                   │            (reserves the  │
//!      │                   │             terminal slot)│
//!      │                   │──Batch<'s, 'b>───────────▶│
//!      │◀──────────────────┼──────resolve(span)────────│
//! ```
//!
//! # Lifetimes
//!
//! [`Batch`] borrows the session (`'s`) and the input buffer (`'b`). The
//! session borrow stops the host from calling `execute` again while it still
//! holds events; the buffer borrow stops it from mutating or dropping the
//! bytes those events point into. Spans cannot outlive their call.

use crate::event::Event;
use crate::span::ByteSpan;

/// Per-call drain state (see [`ParserSession::drain_state`]).
///
/// [`ParserSession::drain_state`]: crate::ParserSession::drain_state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrainState {
    /// No call has completed since creation or reinitialization
    Idle,
    /// Engine is writing events
    Filling,
    /// Last call ended with `NeedsInput`; fresh data may follow
    Complete,
    /// Last call ended with `BatchExhausted`; the remainder must be re-executed
    Overflowed,
    /// Last call ended with `ParseError`; only `reinitialize` is valid
    Errored,
}

/// Reusable, fixed-capacity event storage.
///
/// Slots are allocated once; `execute` overwrites them in place. A batch is
/// owned by exactly one session at a time and can be recycled through
/// [`ParserSession::into_batch`](crate::ParserSession::into_batch).
#[derive(Debug)]
pub struct EventBatch {
    events: Vec<Event>,
    capacity: usize,
}

impl EventBatch {
    /// Create a batch with exactly `capacity` slots.
    pub fn new(capacity: usize) -> Self {
        Self {
            events: Vec::with_capacity(capacity),
            capacity,
        }
    }

    /// Total slots, terminal event included.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of events currently written.
    #[inline]
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Check if no events are written.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Events written by the last call.
    #[inline]
    pub fn as_slice(&self) -> &[Event] {
        &self.events
    }

    /// Drop all events, keeping the slots.
    pub fn clear(&mut self) {
        self.events.clear();
    }

    /// Writer for one call. Keeps one slot back for the terminal event.
    pub(crate) fn sink(&mut self) -> EventSink<'_> {
        self.events.clear();
        EventSink { batch: self }
    }

    /// Append the terminal event. The reserved slot guarantees room.
    pub(crate) fn terminate(&mut self, event: Event) {
        debug_assert!(event.is_terminal());
        debug_assert!(self.events.len() < self.capacity);
        self.events.push(event);
    }
}

/// Write handle given to a [`GrammarEngine`](crate::GrammarEngine).
///
/// Engines emit events in whole steps with [`push_all`](Self::push_all),
/// which writes everything or nothing, so a step either commits fully in
/// this call or is redone in the next one.
#[derive(Debug)]
pub struct EventSink<'a> {
    batch: &'a mut EventBatch,
}

impl EventSink<'_> {
    /// Slots still available for non-terminal events.
    #[inline]
    pub fn room(&self) -> usize {
        self.batch.capacity - self.batch.events.len() - 1
    }

    /// Check if `n` more events fit.
    #[inline]
    pub fn has_room(&self, n: usize) -> bool {
        self.room() >= n
    }

    /// Number of events written so far in this call.
    #[inline]
    pub fn written(&self) -> usize {
        self.batch.events.len()
    }

    /// Write a single event. Returns it back if the batch is full.
    #[inline]
    pub fn try_push(&mut self, event: Event) -> Result<(), Event> {
        if self.room() == 0 {
            return Err(event);
        }
        self.batch.events.push(event);
        Ok(())
    }

    /// Write all of `events`, or none of them if they do not fit.
    #[inline]
    pub fn push_all(&mut self, events: &[Event]) -> bool {
        if !self.has_room(events.len()) {
            return false;
        }
        self.batch.events.extend_from_slice(events);
        true
    }
}

/// Events produced by one `execute` call, readable until the next call.
#[derive(Debug, Clone, Copy)]
pub struct Batch<'s, 'b> {
    events: &'s [Event],
    buffer: &'b [u8],
    offset: usize,
    consumed: usize,
}

impl<'s, 'b> Batch<'s, 'b> {
    pub(crate) fn new(events: &'s [Event], buffer: &'b [u8], offset: usize, consumed: usize) -> Self {
        debug_assert!(events.last().is_some_and(Event::is_terminal));
        Self {
            events,
            buffer,
            offset,
            consumed,
        }
    }

    /// All events, terminal event last.
    #[inline]
    pub fn events(&self) -> &'s [Event] {
        self.events
    }

    /// Iterate over events in grammar order.
    #[inline]
    pub fn iter(&self) -> std::slice::Iter<'s, Event> {
        self.events.iter()
    }

    /// Number of events, terminal event included.
    #[inline]
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Always false: every call yields a terminal event.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Bytes consumed from the window `[offset, offset + length)`.
    #[inline]
    pub fn consumed(&self) -> usize {
        self.consumed
    }

    /// The `offset` argument of the call.
    #[inline]
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Absolute position of the first unconsumed byte.
    #[inline]
    pub fn resume_at(&self) -> usize {
        self.offset + self.consumed
    }

    /// The buffer this batch's spans point into.
    #[inline]
    pub fn buffer(&self) -> &'b [u8] {
        self.buffer
    }

    /// The event that ended the call.
    #[inline]
    pub fn terminal(&self) -> Option<&'s Event> {
        self.events.last()
    }

    /// Per-call outcome.
    pub fn state(&self) -> DrainState {
        match self.terminal() {
            Some(Event::NeedsInput { .. }) => DrainState::Complete,
            Some(Event::BatchExhausted { .. }) => DrainState::Overflowed,
            Some(Event::ParseError { .. }) => DrainState::Errored,
            _ => DrainState::Filling,
        }
    }

    /// Ended with `NeedsInput`.
    #[inline]
    pub fn is_complete(&self) -> bool {
        self.state() == DrainState::Complete
    }

    /// Ended with `BatchExhausted`.
    #[inline]
    pub fn is_overflowed(&self) -> bool {
        self.state() == DrainState::Overflowed
    }

    /// Ended with `ParseError`.
    #[inline]
    pub fn is_errored(&self) -> bool {
        self.state() == DrainState::Errored
    }

    /// Resolve a span from this batch to its bytes.
    #[inline]
    pub fn resolve(&self, span: ByteSpan) -> Option<&'b [u8]> {
        span.slice(self.buffer)
    }
}

impl<'s> IntoIterator for &Batch<'s, '_> {
    type Item = &'s Event;
    type IntoIter = std::slice::Iter<'s, Event>;

    fn into_iter(self) -> Self::IntoIter {
        self.events.iter()
    }
}
