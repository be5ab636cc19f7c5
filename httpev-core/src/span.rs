//! Byte span type.
//!
//! A span is the zero-copy payload of an event: an `(offset, len)` pair
//! pointing into the buffer that was passed to the `execute` call which
//! produced it. Spans carry no ownership and no lifetime of their own; the
//! [`Batch`](crate::Batch) view they are read through pins the buffer.

use std::ops::Range;

/// A non-owning view into a caller-owned buffer.
///
/// 16 bytes on 64-bit targets. Offsets are absolute positions in the buffer
/// handed to `execute`, not relative to the `offset` argument, so
/// `&buffer[span.range()]` is always the payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ByteSpan {
    /// Start position in the originating buffer
    pub offset: usize,
    /// Length in bytes
    pub len: usize,
}

impl ByteSpan {
    /// Create a span from offset and length.
    #[inline]
    pub const fn new(offset: usize, len: usize) -> Self {
        Self { offset, len }
    }

    /// Create a span from a half-open `start..end` pair.
    #[inline]
    pub const fn from_bounds(start: usize, end: usize) -> Self {
        Self {
            offset: start,
            len: end - start,
        }
    }

    /// Exclusive end position.
    #[inline]
    pub const fn end(&self) -> usize {
        self.offset + self.len
    }

    /// Check if the span is empty.
    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The span as a range, suitable for indexing the originating buffer.
    #[inline]
    pub const fn range(&self) -> Range<usize> {
        self.offset..self.offset + self.len
    }

    /// Resolve against a buffer, returning `None` if the span does not fit.
    #[inline]
    pub fn slice<'b>(&self, buffer: &'b [u8]) -> Option<&'b [u8]> {
        buffer.get(self.range())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_span_bounds() {
        let span = ByteSpan::from_bounds(4, 10);
        assert_eq!(span.offset, 4);
        assert_eq!(span.len, 6);
        assert_eq!(span.end(), 10);
        assert_eq!(span.range(), 4..10);
        assert!(!span.is_empty());
        assert!(ByteSpan::new(3, 0).is_empty());
    }

    #[test]
    fn test_span_slice() {
        let buf = b"GET /index HTTP/1.1";
        assert_eq!(ByteSpan::new(4, 6).slice(buf), Some(b"/index".as_slice()));
        assert_eq!(ByteSpan::new(15, 10).slice(buf), None);
        assert_eq!(ByteSpan::new(19, 0).slice(buf), Some(b"".as_slice()));
    }
}
