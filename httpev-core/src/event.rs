//! Parser events - the output of one `execute` call.
//!
//! Events are plain `Copy` values: payloads are [`ByteSpan`]s into the
//! buffer passed to the call, so writing an event into a batch slot never
//! allocates. Every call ends with exactly one terminal event
//! (`NeedsInput`, `BatchExhausted` or `ParseError`).
//!
//! ## Event Sequences
//!
//! Request `GET /a?x=1 HTTP/1.1\r\nHost: h\r\n\r\n` emits:
//! ```text
//! MessageStart(Request(Known(Get)))
//! Url("/a?x=1")
//! Version { major: 1, minor: 1 }
//! HeaderField("Host")
//! HeaderValue("h")
//! HeadersEnd
//! MessageEnd
//! NeedsInput
//! ```
//!
//! Response `HTTP/1.1 200 OK\r\nContent-Length: 2\r\n\r\nhi` emits:
//! ```text
//! MessageStart(Response { status: 200 })
//! Version { major: 1, minor: 1 }
//! HeaderField("Content-Length")
//! HeaderValue("2")
//! HeadersEnd
//! Body("hi")
//! MessageEnd
//! NeedsInput
//! ```

use crate::method::Method;
use crate::span::ByteSpan;

/// Error codes for grammar violations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ParseErrorCode {
    /// Byte not allowed in a method token
    InvalidMethod = 0,
    /// Byte not allowed in the request target
    InvalidUrl,
    /// Malformed `HTTP/x.y` version
    InvalidVersion,
    /// Malformed three-digit status code
    InvalidStatus,
    /// Byte not allowed in a header field name
    InvalidHeaderName,
    /// Control byte inside a header value
    InvalidHeaderValue,
    /// Continuation line with no header before it
    UnexpectedContinuation,
    /// Content-Length is not a decimal number, or conflicts with another
    InvalidContentLength,
    /// Malformed chunk-size line
    InvalidChunkSize,
    /// Missing CRLF after chunk data
    InvalidChunkTerminator,
    /// Line longer than the configured limit
    LineTooLong,
    /// More header lines than the configured limit
    TooManyHeaders,
    /// End of input in the middle of a message
    UnexpectedEof,
}

impl ParseErrorCode {
    /// Get a human-readable message for this error code.
    pub fn message(self) -> &'static str {
        match self {
            Self::InvalidMethod => "invalid method",
            Self::InvalidUrl => "invalid url",
            Self::InvalidVersion => "invalid version",
            Self::InvalidStatus => "invalid status",
            Self::InvalidHeaderName => "invalid header name",
            Self::InvalidHeaderValue => "invalid header value",
            Self::UnexpectedContinuation => "unexpected continuation line",
            Self::InvalidContentLength => "invalid content length",
            Self::InvalidChunkSize => "invalid chunk size",
            Self::InvalidChunkTerminator => "invalid chunk terminator",
            Self::LineTooLong => "line too long",
            Self::TooManyHeaders => "too many headers",
            Self::UnexpectedEof => "unexpected eof",
        }
    }
}

impl std::fmt::Display for ParseErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.message())
    }
}

/// Method carried by a request `MessageStart`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestMethod {
    /// One of the recognised methods
    Known(Method),
    /// Syntactically valid token outside the enumeration
    Unknown(ByteSpan),
}

impl RequestMethod {
    /// The recognised method, if any.
    #[inline]
    pub fn known(&self) -> Option<Method> {
        match self {
            RequestMethod::Known(m) => Some(*m),
            RequestMethod::Unknown(_) => None,
        }
    }
}

/// Payload of `MessageStart`, depending on the session direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageStart {
    Request(RequestMethod),
    /// Raw numeric status, unmapped
    Response { status: u16 },
}

/// Framing facts known once the header block is complete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MessageFlags {
    /// Connection persists after this message
    pub keep_alive: bool,
    /// Connection switches protocol after this message
    pub upgrade: bool,
    /// Body uses chunked transfer coding
    pub chunked: bool,
    /// Declared Content-Length, if any
    pub content_length: Option<u64>,
}

/// Events emitted into an [`EventBatch`](crate::EventBatch).
///
/// Positions (`at`, span offsets) are absolute within the buffer passed to
/// the call that produced the event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    // ========== Terminal Events ==========

    /// Grammar violation at `at`. The session is unusable until reinitialized.
    ParseError { at: usize, code: ParseErrorCode },

    /// Input exhausted. Bytes from `at` to the end of the window (if any)
    /// form an incomplete token and must be presented again.
    ///
    /// This is not detected: a host that sends only the fresh bytes gets
    /// them parsed as the start of the token, so `"Ho"` + `"st: h"` yields
    /// a field named `st`. After an upgrade the bytes from `at` belong to
    /// the new protocol instead.
    NeedsInput { at: usize },

    /// Batch full. Call `execute` again starting at `at`.
    BatchExhausted { at: usize },

    // ========== Start Line Events ==========

    MessageStart(MessageStart),

    Version { major: u8, minor: u8 },

    /// Full request target
    Url(ByteSpan),
    /// Path component of the request target (opt-in)
    Path(ByteSpan),
    /// Query component, without the `?` (opt-in)
    QueryString(ByteSpan),
    /// Fragment component, without the `#` (opt-in)
    Fragment(ByteSpan),

    // ========== Header Events ==========

    HeaderField(ByteSpan),

    /// Value for the preceding field. Continuation lines produce further
    /// `HeaderValue` events for the same field.
    HeaderValue(ByteSpan),

    HeadersEnd(MessageFlags),

    // ========== Body Events ==========

    Body(ByteSpan),

    /// End of message; `at` is the position right after its last byte
    MessageEnd { at: usize },
}

impl Event {
    /// Get the byte span carried by this event, if any.
    pub fn span(&self) -> Option<ByteSpan> {
        match self {
            Event::Url(span)
            | Event::Path(span)
            | Event::QueryString(span)
            | Event::Fragment(span)
            | Event::HeaderField(span)
            | Event::HeaderValue(span)
            | Event::Body(span) => Some(*span),
            Event::MessageStart(MessageStart::Request(RequestMethod::Unknown(span))) => {
                Some(*span)
            }
            _ => None,
        }
    }

    /// Check if this event ends an `execute` call.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Event::ParseError { .. } | Event::NeedsInput { .. } | Event::BatchExhausted { .. }
        )
    }

    /// Check if this is an error event.
    pub fn is_error(&self) -> bool {
        matches!(self, Event::ParseError { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_span_accessor() {
        let span = ByteSpan::new(4, 2);
        assert_eq!(Event::Url(span).span(), Some(span));
        assert_eq!(Event::Body(span).span(), Some(span));
        assert_eq!(
            Event::MessageStart(MessageStart::Request(RequestMethod::Unknown(span))).span(),
            Some(span)
        );
        assert_eq!(
            Event::MessageStart(MessageStart::Request(RequestMethod::Known(Method::Get))).span(),
            None
        );
        assert_eq!(Event::Version { major: 1, minor: 1 }.span(), None);
    }

    #[test]
    fn test_terminal_events() {
        assert!(Event::NeedsInput { at: 0 }.is_terminal());
        assert!(Event::BatchExhausted { at: 0 }.is_terminal());
        assert!(Event::ParseError { at: 0, code: ParseErrorCode::InvalidMethod }.is_terminal());
        assert!(!Event::MessageEnd { at: 0 }.is_terminal());
        assert!(!Event::HeadersEnd(MessageFlags::default()).is_terminal());
    }

    #[test]
    fn test_error_messages() {
        assert_eq!(ParseErrorCode::LineTooLong.message(), "line too long");
        assert_eq!(ParseErrorCode::UnexpectedEof.to_string(), "unexpected eof");
    }
}

#[test]
fn test_event_sizes() {
    use std::mem::size_of;
    println!("Event: {} bytes", size_of::<Event>());
    println!("ByteSpan: {} bytes", size_of::<ByteSpan>());
    println!("MessageFlags: {} bytes", size_of::<MessageFlags>());
}
