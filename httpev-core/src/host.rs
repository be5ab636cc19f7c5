//! Host boundary encoding.
//!
//! Dynamic hosts see each event as a fixed 3-tuple: a tag naming the event
//! kind plus two tag-dependent fields. This module converts typed events to
//! that shape and validates the loosely-typed arguments such hosts pass in
//! (direction strings, signed integers, possibly-missing buffers).
//!
//! | tag                   | a                   | b             |
//! |-----------------------|---------------------|---------------|
//! | `ERROR`               | error offset        | `0`           |
//! | `NEEDS_INPUT`         | resume offset       | `0`           |
//! | `NEEDS_DATA_ELEMENTS` | resume offset       | `0`           |
//! | `REQ_MESSAGE_START`   | method name         | null, or token offset if unknown |
//! | `RES_MESSAGE_START`   | status code         | null          |
//! | `VERSION`             | major               | minor         |
//! | `URL`, `PATH`, ...    | span offset         | span length   |
//! | `HEADERS_END`         | null                | null          |
//! | `MESSAGE_END`         | end offset          | `0`           |
//!
//! An unknown method token starts at `b` and runs to the next space, which
//! is always inside the same window.

use crate::batch::Batch;
use crate::error::{Error, Result};
use crate::event::{Event, MessageStart, RequestMethod};
use crate::session::{Direction, ParserSession};
use crate::span::ByteSpan;

/// Name reported for tokens outside the method enumeration.
pub const UNKNOWN_METHOD: &str = "UNKNOWN_METHOD";

/// One tuple field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[cfg_attr(feature = "serde", serde(untagged))]
pub enum HostField {
    Null,
    Int(i64),
    Str(&'static str),
}

impl From<usize> for HostField {
    fn from(n: usize) -> Self {
        HostField::Int(i64::try_from(n).unwrap_or(i64::MAX))
    }
}

/// An event as a `(tag, a, b)` tuple.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HostEvent {
    pub tag: &'static str,
    pub a: HostField,
    pub b: HostField,
}

impl HostEvent {
    fn new(tag: &'static str, a: impl Into<HostField>, b: impl Into<HostField>) -> Self {
        Self {
            tag,
            a: a.into(),
            b: b.into(),
        }
    }

    fn span(tag: &'static str, span: ByteSpan) -> Self {
        Self::new(tag, span.offset, span.len)
    }

    /// Tuple form of a typed event.
    pub fn from_event(event: &Event) -> Self {
        match *event {
            Event::ParseError { at, .. } => Self::new("ERROR", at, 0usize),
            Event::NeedsInput { at } => Self::new("NEEDS_INPUT", at, 0usize),
            Event::BatchExhausted { at } => Self::new("NEEDS_DATA_ELEMENTS", at, 0usize),
            Event::MessageStart(MessageStart::Request(method)) => {
                let (name, token) = match method {
                    RequestMethod::Known(m) => (m.as_str(), HostField::Null),
                    RequestMethod::Unknown(span) => (UNKNOWN_METHOD, span.offset.into()),
                };
                Self::new("REQ_MESSAGE_START", HostField::Str(name), token)
            }
            Event::MessageStart(MessageStart::Response { status }) => Self::new(
                "RES_MESSAGE_START",
                HostField::Int(i64::from(status)),
                HostField::Null,
            ),
            Event::Version { major, minor } => Self::new(
                "VERSION",
                HostField::Int(i64::from(major)),
                HostField::Int(i64::from(minor)),
            ),
            Event::Path(span) => Self::span("PATH", span),
            Event::QueryString(span) => Self::span("QUERY_STRING", span),
            Event::Fragment(span) => Self::span("FRAGMENT", span),
            Event::Url(span) => Self::span("URL", span),
            Event::HeaderField(span) => Self::span("HEADER_FIELD", span),
            Event::HeaderValue(span) => Self::span("HEADER_VALUE", span),
            Event::HeadersEnd(_) => Self::new("HEADERS_END", HostField::Null, HostField::Null),
            Event::Body(span) => Self::span("BODY", span),
            Event::MessageEnd { at } => Self::new("MESSAGE_END", at, 0usize),
        }
    }
}

impl From<&Event> for HostEvent {
    fn from(event: &Event) -> Self {
        HostEvent::from_event(event)
    }
}

/// Tuple form of a whole batch.
pub fn encode_batch(batch: &Batch<'_, '_>) -> Vec<HostEvent> {
    batch.iter().map(HostEvent::from_event).collect()
}

/// `create_session("request" | "response")`.
pub fn create_session(direction: &str) -> Result<ParserSession> {
    Ok(ParserSession::new(direction.parse()?))
}

/// `reinitialize(session, "request" | "response")`. Leaves the session
/// untouched on `InvalidArgument`.
pub fn reinitialize(session: &mut ParserSession, direction: &str) -> Result<()> {
    let direction: Direction = direction.parse()?;
    session.reinitialize(direction);
    Ok(())
}

/// `execute(session, buffer, offset, length)` with host-typed arguments.
///
/// `None` stands for a host value that is not a byte buffer.
pub fn execute_host(
    session: &mut ParserSession,
    buffer: Option<&[u8]>,
    offset: i64,
    length: i64,
) -> Result<Vec<HostEvent>> {
    let buffer = buffer.ok_or(Error::TypeMismatch)?;
    let out_of_bounds = || Error::OutOfBounds {
        offset,
        length,
        buffer_len: buffer.len(),
    };
    let offset_u = usize::try_from(offset).map_err(|_| out_of_bounds())?;
    let length_u = usize::try_from(length).map_err(|_| out_of_bounds())?;
    let batch = session.execute(buffer, offset_u, length_u)?;
    Ok(encode_batch(&batch))
}
