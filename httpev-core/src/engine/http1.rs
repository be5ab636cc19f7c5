//! Resumable HTTP/1.x state machine.
//!
//! The engine advances in steps. A step recognises one complete token
//! (method, request target, version, header name, header value, chunk-size
//! line, ...) or one run of body bytes, emits its events, and commits. An
//! incomplete token is never emitted: the engine stops with `NeedsInput` at
//! the token's first byte and the host presents those bytes again together
//! with the next read. Body bytes are the exception; they are emitted as they
//! arrive, so a body may be split across several `Body` events.
//!
//! # Phases
//!
//! ```text
//! StartLine ─▶ RequestUrl ─▶ RequestVersion ─┐      (request)
//! StartLine ─────────────────────────────────┤      (response)
//!                                            ▼
//!        ┌──────────────────────────── HeaderLine ◀─▶ HeaderValue
//!        ▼                                   │
//!   BodyLength / BodyUntilEof           ChunkSize ─▶ ChunkData ─▶ ChunkDataEnd
//!        │                                   │                       │
//!        └────────▶ StartLine ◀── trailers ◀─┘ (size 0)    ChunkSize ◀┘
//! ```

use memchr::{memchr, memchr2};

use super::token::{hex_value, is_ctl, is_ows, is_tchar, is_url_char, list_items, trim_ows};
use super::{GrammarEngine, Halt, Window};
use crate::batch::EventSink;
use crate::config::ParserConfig;
use crate::event::{Event, MessageFlags, MessageStart, ParseErrorCode, RequestMethod};
use crate::method::Method;
use crate::session::Direction;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    /// Between messages; method token or status line expected
    StartLine,
    /// After `METHOD SP`
    RequestUrl,
    /// After `METHOD SP target SP`
    RequestVersion,
    /// At the start of a header or trailer line
    HeaderLine,
    /// After `name:`
    HeaderValue,
    BodyLength { remaining: u64 },
    ChunkSize,
    ChunkData { remaining: u64 },
    ChunkDataEnd,
    /// Unframed response body, ended by end of input
    BodyUntilEof,
    Upgraded,
    Dead,
}

/// Headers the engine interprets for framing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HeaderKind {
    ContentLength,
    TransferEncoding,
    Connection,
    Upgrade,
    Other,
}

impl HeaderKind {
    fn classify(name: &[u8]) -> Self {
        if name.eq_ignore_ascii_case(b"content-length") {
            HeaderKind::ContentLength
        } else if name.eq_ignore_ascii_case(b"transfer-encoding") {
            HeaderKind::TransferEncoding
        } else if name.eq_ignore_ascii_case(b"connection") {
            HeaderKind::Connection
        } else if name.eq_ignore_ascii_case(b"upgrade") {
            HeaderKind::Upgrade
        } else {
            HeaderKind::Other
        }
    }
}

/// Facts collected while parsing the current message.
#[derive(Debug, Clone, Copy, Default)]
struct MessageState {
    major: u8,
    minor: u8,
    method: Option<Method>,
    status: u16,
    content_length: Option<u64>,
    chunked: bool,
    conn_close: bool,
    conn_keep_alive: bool,
    conn_upgrade: bool,
    upgrade_header: bool,
    header_count: usize,
    in_trailers: bool,
    /// Kind of the field whose value is pending
    field: Option<HeaderKind>,
    /// A header value has been completed, so continuation lines are legal
    has_value: bool,
}

impl MessageState {
    fn keep_alive(&self) -> bool {
        if (self.major, self.minor) >= (1, 1) {
            !self.conn_close
        } else {
            self.conn_keep_alive && !self.conn_close
        }
    }
}

/// Outcome of one step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    /// Committed; continue at this window-relative position
    Advanced(usize),
    /// The token at the current position is not complete yet
    Incomplete,
    /// Events of the next step do not fit
    Full,
    /// Committed and stopped for good (protocol upgrade)
    Halted(usize),
    Error(usize, ParseErrorCode),
}

/// Prefix match result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scan<T> {
    Done(T),
    Partial,
    /// Offending byte, relative to the scanned slice
    Invalid(usize),
}

/// Match `HTTP/d.d` at the start of `bytes`.
fn scan_version(bytes: &[u8]) -> Scan<(u8, u8)> {
    const PREFIX: &[u8] = b"HTTP/";
    for (i, &expected) in PREFIX.iter().enumerate() {
        match bytes.get(i) {
            None => return Scan::Partial,
            Some(&b) if b != expected => return Scan::Invalid(i),
            _ => {}
        }
    }
    let digit = |i: usize| -> Scan<u8> {
        match bytes.get(i) {
            None => Scan::Partial,
            Some(b) if b.is_ascii_digit() => Scan::Done(b - b'0'),
            Some(_) => Scan::Invalid(i),
        }
    };
    let major = match digit(5) {
        Scan::Done(d) => d,
        Scan::Partial => return Scan::Partial,
        Scan::Invalid(i) => return Scan::Invalid(i),
    };
    match bytes.get(6) {
        None => return Scan::Partial,
        Some(&b'.') => {}
        Some(_) => return Scan::Invalid(6),
    }
    match digit(7) {
        Scan::Done(minor) => Scan::Done((major, minor)),
        Scan::Partial => Scan::Partial,
        Scan::Invalid(i) => Scan::Invalid(i),
    }
}

/// Match CRLF or a bare LF at `bytes[at..]`; yields the position after it.
fn scan_line_end(bytes: &[u8], at: usize) -> Scan<usize> {
    match bytes.get(at) {
        None => Scan::Partial,
        Some(&b'\n') => Scan::Done(at + 1),
        Some(&b'\r') => match bytes.get(at + 1) {
            None => Scan::Partial,
            Some(&b'\n') => Scan::Done(at + 2),
            Some(_) => Scan::Invalid(at + 1),
        },
        Some(_) => Scan::Invalid(at),
    }
}

/// Position of the first control byte in a line body, if any.
fn find_ctl(bytes: &[u8]) -> Option<usize> {
    bytes.iter().position(|&b| is_ctl(b))
}

/// Strip one trailing CR from a line body ending right before LF.
fn strip_cr(bytes: &[u8]) -> &[u8] {
    bytes.strip_suffix(b"\r").unwrap_or(bytes)
}

/// The built-in HTTP/1.0 and HTTP/1.1 grammar engine.
#[derive(Debug, Clone)]
pub struct Http1Engine {
    direction: Direction,
    max_line_len: usize,
    max_headers: usize,
    url_components: bool,
    phase: Phase,
    /// Bytes of the current line committed by earlier steps
    line_len: usize,
    msg: MessageState,
    /// Last call stopped in front of an incomplete token
    holding: bool,
}

impl Http1Engine {
    pub fn new(direction: Direction, config: &ParserConfig) -> Self {
        Self {
            direction,
            max_line_len: config.max_line_len,
            max_headers: config.max_headers,
            url_components: config.url_components,
            phase: Phase::StartLine,
            line_len: 0,
            msg: MessageState::default(),
            holding: false,
        }
    }

    /// Direction the engine was last reset to.
    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// True between messages, with nothing held back.
    pub fn is_idle(&self) -> bool {
        self.phase == Phase::StartLine && !self.holding
    }

    /// Error step for a line that grew past `max_line_len`, if it did.
    ///
    /// `scanned` counts bytes of the current line from `pos` on.
    fn line_limit(&self, pos: usize, scanned: usize) -> Option<Step> {
        (self.line_len + scanned > self.max_line_len).then(|| {
            Step::Error(
                pos + self.max_line_len.saturating_sub(self.line_len),
                ParseErrorCode::LineTooLong,
            )
        })
    }

    /// `Incomplete`, unless the partial token already breaks the line limit.
    fn partial(&self, pos: usize, scanned: usize) -> Step {
        self.line_limit(pos, scanned).unwrap_or(Step::Incomplete)
    }

    /// Error at `pos + i`, unless the bytes scanned up to it already break
    /// the line limit.
    fn invalid(&self, pos: usize, i: usize, code: ParseErrorCode) -> Step {
        self.line_limit(pos, i + 1).unwrap_or(Step::Error(pos + i, code))
    }

    fn step(&mut self, window: &Window<'_>, pos: usize, sink: &mut EventSink<'_>) -> Step {
        match self.phase {
            Phase::StartLine => self.start_line(window, pos, sink),
            Phase::RequestUrl => self.request_url(window, pos, sink),
            Phase::RequestVersion => self.request_version(window, pos, sink),
            Phase::HeaderLine => self.header_line(window, pos, sink),
            Phase::HeaderValue => self.header_value(window, pos, sink),
            Phase::BodyLength { remaining } => self.body_length(window, pos, remaining, sink),
            Phase::ChunkSize => self.chunk_size(window, pos),
            Phase::ChunkData { remaining } => self.chunk_data(window, pos, remaining, sink),
            Phase::ChunkDataEnd => self.chunk_data_end(window, pos),
            Phase::BodyUntilEof => self.body_until_eof(window, pos, sink),
            Phase::Upgraded | Phase::Dead => Step::Halted(pos),
        }
    }

    // ========== Start Line ==========

    fn start_line(&mut self, window: &Window<'_>, pos: usize, sink: &mut EventSink<'_>) -> Step {
        let rest = &window.bytes()[pos..];
        let Some(&first) = rest.first() else {
            return Step::Incomplete;
        };
        // Stray line breaks between messages are skipped
        if first == b'\r' || first == b'\n' {
            return Step::Advanced(pos + 1);
        }
        match self.direction {
            Direction::Request => self.request_method(window, pos, sink),
            Direction::Response => self.status_line(window, pos, sink),
        }
    }

    fn request_method(&mut self, window: &Window<'_>, pos: usize, sink: &mut EventSink<'_>) -> Step {
        let rest = &window.bytes()[pos..];
        let len = rest.iter().position(|&b| !is_tchar(b)).unwrap_or(rest.len());
        if len == rest.len() {
            return self.partial(pos, len);
        }
        if let Some(err) = self.line_limit(pos, len + 1) {
            return err;
        }
        if len == 0 || rest[len] != b' ' {
            return Step::Error(pos + len, ParseErrorCode::InvalidMethod);
        }

        let token = &rest[..len];
        let method = match Method::from_token(token) {
            Some(m) => RequestMethod::Known(m),
            None => RequestMethod::Unknown(window.span(pos, pos + len)),
        };
        if !sink.push_all(&[Event::MessageStart(MessageStart::Request(method))]) {
            return Step::Full;
        }
        self.msg = MessageState {
            method: method.known(),
            ..MessageState::default()
        };
        self.line_len = len + 1;
        self.phase = Phase::RequestUrl;
        Step::Advanced(pos + len + 1)
    }

    fn request_url(&mut self, window: &Window<'_>, pos: usize, sink: &mut EventSink<'_>) -> Step {
        let rest = &window.bytes()[pos..];
        let len = rest.iter().position(|&b| !is_url_char(b)).unwrap_or(rest.len());
        if len == rest.len() {
            return self.partial(pos, len);
        }
        if let Some(err) = self.line_limit(pos, len + 1) {
            return err;
        }
        if len == 0 || rest[len] != b' ' {
            return Step::Error(pos + len, ParseErrorCode::InvalidUrl);
        }

        let mut events = [Event::Url(window.span(pos, pos + len)); 4];
        let mut count = 1;
        if self.url_components {
            let url = &rest[..len];
            let path_end = memchr2(b'?', b'#', url).unwrap_or(len);
            events[count] = Event::Path(window.span(pos, pos + path_end));
            count += 1;
            let mut fragment_at = None;
            if url.get(path_end) == Some(&b'?') {
                let query_start = path_end + 1;
                let query_end = memchr(b'#', &url[query_start..]).map_or(len, |i| query_start + i);
                events[count] = Event::QueryString(window.span(pos + query_start, pos + query_end));
                count += 1;
                if query_end < len {
                    fragment_at = Some(query_end);
                }
            } else if path_end < len {
                fragment_at = Some(path_end);
            }
            if let Some(hash) = fragment_at {
                events[count] = Event::Fragment(window.span(pos + hash + 1, pos + len));
                count += 1;
            }
        }
        if !sink.push_all(&events[..count]) {
            return Step::Full;
        }
        self.line_len += len + 1;
        self.phase = Phase::RequestVersion;
        Step::Advanced(pos + len + 1)
    }

    fn request_version(&mut self, window: &Window<'_>, pos: usize, sink: &mut EventSink<'_>) -> Step {
        let rest = &window.bytes()[pos..];
        let (major, minor) = match scan_version(rest) {
            Scan::Done(v) => v,
            Scan::Partial => return self.partial(pos, rest.len()),
            Scan::Invalid(i) => return self.invalid(pos, i, ParseErrorCode::InvalidVersion),
        };
        let end = match scan_line_end(rest, 8) {
            Scan::Done(end) => end,
            Scan::Partial => return self.partial(pos, rest.len()),
            Scan::Invalid(i) => return self.invalid(pos, i, ParseErrorCode::InvalidVersion),
        };
        if let Some(err) = self.line_limit(pos, end) {
            return err;
        }
        if !sink.push_all(&[Event::Version { major, minor }]) {
            return Step::Full;
        }
        self.msg.major = major;
        self.msg.minor = minor;
        self.begin_header_block();
        Step::Advanced(pos + end)
    }

    fn status_line(&mut self, window: &Window<'_>, pos: usize, sink: &mut EventSink<'_>) -> Step {
        let rest = &window.bytes()[pos..];
        let (major, minor) = match scan_version(rest) {
            Scan::Done(v) => v,
            Scan::Partial => return self.partial(pos, rest.len()),
            Scan::Invalid(i) => return Step::Error(pos + i, ParseErrorCode::InvalidVersion),
        };
        match rest.get(8) {
            None => return self.partial(pos, rest.len()),
            Some(&b' ') => {}
            Some(_) => return Step::Error(pos + 8, ParseErrorCode::InvalidStatus),
        }
        let mut status: u16 = 0;
        for i in 9..12 {
            match rest.get(i) {
                None => return self.partial(pos, rest.len()),
                Some(b) if b.is_ascii_digit() => status = status * 10 + u16::from(b - b'0'),
                Some(_) => return Step::Error(pos + i, ParseErrorCode::InvalidStatus),
            }
        }
        let end = match rest.get(12) {
            None => return self.partial(pos, rest.len()),
            Some(&b' ') => {
                let Some(lf) = memchr(b'\n', &rest[13..]).map(|i| 13 + i) else {
                    return self.partial(pos, rest.len());
                };
                if let Some(err) = self.line_limit(pos, lf + 1) {
                    return err;
                }
                if let Some(i) = find_ctl(strip_cr(&rest[13..lf])) {
                    return Step::Error(pos + 13 + i, ParseErrorCode::InvalidStatus);
                }
                lf + 1
            }
            Some(_) => match scan_line_end(rest, 12) {
                Scan::Done(end) => end,
                Scan::Partial => return self.partial(pos, rest.len()),
                Scan::Invalid(i) => return Step::Error(pos + i, ParseErrorCode::InvalidStatus),
            },
        };
        if let Some(err) = self.line_limit(pos, end) {
            return err;
        }

        let events = [
            Event::MessageStart(MessageStart::Response { status }),
            Event::Version { major, minor },
        ];
        if !sink.push_all(&events) {
            return Step::Full;
        }
        self.msg = MessageState {
            major,
            minor,
            status,
            ..MessageState::default()
        };
        self.begin_header_block();
        Step::Advanced(pos + end)
    }

    // ========== Headers ==========

    fn begin_header_block(&mut self) {
        self.msg.header_count = 0;
        self.msg.has_value = false;
        self.msg.field = None;
        self.line_len = 0;
        self.phase = Phase::HeaderLine;
    }

    fn header_line(&mut self, window: &Window<'_>, pos: usize, sink: &mut EventSink<'_>) -> Step {
        let rest = &window.bytes()[pos..];
        let Some(&first) = rest.first() else {
            return Step::Incomplete;
        };

        if first == b'\r' || first == b'\n' {
            return match scan_line_end(rest, 0) {
                Scan::Done(n) => self.end_header_block(window, pos, pos + n, sink),
                Scan::Partial => Step::Incomplete,
                Scan::Invalid(i) => Step::Error(pos + i, ParseErrorCode::InvalidHeaderName),
            };
        }

        if is_ows(first) {
            if !self.msg.has_value {
                return Step::Error(pos, ParseErrorCode::UnexpectedContinuation);
            }
            // obs-fold: another value for the previous field, not reinterpreted
            self.msg.field = Some(HeaderKind::Other);
            self.phase = Phase::HeaderValue;
            return self.header_value(window, pos, sink);
        }

        let len = rest.iter().position(|&b| !is_tchar(b)).unwrap_or(rest.len());
        if len == rest.len() {
            return self.partial(pos, len);
        }
        if let Some(err) = self.line_limit(pos, len + 1) {
            return err;
        }
        if len == 0 || rest[len] != b':' {
            return Step::Error(pos + len, ParseErrorCode::InvalidHeaderName);
        }
        if self.msg.header_count >= self.max_headers {
            return Step::Error(pos, ParseErrorCode::TooManyHeaders);
        }
        if !sink.push_all(&[Event::HeaderField(window.span(pos, pos + len))]) {
            return Step::Full;
        }
        let kind = if self.msg.in_trailers {
            HeaderKind::Other
        } else {
            HeaderKind::classify(&rest[..len])
        };
        self.msg.header_count += 1;
        self.msg.field = Some(kind);
        self.msg.has_value = false;
        self.line_len = len + 1;
        self.phase = Phase::HeaderValue;
        Step::Advanced(pos + len + 1)
    }

    fn header_value(&mut self, window: &Window<'_>, pos: usize, sink: &mut EventSink<'_>) -> Step {
        let rest = &window.bytes()[pos..];
        let Some(lf) = memchr(b'\n', rest) else {
            return self.partial(pos, rest.len());
        };
        if let Some(err) = self.line_limit(pos, lf + 1) {
            return err;
        }
        let line = strip_cr(&rest[..lf]);
        if let Some(i) = find_ctl(line) {
            return Step::Error(pos + i, ParseErrorCode::InvalidHeaderValue);
        }
        let value = trim_ows(line);
        let start = line.len() - line.iter().skip_while(|&&b| is_ows(b)).count();
        let kind = self.msg.field.unwrap_or(HeaderKind::Other);
        if let Err(i) = self.interpret(kind, value) {
            return Step::Error(pos + start + i, ParseErrorCode::InvalidContentLength);
        }
        let span = window.span(pos + start, pos + start + value.len());
        if !sink.push_all(&[Event::HeaderValue(span)]) {
            return Step::Full;
        }
        self.commit_value(kind, value);
        self.msg.field = None;
        self.msg.has_value = true;
        self.line_len = 0;
        self.phase = Phase::HeaderLine;
        Step::Advanced(pos + lf + 1)
    }

    /// Validate a framing header value. `Err` carries the offending offset.
    fn interpret(&self, kind: HeaderKind, value: &[u8]) -> Result<(), usize> {
        if kind != HeaderKind::ContentLength {
            return Ok(());
        }
        let parsed = parse_content_length(value)?;
        match self.msg.content_length {
            Some(existing) if existing != parsed => Err(0),
            _ => Ok(()),
        }
    }

    fn commit_value(&mut self, kind: HeaderKind, value: &[u8]) {
        match kind {
            HeaderKind::ContentLength => {
                self.msg.content_length = parse_content_length(value).ok();
            }
            HeaderKind::TransferEncoding => {
                self.msg.chunked = list_items(value)
                    .last()
                    .is_some_and(|coding| coding.eq_ignore_ascii_case(b"chunked"));
            }
            HeaderKind::Connection => {
                for item in list_items(value) {
                    if item.eq_ignore_ascii_case(b"close") {
                        self.msg.conn_close = true;
                    } else if item.eq_ignore_ascii_case(b"keep-alive") {
                        self.msg.conn_keep_alive = true;
                    } else if item.eq_ignore_ascii_case(b"upgrade") {
                        self.msg.conn_upgrade = true;
                    }
                }
            }
            HeaderKind::Upgrade => self.msg.upgrade_header = true,
            HeaderKind::Other => {}
        }
    }

    /// Blank line ending a header or trailer block; `end` is past its LF.
    fn end_header_block(
        &mut self,
        window: &Window<'_>,
        pos: usize,
        end: usize,
        sink: &mut EventSink<'_>,
    ) -> Step {
        let message_end = Event::MessageEnd { at: window.at(end) };

        if self.msg.in_trailers {
            if !sink.push_all(&[message_end]) {
                return Step::Full;
            }
            self.phase = Phase::StartLine;
            return Step::Advanced(end);
        }

        let upgrade = match self.direction {
            Direction::Request => {
                self.msg.method == Some(Method::Connect)
                    || (self.msg.conn_upgrade && self.msg.upgrade_header)
            }
            Direction::Response => self.msg.status == 101,
        };
        let bodiless = self.direction == Direction::Response
            && matches!(self.msg.status, 100..=199 | 204 | 304);

        let mut flags = MessageFlags {
            keep_alive: self.msg.keep_alive(),
            upgrade,
            chunked: false,
            content_length: None,
        };
        let next = if upgrade {
            Phase::Upgraded
        } else if bodiless {
            Phase::StartLine
        } else if self.msg.chunked {
            flags.chunked = true;
            Phase::ChunkSize
        } else if let Some(length) = self.msg.content_length {
            flags.content_length = Some(length);
            if length == 0 {
                Phase::StartLine
            } else {
                Phase::BodyLength { remaining: length }
            }
        } else if self.direction == Direction::Request {
            Phase::StartLine
        } else {
            flags.keep_alive = false;
            Phase::BodyUntilEof
        };

        let ends_here = matches!(next, Phase::StartLine | Phase::Upgraded);
        let events = [Event::HeadersEnd(flags), message_end];
        let count = if ends_here { 2 } else { 1 };
        if !sink.push_all(&events[..count]) {
            return Step::Full;
        }
        log::trace!("headers complete at {}: {:?}", window.at(pos), flags);
        self.line_len = 0;
        self.phase = next;
        if next == Phase::Upgraded {
            Step::Halted(end)
        } else {
            Step::Advanced(end)
        }
    }

    // ========== Bodies ==========

    fn body_length(
        &mut self,
        window: &Window<'_>,
        pos: usize,
        remaining: u64,
        sink: &mut EventSink<'_>,
    ) -> Step {
        let available = window.len() - pos;
        if available == 0 {
            return Step::Incomplete;
        }
        let take = available.min(usize::try_from(remaining).unwrap_or(usize::MAX));
        let left = remaining - take as u64;
        let body = Event::Body(window.span(pos, pos + take));
        let pushed = if left == 0 {
            sink.push_all(&[body, Event::MessageEnd { at: window.at(pos + take) }])
        } else {
            sink.push_all(&[body])
        };
        if !pushed {
            return Step::Full;
        }
        self.phase = if left == 0 {
            Phase::StartLine
        } else {
            Phase::BodyLength { remaining: left }
        };
        Step::Advanced(pos + take)
    }

    fn chunk_size(&mut self, window: &Window<'_>, pos: usize) -> Step {
        let rest = &window.bytes()[pos..];
        let digits = rest.iter().position(|&b| hex_value(b).is_none()).unwrap_or(rest.len());
        // More than 16 hex digits overflows u64
        if digits > 16 {
            return Step::Error(pos + 16, ParseErrorCode::InvalidChunkSize);
        }
        if digits == rest.len() {
            return self.partial(pos, digits);
        }
        if digits == 0 {
            return Step::Error(pos, ParseErrorCode::InvalidChunkSize);
        }
        let Some(lf) = memchr(b'\n', &rest[digits..]).map(|i| digits + i) else {
            return self.partial(pos, rest.len());
        };
        if let Some(err) = self.line_limit(pos, lf + 1) {
            return err;
        }
        // Chunk extensions are accepted and ignored
        let tail = strip_cr(&rest[digits..lf]);
        if let Some(&b) = tail.first() {
            if b != b';' && !is_ows(b) {
                return Step::Error(pos + digits, ParseErrorCode::InvalidChunkSize);
            }
        }
        if let Some(i) = find_ctl(tail) {
            return Step::Error(pos + digits + i, ParseErrorCode::InvalidChunkSize);
        }

        let size = rest[..digits]
            .iter()
            .filter_map(|&b| hex_value(b))
            .fold(0u64, |acc, d| (acc << 4) | u64::from(d));
        if size == 0 {
            self.msg.in_trailers = true;
            self.begin_header_block();
        } else {
            self.phase = Phase::ChunkData { remaining: size };
        }
        Step::Advanced(pos + lf + 1)
    }

    fn chunk_data(
        &mut self,
        window: &Window<'_>,
        pos: usize,
        remaining: u64,
        sink: &mut EventSink<'_>,
    ) -> Step {
        let available = window.len() - pos;
        if available == 0 {
            return Step::Incomplete;
        }
        let take = available.min(usize::try_from(remaining).unwrap_or(usize::MAX));
        if !sink.push_all(&[Event::Body(window.span(pos, pos + take))]) {
            return Step::Full;
        }
        let left = remaining - take as u64;
        self.phase = if left == 0 {
            Phase::ChunkDataEnd
        } else {
            Phase::ChunkData { remaining: left }
        };
        Step::Advanced(pos + take)
    }

    fn chunk_data_end(&mut self, window: &Window<'_>, pos: usize) -> Step {
        match scan_line_end(&window.bytes()[pos..], 0) {
            Scan::Done(n) => {
                self.phase = Phase::ChunkSize;
                Step::Advanced(pos + n)
            }
            Scan::Partial => Step::Incomplete,
            Scan::Invalid(i) => Step::Error(pos + i, ParseErrorCode::InvalidChunkTerminator),
        }
    }

    fn body_until_eof(&mut self, window: &Window<'_>, pos: usize, sink: &mut EventSink<'_>) -> Step {
        let end = window.len();
        if end == pos {
            return Step::Incomplete;
        }
        if !sink.push_all(&[Event::Body(window.span(pos, end))]) {
            return Step::Full;
        }
        Step::Advanced(end)
    }

    // ========== End Of Input ==========

    fn finish(&mut self, window: Window<'_>, sink: &mut EventSink<'_>) -> Halt {
        let holding = std::mem::take(&mut self.holding);
        match self.phase {
            Phase::BodyUntilEof => {
                if !sink.push_all(&[Event::MessageEnd { at: window.base() }]) {
                    return Halt::batch_full(0);
                }
                self.phase = Phase::StartLine;
                Halt::needs_input(0)
            }
            Phase::StartLine if !holding => Halt::needs_input(0),
            Phase::Upgraded => Halt::needs_input(0),
            _ => {
                self.phase = Phase::Dead;
                Halt::error(0, 0, ParseErrorCode::UnexpectedEof)
            }
        }
    }
}

/// Decimal Content-Length. `Err` carries the offending offset.
fn parse_content_length(value: &[u8]) -> Result<u64, usize> {
    if value.is_empty() {
        return Err(0);
    }
    let mut n: u64 = 0;
    for (i, &b) in value.iter().enumerate() {
        if !b.is_ascii_digit() {
            return Err(i);
        }
        n = n
            .checked_mul(10)
            .and_then(|n| n.checked_add(u64::from(b - b'0')))
            .ok_or(i)?;
    }
    Ok(n)
}

impl GrammarEngine for Http1Engine {
    fn reset(&mut self, direction: Direction, config: &ParserConfig) {
        *self = Http1Engine::new(direction, config);
    }

    fn execute(&mut self, window: Window<'_>, sink: &mut EventSink<'_>) -> Halt {
        if window.is_empty() {
            return self.finish(window, sink);
        }
        let mut pos = 0;
        loop {
            match self.step(&window, pos, sink) {
                Step::Advanced(next) => pos = next,
                Step::Incomplete => {
                    self.holding = pos < window.len();
                    return Halt::needs_input(pos);
                }
                Step::Full => {
                    self.holding = false;
                    return Halt::batch_full(pos);
                }
                Step::Halted(end) => return Halt::needs_input(end),
                Step::Error(at, code) => {
                    self.phase = Phase::Dead;
                    return Halt::error(pos, at, code);
                }
            }
        }
    }

    fn is_upgraded(&self) -> bool {
        self.phase == Phase::Upgraded
    }
}
