//! Host-side message assembly.
//!
//! [`MessageAssembler`] is the reference consumer of event batches: it copies
//! what a server needs out of each batch (URL, headers, trailers) into an
//! owned [`IncomingMessage`] and hands body bytes to a [`MessageHandler`]
//! while they are still borrowed from the read buffer.
//!
//! [`HttpStream`] wraps a session and an assembler and runs the drain
//! protocol for the host: it re-executes after `BatchExhausted`, keeps the
//! incomplete-token tail after `NeedsInput` and prefixes it to the next read,
//! and queues reads while paused.

use std::collections::VecDeque;

use crate::batch::Batch;
use crate::config::ParserConfig;
use crate::error::Result;
use crate::event::{Event, MessageFlags, MessageStart, ParseErrorCode, RequestMethod};
use crate::method::Method;
use crate::session::{Direction, ParserSession};

/// An owned, fully-parsed message head.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IncomingMessage {
    /// Recognised request method (`None` for responses and unknown tokens)
    pub method: Option<Method>,
    /// Raw request method token
    pub method_name: Option<String>,
    /// Response status code
    pub status: Option<u16>,
    pub version: (u8, u8),
    pub url: String,
    /// Header names lower-cased, in arrival order
    pub headers: Vec<(String, String)>,
    /// Chunked trailers, same shape as `headers`
    pub trailers: Vec<(String, String)>,
    pub flags: MessageFlags,
}

impl IncomingMessage {
    /// `"1.1"`-style version string.
    pub fn http_version(&self) -> String {
        format!("{}.{}", self.version.0, self.version.1)
    }

    /// First header with the given name, compared case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(field, _)| field.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// Callbacks invoked by [`MessageAssembler`].
pub trait MessageHandler {
    /// Header block complete.
    fn on_message_begin(&mut self, _message: &IncomingMessage) {}

    /// Body bytes, borrowed from the current read buffer.
    fn on_body(&mut self, _chunk: &[u8], _message: &IncomingMessage) {}

    /// Message complete, trailers included.
    fn on_message_end(&mut self, message: IncomingMessage);

    /// Grammar violation; the message in progress is dropped.
    fn on_error(&mut self, _at: usize, _code: ParseErrorCode) {}
}

/// Translates event batches into [`MessageHandler`] calls.
#[derive(Debug, Default)]
pub struct MessageAssembler {
    incoming: Option<IncomingMessage>,
    field: Option<String>,
    value: Option<String>,
    headers_complete: bool,
}

impl MessageAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// True while a message has started but not ended.
    pub fn in_message(&self) -> bool {
        self.incoming.is_some()
    }

    /// Forget any partially assembled message.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Consume every event of `batch`. Must run before the batch's buffer
    /// is reused, since body bytes are passed on by reference.
    pub fn consume<H: MessageHandler>(&mut self, batch: &Batch<'_, '_>, handler: &mut H) {
        let text = |span| {
            batch
                .resolve(span)
                .map(|bytes| String::from_utf8_lossy(bytes).into_owned())
                .unwrap_or_default()
        };

        for event in batch {
            match *event {
                Event::MessageStart(start) => {
                    self.reset();
                    let mut message = IncomingMessage::default();
                    match start {
                        MessageStart::Request(RequestMethod::Known(method)) => {
                            message.method = Some(method);
                            message.method_name = Some(method.as_str().to_string());
                        }
                        MessageStart::Request(RequestMethod::Unknown(span)) => {
                            message.method_name = Some(text(span));
                        }
                        MessageStart::Response { status } => message.status = Some(status),
                    }
                    self.incoming = Some(message);
                }
                Event::Version { major, minor } => {
                    if let Some(message) = self.incoming.as_mut() {
                        message.version = (major, minor);
                    }
                }
                Event::Url(span) => {
                    if let Some(message) = self.incoming.as_mut() {
                        message.url.push_str(&text(span));
                    }
                }
                // Components are derivable from the URL
                Event::Path(_) | Event::QueryString(_) | Event::Fragment(_) => {}
                Event::HeaderField(span) => {
                    if self.value.is_some() {
                        self.add_header();
                    }
                    let name = text(span).to_ascii_lowercase();
                    self.field.get_or_insert_with(String::new).push_str(&name);
                }
                Event::HeaderValue(span) => {
                    let piece = text(span);
                    match self.value.as_mut() {
                        // obs-fold continuation
                        Some(value) => {
                            if !value.is_empty() && !piece.is_empty() {
                                value.push(' ');
                            }
                            value.push_str(&piece);
                        }
                        None => self.value = Some(piece),
                    }
                }
                Event::HeadersEnd(flags) => {
                    self.add_header();
                    self.headers_complete = true;
                    if let Some(message) = self.incoming.as_mut() {
                        message.flags = flags;
                        handler.on_message_begin(message);
                    }
                }
                Event::Body(span) => {
                    if let (Some(message), Some(bytes)) = (self.incoming.as_ref(), batch.resolve(span)) {
                        handler.on_body(bytes, message);
                    }
                }
                Event::MessageEnd { .. } => {
                    self.add_header();
                    if let Some(message) = self.incoming.take() {
                        handler.on_message_end(message);
                    }
                    self.reset();
                }
                Event::ParseError { at, code } => {
                    self.reset();
                    handler.on_error(at, code);
                }
                Event::NeedsInput { .. } | Event::BatchExhausted { .. } => {}
            }
        }
    }

    fn add_header(&mut self) {
        let Some(field) = self.field.take() else {
            self.value = None;
            return;
        };
        let value = self.value.take().unwrap_or_default();
        if let Some(message) = self.incoming.as_mut() {
            if self.headers_complete {
                message.trailers.push((field, value));
            } else {
                message.headers.push((field, value));
            }
        }
    }
}

/// A session plus the drain loop, fed with successive reads.
///
/// ```
/// use httpev_core::{Direction, HttpStream, IncomingMessage, MessageHandler};
///
/// #[derive(Default)]
/// struct Collect(Vec<IncomingMessage>);
///
/// impl MessageHandler for Collect {
///     fn on_message_end(&mut self, message: IncomingMessage) {
///         self.0.push(message);
///     }
/// }
///
/// let mut stream = HttpStream::new(Direction::Request, Collect::default());
/// stream.feed(b"GET /blah HTTP/1.1\r\nhel").unwrap();
/// stream.feed(b"lo: world\r\n\r\n").unwrap();
/// let messages = stream.into_handler().0;
/// assert_eq!(messages[0].url, "/blah");
/// assert_eq!(messages[0].header("hello"), Some("world"));
/// ```
#[derive(Debug)]
pub struct HttpStream<H> {
    session: ParserSession,
    assembler: MessageAssembler,
    handler: H,
    /// Incomplete token held back from the previous read
    tail: Vec<u8>,
    /// Bytes of the switched-to protocol, once the session upgraded
    upgraded: Vec<u8>,
    /// Reads received while paused
    waiting: VecDeque<Vec<u8>>,
    paused: bool,
}

impl<H: MessageHandler> HttpStream<H> {
    pub fn new(direction: Direction, handler: H) -> Self {
        Self::from_session(ParserSession::new(direction), handler)
    }

    pub fn with_config(direction: Direction, config: ParserConfig, handler: H) -> Result<Self> {
        Ok(Self::from_session(
            ParserSession::with_config(direction, config)?,
            handler,
        ))
    }

    pub fn from_session(session: ParserSession, handler: H) -> Self {
        Self {
            session,
            assembler: MessageAssembler::new(),
            handler,
            tail: Vec::new(),
            upgraded: Vec::new(),
            waiting: VecDeque::new(),
            paused: false,
        }
    }

    /// Parse one read. Queued instead while paused; collected for
    /// [`take_upgraded`](Self::take_upgraded) once the connection upgraded.
    pub fn feed(&mut self, data: &[u8]) -> Result<()> {
        if self.paused {
            self.waiting.push_back(data.to_vec());
            return Ok(());
        }
        if self.session.is_upgraded() {
            self.upgraded.extend_from_slice(data);
            return Ok(());
        }
        if data.is_empty() {
            return Ok(());
        }
        if self.tail.is_empty() {
            self.drain(data)
        } else {
            let mut joined = std::mem::take(&mut self.tail);
            joined.extend_from_slice(data);
            self.drain(&joined)
        }
    }

    /// Execute until `buf` is consumed or only an incomplete token is left.
    fn drain(&mut self, buf: &[u8]) -> Result<()> {
        let mut offset = 0;
        while offset < buf.len() {
            let batch = self.session.execute(buf, offset, buf.len() - offset)?;
            self.assembler.consume(&batch, &mut self.handler);
            match batch.terminal().copied() {
                Some(Event::BatchExhausted { at }) => offset = at,
                Some(Event::NeedsInput { at }) => {
                    if self.session.is_upgraded() {
                        log::debug!("upgraded with {} protocol bytes pending", buf.len() - at);
                        self.upgraded.extend_from_slice(&buf[at..]);
                    } else {
                        self.tail.extend_from_slice(&buf[at..]);
                    }
                    return Ok(());
                }
                _ => return Ok(()),
            }
        }
        Ok(())
    }

    /// Signal end of input: completes read-until-close bodies, reports a
    /// truncated message as an error.
    pub fn finish(&mut self) -> Result<()> {
        self.resume()?;
        self.tail.clear();
        if self.session.is_upgraded() {
            return Ok(());
        }
        let batch = self.session.finish()?;
        self.assembler.consume(&batch, &mut self.handler);
        Ok(())
    }

    /// Stop parsing; further reads are queued.
    pub fn pause(&mut self) {
        self.paused = true;
    }

    /// Parse queued reads in order.
    pub fn resume(&mut self) -> Result<()> {
        self.paused = false;
        while let Some(data) = self.waiting.pop_front() {
            self.feed(&data)?;
        }
        Ok(())
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Bytes received after an upgrade or CONNECT head, in order.
    ///
    /// `None` until the session upgrades. Later reads accumulate again and
    /// can be taken by another call.
    pub fn take_upgraded(&mut self) -> Option<Vec<u8>> {
        if self.session.is_upgraded() {
            Some(std::mem::take(&mut self.upgraded))
        } else {
            None
        }
    }

    /// Start over, e.g. after an error or to switch direction.
    pub fn reinitialize(&mut self, direction: Direction) {
        self.session.reinitialize(direction);
        self.assembler.reset();
        self.tail.clear();
        self.upgraded.clear();
        self.waiting.clear();
        self.paused = false;
    }

    pub fn session(&self) -> &ParserSession {
        &self.session
    }

    pub fn handler(&self) -> &H {
        &self.handler
    }

    pub fn handler_mut(&mut self) -> &mut H {
        &mut self.handler
    }

    pub fn into_handler(self) -> H {
        self.handler
    }
}
