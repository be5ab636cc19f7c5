//! Parser sessions.
//!
//! A [`ParserSession`] is one direction-bound parsing context, typically one
//! per connection. It owns its grammar engine and its event batch, so
//! independent sessions share nothing and can run on different threads.

use std::str::FromStr;

use crate::batch::{Batch, DrainState, EventBatch};
use crate::config::{ParserConfig, MIN_BATCH_CAPACITY};
use crate::engine::{GrammarEngine, HaltReason, Http1Engine, Window};
use crate::error::{Error, Result};
use crate::event::Event;

/// Which start line the session expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Request,
    Response,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Request => "request",
            Direction::Response => "response",
        }
    }
}

impl FromStr for Direction {
    type Err = Error;

    /// Accepts `"request"` or `"response"` in any letter case.
    fn from_str(s: &str) -> Result<Self> {
        if s.eq_ignore_ascii_case("request") {
            Ok(Direction::Request)
        } else if s.eq_ignore_ascii_case("response") {
            Ok(Direction::Response)
        } else {
            Err(Error::InvalidArgument(format!(
                "direction must be 'request' or 'response', got {:?}",
                s
            )))
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

fn to_i64(n: usize) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}

/// Check that `[offset, offset + length)` is a valid window of `buffer_len`.
///
/// An offset equal to `buffer_len` is allowed only with a zero length.
pub fn check_bounds(buffer_len: usize, offset: usize, length: usize) -> Result<()> {
    let in_range = if length == 0 {
        offset <= buffer_len
    } else {
        offset < buffer_len && offset.checked_add(length).is_some_and(|end| end <= buffer_len)
    };
    if in_range {
        Ok(())
    } else {
        Err(Error::OutOfBounds {
            offset: to_i64(offset),
            length: to_i64(length),
            buffer_len,
        })
    }
}

/// Stateful, direction-bound parsing context.
///
/// ```
/// use httpev_core::{Direction, Event, ParserSession};
///
/// let mut session = ParserSession::new(Direction::Request);
/// let buf = b"GET /a HTTP/1.1\r\n\r\n";
/// let batch = session.execute(buf, 0, buf.len()).unwrap();
/// for event in &batch {
///     if let Event::Url(span) = event {
///         assert_eq!(batch.resolve(*span), Some(&b"/a"[..]));
///     }
/// }
/// assert!(batch.is_complete());
/// ```
#[derive(Debug)]
pub struct ParserSession<E: GrammarEngine = Http1Engine> {
    direction: Direction,
    config: ParserConfig,
    engine: E,
    batch: EventBatch,
    state: DrainState,
    /// Position of the last `ParseError`, until reinitialized
    errored_at: Option<usize>,
}

impl ParserSession<Http1Engine> {
    /// Session with the default configuration. Always succeeds.
    pub fn new(direction: Direction) -> Self {
        let config = ParserConfig::default();
        let engine = Http1Engine::new(direction, &config);
        let batch = EventBatch::new(config.batch_capacity);
        log::debug!("new {} session, batch capacity {}", direction, batch.capacity());
        Self::assemble(direction, config, engine, batch)
    }

    /// Session with a custom configuration.
    pub fn with_config(direction: Direction, config: ParserConfig) -> Result<Self> {
        config.validate()?;
        let engine = Http1Engine::new(direction, &config);
        Self::with_engine(direction, config, engine)
    }

    /// Session reusing a batch from a retired session.
    ///
    /// The batch's capacity takes precedence over `config.batch_capacity`.
    pub fn with_batch(direction: Direction, config: ParserConfig, batch: EventBatch) -> Result<Self> {
        let config = config.batch_capacity(batch.capacity());
        config.validate()?;
        let engine = Http1Engine::new(direction, &config);
        log::debug!("new {} session on recycled batch of {}", direction, batch.capacity());
        Ok(Self::assemble(direction, config, engine, batch))
    }
}

impl<E: GrammarEngine> ParserSession<E> {
    /// Session driving a custom grammar engine.
    pub fn with_engine(direction: Direction, config: ParserConfig, mut engine: E) -> Result<Self> {
        config.validate()?;
        engine.reset(direction, &config);
        let batch = EventBatch::new(config.batch_capacity);
        log::debug!("new {} session, batch capacity {}", direction, batch.capacity());
        Ok(Self::assemble(direction, config, engine, batch))
    }

    fn assemble(direction: Direction, config: ParserConfig, engine: E, batch: EventBatch) -> Self {
        debug_assert!(batch.capacity() >= MIN_BATCH_CAPACITY);
        Self {
            direction,
            config,
            engine,
            batch,
            state: DrainState::Idle,
            errored_at: None,
        }
    }

    /// Discard all parse state and start over expecting `direction`.
    ///
    /// Valid in every state, including after a `ParseError` or an upgrade.
    pub fn reinitialize(&mut self, direction: Direction) {
        log::debug!("reinitialize {} -> {}", self.direction, direction);
        self.direction = direction;
        self.engine.reset(direction, &self.config);
        self.batch.clear();
        self.state = DrainState::Idle;
        self.errored_at = None;
    }

    /// Parse `buffer[offset..offset + length]`.
    ///
    /// The returned [`Batch`] borrows both the session and `buffer`; drop it
    /// before the next call. A zero `length` signals end of input.
    ///
    /// # Errors
    ///
    /// - [`Error::OutOfBounds`] if the range does not fit the buffer, checked
    ///   before any session state
    /// - [`Error::SessionErrored`] after a `ParseError` until `reinitialize`
    /// - [`Error::Upgraded`] once the connection switched protocols
    pub fn execute<'s, 'b>(
        &'s mut self,
        buffer: &'b [u8],
        offset: usize,
        length: usize,
    ) -> Result<Batch<'s, 'b>> {
        if let Err(err) = check_bounds(buffer.len(), offset, length) {
            log::warn!("rejected execute: {}", err);
            return Err(err);
        }
        if let Some(at) = self.errored_at {
            log::warn!("execute on errored {} session (error at {})", self.direction, at);
            return Err(Error::SessionErrored { at });
        }
        if self.engine.is_upgraded() {
            log::warn!("execute on upgraded {} session", self.direction);
            return Err(Error::Upgraded);
        }

        self.state = DrainState::Filling;
        let window = Window::new(&buffer[offset..offset + length], offset);
        let halt = {
            let mut sink = self.batch.sink();
            self.engine.execute(window, &mut sink)
        };
        let consumed = halt.consumed.min(length);
        let resume = offset + consumed;

        let terminal = match halt.reason {
            HaltReason::NeedsInput => {
                self.state = DrainState::Complete;
                Event::NeedsInput { at: resume }
            }
            HaltReason::BatchFull => {
                self.state = DrainState::Overflowed;
                Event::BatchExhausted { at: resume }
            }
            HaltReason::Error { at, code } => {
                let at = offset + at;
                log::warn!("{} parse error at byte {}: {}", self.direction, at, code);
                self.state = DrainState::Errored;
                self.errored_at = Some(at);
                Event::ParseError { at, code }
            }
        };
        self.batch.terminate(terminal);

        log::trace!(
            "execute [{}, {}) consumed {} events {} -> {:?}",
            offset,
            offset + length,
            consumed,
            self.batch.len(),
            self.state
        );
        Ok(Batch::new(self.batch.as_slice(), buffer, offset, consumed))
    }

    /// Signal end of input. Same as executing a zero-length window.
    pub fn finish(&mut self) -> Result<Batch<'_, 'static>> {
        self.execute(&[], 0, 0)
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn config(&self) -> &ParserConfig {
        &self.config
    }

    /// Outcome of the last call (`Idle` before the first one).
    pub fn drain_state(&self) -> DrainState {
        self.state
    }

    /// True once an upgrade or CONNECT handed the connection over.
    pub fn is_upgraded(&self) -> bool {
        self.engine.is_upgraded()
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Retire the session, keeping its batch for another one.
    pub fn into_batch(mut self) -> EventBatch {
        self.batch.clear();
        self.batch
    }
}
