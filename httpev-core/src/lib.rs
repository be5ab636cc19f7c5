//! httpev Core
//!
//! Incremental HTTP/1.x parsing adapter. A [`ParserSession`] is fed windows
//! of a caller-owned buffer and answers each call with a bounded batch of
//! typed events whose spans point back into that buffer. Nothing is copied.
//!
//! # Architecture
//!
//! - **session.rs** - `ParserSession`, `Direction`, bounds checking
//! - **engine/** - `GrammarEngine` seam and the built-in `Http1Engine`
//! - **batch.rs** - Per-session event storage, the borrowed `Batch` view, drain states
//! - **event.rs** - `Event` enum, parse error codes, message flags
//! - **method.rs** - Request method enumeration (phf lookup)
//! - **span.rs** - `ByteSpan` offsets into the caller's buffer
//! - **config.rs** - `ParserConfig` limits
//! - **host.rs** - `(tag, a, b)` tuple encoding for dynamic hosts
//! - **assemble.rs** - `MessageAssembler` and `HttpStream` reference consumers

pub mod assemble;
pub mod batch;
pub mod config;
pub mod engine;
pub mod error;
pub mod event;
pub mod host;
pub mod method;
pub mod session;
pub mod span;

pub use assemble::{HttpStream, IncomingMessage, MessageAssembler, MessageHandler};
pub use batch::{Batch, DrainState, EventBatch, EventSink};
pub use config::{ParserConfig, MAX_EVENTS_PER_STEP, MIN_BATCH_CAPACITY};
pub use engine::{GrammarEngine, Halt, HaltReason, Http1Engine, Window};
pub use error::{Error, Result};
pub use event::{Event, MessageFlags, MessageStart, ParseErrorCode, RequestMethod};
pub use method::Method;
pub use session::{Direction, ParserSession};
pub use span::ByteSpan;
