//! Error types for httpev-core
//!
//! Only input-contract and lifecycle violations are errors. Grammar
//! violations are reported in-band as [`Event::ParseError`](crate::Event).

use thiserror::Error;

/// Result type alias for httpev operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors returned synchronously to the caller of a session operation.
///
/// None of these touch session state; the call can be corrected and retried.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// `offset`/`length` do not describe a range inside the buffer
    #[error("range {offset}+{length} is out of bounds for buffer of {buffer_len} bytes")]
    OutOfBounds {
        offset: i64,
        length: i64,
        buffer_len: usize,
    },

    /// Host passed something other than a byte buffer
    #[error("argument should be a buffer")]
    TypeMismatch,

    /// Host passed an unrecognised argument (e.g. a direction string)
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Rejected `ParserConfig`
    #[error("invalid config: {0}")]
    InvalidConfig(String),

    /// `execute` after a `ParseError` without `reinitialize`
    #[error("session errored at byte {at}; reinitialize before executing")]
    SessionErrored { at: usize },

    /// `execute` after the connection switched protocols
    #[error("session upgraded; remaining bytes belong to the new protocol")]
    Upgraded,
}
