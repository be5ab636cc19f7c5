//! C ABI for httpev.
//!
//! Sessions are opaque heap handles. `httpev_execute` writes fixed-size
//! [`HttpevEvent`] records into a caller-owned array; `httpev_execute_json`
//! returns the same events as a JSON array of `[tag, a, b]` triples for
//! hosts that would rather not deal with structs.
//!
//! Functions returning `i32` use `0`/positive for success and one of the
//! negative `HTTPEV_ERR_*` codes on failure. The message of the most recent
//! failure on the calling thread is available from [`httpev_last_error`].

#![allow(clippy::missing_safety_doc)]

use std::cell::RefCell;
use std::ffi::{c_char, CStr, CString};
use std::ptr;

use serde::Serialize;

use httpev_core::host::{HostEvent, HostField};
use httpev_core::{Direction, Error, Event, MessageStart, ParserConfig, ParserSession, RequestMethod};

pub const HTTPEV_ERR_OUT_OF_BOUNDS: i32 = -1;
pub const HTTPEV_ERR_TYPE_MISMATCH: i32 = -2;
pub const HTTPEV_ERR_INVALID_ARGUMENT: i32 = -3;
pub const HTTPEV_ERR_INVALID_CONFIG: i32 = -4;
pub const HTTPEV_ERR_SESSION_ERRORED: i32 = -5;
pub const HTTPEV_ERR_UPGRADED: i32 = -6;
/// Output array shorter than the session's batch capacity
pub const HTTPEV_ERR_OUTPUT_TOO_SMALL: i32 = -7;

// Event tags for `HttpevEvent::tag`.
pub const HTTPEV_ERROR: u8 = 0;
pub const HTTPEV_NEEDS_INPUT: u8 = 1;
pub const HTTPEV_NEEDS_DATA_ELEMENTS: u8 = 2;
pub const HTTPEV_REQ_MESSAGE_START: u8 = 3;
pub const HTTPEV_RES_MESSAGE_START: u8 = 4;
pub const HTTPEV_VERSION: u8 = 5;
pub const HTTPEV_PATH: u8 = 6;
pub const HTTPEV_QUERY_STRING: u8 = 7;
pub const HTTPEV_FRAGMENT: u8 = 8;
pub const HTTPEV_URL: u8 = 9;
pub const HTTPEV_HEADER_FIELD: u8 = 10;
pub const HTTPEV_HEADER_VALUE: u8 = 11;
pub const HTTPEV_HEADERS_END: u8 = 12;
pub const HTTPEV_BODY: u8 = 13;
pub const HTTPEV_MESSAGE_END: u8 = 14;

/// Opaque session handle.
pub struct HttpevSession {
    inner: ParserSession,
}

/// One event as a tagged pair of integers.
///
/// | tag                 | a                             | b            |
/// |---------------------|-------------------------------|--------------|
/// | `ERROR`             | error offset                  | error code   |
/// | `NEEDS_INPUT`       | resume offset                 | 0            |
/// | `NEEDS_DATA_ELEMENTS` | resume offset               | 0            |
/// | `REQ_MESSAGE_START` | method code, `-1` if unknown  | token offset if unknown, else 0 |
/// | `RES_MESSAGE_START` | status                        | 0            |
/// | `VERSION`           | major                         | minor        |
/// | span events         | offset                        | length       |
/// | `HEADERS_END`       | keep-alive (0/1)              | upgrade (0/1)|
/// | `MESSAGE_END`       | end offset                    | 0            |
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HttpevEvent {
    pub tag: u8,
    pub a: i64,
    pub b: i64,
}

fn int(n: usize) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}

impl From<&Event> for HttpevEvent {
    fn from(event: &Event) -> Self {
        let (tag, a, b) = match *event {
            Event::ParseError { at, code } => (HTTPEV_ERROR, int(at), i64::from(code as u8)),
            Event::NeedsInput { at } => (HTTPEV_NEEDS_INPUT, int(at), 0),
            Event::BatchExhausted { at } => (HTTPEV_NEEDS_DATA_ELEMENTS, int(at), 0),
            Event::MessageStart(MessageStart::Request(method)) => {
                let (code, token) = match method {
                    RequestMethod::Known(m) => (i64::from(m as u8), 0),
                    RequestMethod::Unknown(span) => (-1, int(span.offset)),
                };
                (HTTPEV_REQ_MESSAGE_START, code, token)
            }
            Event::MessageStart(MessageStart::Response { status }) => {
                (HTTPEV_RES_MESSAGE_START, i64::from(status), 0)
            }
            Event::Version { major, minor } => (HTTPEV_VERSION, i64::from(major), i64::from(minor)),
            Event::Path(s) => (HTTPEV_PATH, int(s.offset), int(s.len)),
            Event::QueryString(s) => (HTTPEV_QUERY_STRING, int(s.offset), int(s.len)),
            Event::Fragment(s) => (HTTPEV_FRAGMENT, int(s.offset), int(s.len)),
            Event::Url(s) => (HTTPEV_URL, int(s.offset), int(s.len)),
            Event::HeaderField(s) => (HTTPEV_HEADER_FIELD, int(s.offset), int(s.len)),
            Event::HeaderValue(s) => (HTTPEV_HEADER_VALUE, int(s.offset), int(s.len)),
            Event::HeadersEnd(flags) => (
                HTTPEV_HEADERS_END,
                i64::from(flags.keep_alive),
                i64::from(flags.upgrade),
            ),
            Event::Body(s) => (HTTPEV_BODY, int(s.offset), int(s.len)),
            Event::MessageEnd { at } => (HTTPEV_MESSAGE_END, int(at), 0),
        };
        HttpevEvent { tag, a, b }
    }
}

/// `[tag, a, b]` in the JSON encoding.
#[derive(Serialize)]
struct Triple(&'static str, HostField, HostField);

impl From<HostEvent> for Triple {
    fn from(event: HostEvent) -> Self {
        Triple(event.tag, event.a, event.b)
    }
}

thread_local! {
    static LAST_ERROR: RefCell<Option<CString>> = const { RefCell::new(None) };
}

fn error_code(err: &Error) -> i32 {
    match err {
        Error::OutOfBounds { .. } => HTTPEV_ERR_OUT_OF_BOUNDS,
        Error::TypeMismatch => HTTPEV_ERR_TYPE_MISMATCH,
        Error::InvalidArgument(_) => HTTPEV_ERR_INVALID_ARGUMENT,
        Error::InvalidConfig(_) => HTTPEV_ERR_INVALID_CONFIG,
        Error::SessionErrored { .. } => HTTPEV_ERR_SESSION_ERRORED,
        Error::Upgraded => HTTPEV_ERR_UPGRADED,
    }
}

fn set_last_error(message: String) {
    log::debug!("ffi error: {}", message);
    let message = CString::new(message).unwrap_or_default();
    LAST_ERROR.with(|slot| *slot.borrow_mut() = Some(message));
}

/// Record `err` and return its code.
fn fail(err: Error) -> i32 {
    let code = error_code(&err);
    set_last_error(err.to_string());
    code
}

unsafe fn read_str<'a>(s: *const c_char) -> Result<&'a str, Error> {
    if s.is_null() {
        return Err(Error::TypeMismatch);
    }
    CStr::from_ptr(s)
        .to_str()
        .map_err(|e| Error::InvalidArgument(format!("not UTF-8: {}", e)))
}

unsafe fn read_direction(direction: *const c_char) -> Result<Direction, Error> {
    read_str(direction)?.parse()
}

/// Null `buffer` is a type mismatch; negative offsets or lengths are out of
/// bounds.
unsafe fn read_buffer<'a>(buffer: *const u8, buffer_len: usize) -> Result<&'a [u8], Error> {
    if buffer.is_null() {
        return Err(Error::TypeMismatch);
    }
    Ok(std::slice::from_raw_parts(buffer, buffer_len))
}

fn window(offset: i64, length: i64, buffer_len: usize) -> Result<(usize, usize), Error> {
    let out_of_bounds = || Error::OutOfBounds {
        offset,
        length,
        buffer_len,
    };
    let offset = usize::try_from(offset).map_err(|_| out_of_bounds())?;
    let length = usize::try_from(length).map_err(|_| out_of_bounds())?;
    Ok((offset, length))
}

fn into_handle(session: ParserSession) -> *mut HttpevSession {
    Box::into_raw(Box::new(HttpevSession { inner: session }))
}

/// New session for `"request"` or `"response"`. Null on failure.
#[no_mangle]
pub unsafe extern "C" fn httpev_session_new(direction: *const c_char) -> *mut HttpevSession {
    match read_direction(direction) {
        Ok(direction) => into_handle(ParserSession::new(direction)),
        Err(err) => {
            fail(err);
            ptr::null_mut()
        }
    }
}

/// New session configured from a JSON object with any of `batch_capacity`,
/// `max_line_len`, `max_headers`, `url_components`. Null on failure.
#[no_mangle]
pub unsafe extern "C" fn httpev_session_new_with_config(
    direction: *const c_char,
    config_json: *const c_char,
) -> *mut HttpevSession {
    let result = read_direction(direction).and_then(|direction| {
        let json = read_str(config_json)?;
        let config: ParserConfig = serde_json::from_str(json)
            .map_err(|e| Error::InvalidConfig(e.to_string()))?;
        ParserSession::with_config(direction, config)
    });
    match result {
        Ok(session) => into_handle(session),
        Err(err) => {
            fail(err);
            ptr::null_mut()
        }
    }
}

#[no_mangle]
pub unsafe extern "C" fn httpev_session_free(session: *mut HttpevSession) {
    if !session.is_null() {
        drop(Box::from_raw(session));
    }
}

/// Reset `session` to expect `direction`.
#[no_mangle]
pub unsafe extern "C" fn httpev_session_reinitialize(
    session: *mut HttpevSession,
    direction: *const c_char,
) -> i32 {
    let Some(session) = session.as_mut() else {
        return fail(Error::TypeMismatch);
    };
    match read_direction(direction) {
        Ok(direction) => {
            session.inner.reinitialize(direction);
            0
        }
        Err(err) => fail(err),
    }
}

/// Minimum length of the `out` array for `httpev_execute`.
#[no_mangle]
pub unsafe extern "C" fn httpev_session_batch_capacity(session: *const HttpevSession) -> usize {
    session.as_ref().map_or(0, |s| s.inner.config().batch_capacity)
}

/// Parse `buffer[offset..offset + length]`, writing events to `out`.
///
/// `out` must hold at least `httpev_session_batch_capacity` records.
/// Returns the number of events written.
#[no_mangle]
pub unsafe extern "C" fn httpev_execute(
    session: *mut HttpevSession,
    buffer: *const u8,
    buffer_len: usize,
    offset: i64,
    length: i64,
    out: *mut HttpevEvent,
    out_cap: usize,
) -> i32 {
    let Some(session) = session.as_mut() else {
        return fail(Error::TypeMismatch);
    };
    if out.is_null() || out_cap < session.inner.config().batch_capacity {
        set_last_error(format!(
            "output array must hold {} events",
            session.inner.config().batch_capacity
        ));
        return HTTPEV_ERR_OUTPUT_TOO_SMALL;
    }
    let result = read_buffer(buffer, buffer_len).and_then(|buf| {
        let (offset, length) = window(offset, length, buf.len())?;
        let batch = session.inner.execute(buf, offset, length)?;
        let out = std::slice::from_raw_parts_mut(out, out_cap);
        for (slot, event) in out.iter_mut().zip(batch.iter()) {
            *slot = HttpevEvent::from(event);
        }
        Ok(batch.len())
    });
    match result {
        Ok(count) => i32::try_from(count).unwrap_or(i32::MAX),
        Err(err) => fail(err),
    }
}

/// Parse like `httpev_execute` and return the events as a JSON string.
/// Null on failure. Release with `httpev_string_free`.
#[no_mangle]
pub unsafe extern "C" fn httpev_execute_json(
    session: *mut HttpevSession,
    buffer: *const u8,
    buffer_len: usize,
    offset: i64,
    length: i64,
) -> *mut c_char {
    let Some(session) = session.as_mut() else {
        fail(Error::TypeMismatch);
        return ptr::null_mut();
    };
    let buffer = match read_buffer(buffer, buffer_len) {
        Ok(buf) => Some(buf),
        Err(err) => {
            fail(err);
            return ptr::null_mut();
        }
    };
    let events = match httpev_core::host::execute_host(&mut session.inner, buffer, offset, length) {
        Ok(events) => events,
        Err(err) => {
            fail(err);
            return ptr::null_mut();
        }
    };
    let triples: Vec<Triple> = events.into_iter().map(Triple::from).collect();
    match serde_json::to_string(&triples).map(CString::new) {
        Ok(Ok(json)) => json.into_raw(),
        _ => {
            set_last_error("failed to encode events".to_string());
            ptr::null_mut()
        }
    }
}

#[no_mangle]
pub unsafe extern "C" fn httpev_string_free(s: *mut c_char) {
    if !s.is_null() {
        drop(CString::from_raw(s));
    }
}

/// Message of the last failure on this thread, or null. Valid until the
/// next failing call on the same thread.
#[no_mangle]
pub extern "C" fn httpev_last_error() -> *const c_char {
    LAST_ERROR.with(|slot| slot.borrow().as_ref().map_or(ptr::null(), |s| s.as_ptr()))
}
