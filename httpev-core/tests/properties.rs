//! Property-based tests for the session contract
//!
//! These hold for ANY input, not just well-formed messages: proptest
//! generates arbitrary buffers and windows and shrinks failures to
//! minimal cases.

mod common;

use common::{collect, Feed};
use httpev_core::{
    Direction, DrainState, Error, Event, ParserConfig, ParserSession, MIN_BATCH_CAPACITY,
};
use proptest::prelude::*;

fn config() -> ProptestConfig {
    ProptestConfig {
        cases: 256,
        max_shrink_iters: 200,
        ..ProptestConfig::default()
    }
}

fn direction() -> impl Strategy<Value = Direction> {
    prop_oneof![Just(Direction::Request), Just(Direction::Response)]
}

/// Input that leaves a fresh session idle, errored, or upgraded
fn session_history() -> impl Strategy<Value = Option<&'static [u8]>> {
    prop_oneof![
        Just(None),
        Just(Some(&b"GET\r\n"[..])),
        Just(Some(&b"CONNECT h:443 HTTP/1.1\r\n\r\n"[..])),
    ]
}

/// Bytes that look enough like HTTP to get past the start line often
fn http_like() -> impl Strategy<Value = Vec<u8>> {
    let piece = prop_oneof![
        Just(b"GET / HTTP/1.1\r\n".to_vec()),
        Just(b"HTTP/1.1 200 OK\r\n".to_vec()),
        Just(b"Content-Length: 3\r\n".to_vec()),
        Just(b"Transfer-Encoding: chunked\r\n".to_vec()),
        Just(b"Connection: upgrade\r\nUpgrade: x\r\n".to_vec()),
        Just(b"3\r\nabc\r\n0\r\n".to_vec()),
        Just(b"\r\n".to_vec()),
        Just(b" ".to_vec()),
        Just(b":".to_vec()),
        prop::collection::vec(any::<u8>(), 0..8),
    ];
    prop::collection::vec(piece, 0..12).prop_map(|pieces| pieces.concat())
}

/// Well-formed request with random extension headers and body
fn request() -> impl Strategy<Value = Vec<u8>> {
    (
        "(GET|POST|PUT|PURGE|M-SEARCH)",
        "/[a-z0-9/?=&#]{0,12}",
        prop::collection::vec(("[A-Za-z][A-Za-z0-9-]{0,8}", "[!-~]{0,12}"), 0..5),
        prop::collection::vec(any::<u8>(), 0..40),
    )
        .prop_map(|(method, path, headers, body)| {
            let mut out = format!("{} {} HTTP/1.1\r\n", method, path).into_bytes();
            for (name, value) in headers {
                out.extend_from_slice(format!("X-{}: {}\r\n", name, value).as_bytes());
            }
            out.extend_from_slice(format!("Content-Length: {}\r\n\r\n", body.len()).as_bytes());
            out.extend_from_slice(&body);
            out
        })
}

fn window_in(len: usize) -> impl Strategy<Value = (usize, usize)> {
    (0..=len).prop_flat_map(move |offset| (Just(offset), 0..=len - offset))
}

proptest! {
    #![proptest_config(config())]

    // =========================================================================
    // Bounds Safety
    // =========================================================================

    #[test]
    fn out_of_range_windows_are_rejected(
        buffer in prop::collection::vec(any::<u8>(), 0..64),
        offset in 0usize..80,
        length in 0usize..80,
        history in session_history(),
    ) {
        let mut session = ParserSession::new(Direction::Request);
        if let Some(prefix) = history {
            prop_assert!(session.execute(prefix, 0, prefix.len()).is_ok());
        }
        let before = session.drain_state();
        let len = buffer.len();
        let valid = if length == 0 { offset <= len } else { offset < len && offset + length <= len };
        match session.execute(&buffer, offset, length) {
            Ok(_) => prop_assert!(valid, "accepted {}+{} of {}", offset, length, len),
            Err(Error::OutOfBounds { .. }) => {
                prop_assert!(!valid);
                prop_assert_eq!(session.drain_state(), before);
            }
            Err(Error::SessionErrored { .. }) | Err(Error::Upgraded) => {
                prop_assert!(valid, "lifecycle error for {}+{} of {}", offset, length, len);
                prop_assert!(history.is_some());
            }
            Err(other) => prop_assert!(false, "unexpected error {:?}", other),
        }
    }

    // =========================================================================
    // Span Validity
    // =========================================================================

    #[test]
    fn spans_stay_inside_the_window(
        dir in direction(),
        (buffer, (offset, length)) in http_like().prop_flat_map(|b| {
            let len = b.len();
            (Just(b), window_in(len))
        }),
    ) {
        let mut session = ParserSession::new(dir);
        let batch = session.execute(&buffer, offset, length).unwrap();
        let end = offset + length;
        for event in &batch {
            if let Some(span) = event.span() {
                prop_assert!(span.offset >= offset && span.end() <= end, "{:?} outside {}..{}", event, offset, end);
                prop_assert!(batch.resolve(span).is_some());
            }
            match *event {
                Event::NeedsInput { at } | Event::BatchExhausted { at } => {
                    prop_assert!(at >= offset && at <= end)
                }
                Event::ParseError { at, .. } => prop_assert!(at >= offset && at <= end),
                _ => {}
            }
        }
        prop_assert!(batch.terminal().is_some_and(Event::is_terminal));
        prop_assert_eq!(batch.events().iter().filter(|e| e.is_terminal()).count(), 1);
    }

    // =========================================================================
    // Never Panics
    // =========================================================================

    #[test]
    fn arbitrary_bytes_never_panic(
        dir in direction(),
        buffer in prop::collection::vec(any::<u8>(), 0..256),
        capacity in MIN_BATCH_CAPACITY..20usize,
    ) {
        let feed = Feed::split_at(Vec::new(), capacity);
        collect(dir, &ParserConfig::default(), &buffer, &feed, true);
    }

    #[test]
    fn http_like_bytes_never_panic(dir in direction(), buffer in http_like()) {
        let feed = Feed::split_at(Vec::new(), MIN_BATCH_CAPACITY);
        let config = ParserConfig::default().url_components(true).max_line_len(64);
        collect(dir, &config, &buffer, &feed, true);
    }

    // =========================================================================
    // Chunking Invariance And Drain Completeness
    // =========================================================================

    #[test]
    fn chunking_does_not_change_events(
        input in request(),
        mut splits in prop::collection::vec(0usize..200, 0..6),
        capacity in MIN_BATCH_CAPACITY..16usize,
    ) {
        splits.sort_unstable();
        let config = ParserConfig::default().url_components(true);
        let whole = collect(Direction::Request, &config, &input, &Feed::whole(), false);
        prop_assert_eq!(whole.last().map(String::as_str), Some("MessageEnd"));
        let split = collect(Direction::Request, &config, &input, &Feed::split_at(splits, capacity), false);
        prop_assert_eq!(split, whole);
    }

    #[test]
    fn arbitrary_input_is_chunking_invariant(
        dir in direction(),
        input in http_like(),
        split in 0usize..128,
    ) {
        let config = ParserConfig::default();
        let whole = collect(dir, &config, &input, &Feed::whole(), true);
        let halves = collect(dir, &config, &input, &Feed::split_at(vec![split], 1000), true);
        prop_assert_eq!(halves, whole);
    }

    // =========================================================================
    // Reinitialize
    // =========================================================================

    #[test]
    fn reinitialize_forgets_everything(prefix in http_like(), input in request()) {
        let mut session = ParserSession::new(Direction::Response);
        let _ = session.execute(&prefix, 0, prefix.len());
        session.reinitialize(Direction::Request);
        prop_assert_eq!(session.drain_state(), DrainState::Idle);

        let mut fresh = ParserSession::new(Direction::Request);
        let a = session.execute(&input, 0, input.len()).unwrap().events().to_vec();
        let b = fresh.execute(&input, 0, input.len()).unwrap().events().to_vec();
        prop_assert_eq!(a, b);
    }
}
