//! Reference host loop and event normalisation
//!
//! `collect` plays the host: it appends each chunk to a pending buffer,
//! re-executes after `BatchExhausted`, and keeps the unconsumed tail after
//! `NeedsInput`. Events are rendered as strings with their bytes resolved,
//! adjacent `Body` fragments merged and control events dropped, so runs with
//! different chunkings and batch sizes compare equal.

use crate::common::{Gen, TestCase};
use httpev_core::{
    Batch, Direction, Event, MessageFlags, MessageStart, ParserConfig, ParserSession, RequestMethod,
};

/// How input is presented to the session
#[derive(Debug, Clone)]
pub struct Feed {
    /// Chunk boundaries, ascending
    pub splits: Vec<usize>,
    pub batch_capacity: usize,
}

impl Feed {
    /// Whole input in one call, default batch size
    pub fn whole() -> Self {
        Self {
            splits: Vec::new(),
            batch_capacity: ParserConfig::default().batch_capacity,
        }
    }

    pub fn split_at(splits: Vec<usize>, batch_capacity: usize) -> Self {
        Self {
            splits,
            batch_capacity,
        }
    }
}

pub fn format_flags(flags: &MessageFlags) -> String {
    let mut parts = vec![if flags.keep_alive { "keep-alive" } else { "close" }.to_string()];
    if flags.chunked {
        parts.push("chunked".to_string());
    }
    if let Some(n) = flags.content_length {
        parts.push(format!("length={}", n));
    }
    if flags.upgrade {
        parts.push("upgrade".to_string());
    }
    parts.join(" ")
}

#[derive(Debug, Default)]
struct Recorder {
    out: Vec<String>,
    body: Vec<u8>,
    /// Stream position of `pending[0]`
    base: usize,
}

impl Recorder {
    fn flush_body(&mut self) {
        if !self.body.is_empty() {
            self.out
                .push(format!("Body {:?}", String::from_utf8_lossy(&self.body)));
            self.body.clear();
        }
    }

    fn push(&mut self, line: String) {
        self.flush_body();
        self.out.push(line);
    }

    fn record(&mut self, batch: &Batch<'_, '_>) {
        let bytes = |span| batch.resolve(span).expect("span outside buffer");
        let text = |span| String::from_utf8_lossy(bytes(span)).into_owned();

        for event in batch {
            match *event {
                Event::MessageStart(MessageStart::Request(RequestMethod::Known(m))) => {
                    self.push(format!("Request {:?}", m.as_str()))
                }
                Event::MessageStart(MessageStart::Request(RequestMethod::Unknown(span))) => {
                    self.push(format!("UnknownRequest {:?}", text(span)))
                }
                Event::MessageStart(MessageStart::Response { status }) => {
                    self.push(format!("Response {:?}", status.to_string()))
                }
                Event::Version { major, minor } => {
                    self.push(format!("Version {:?}", format!("{}.{}", major, minor)))
                }
                Event::Url(span) => self.push(format!("Url {:?}", text(span))),
                Event::Path(span) => self.push(format!("Path {:?}", text(span))),
                Event::QueryString(span) => self.push(format!("QueryString {:?}", text(span))),
                Event::Fragment(span) => self.push(format!("Fragment {:?}", text(span))),
                Event::HeaderField(span) => self.push(format!("HeaderField {:?}", text(span))),
                Event::HeaderValue(span) => self.push(format!("HeaderValue {:?}", text(span))),
                Event::HeadersEnd(flags) => {
                    self.push(format!("HeadersEnd {:?}", format_flags(&flags)))
                }
                Event::Body(span) => self.body.extend_from_slice(bytes(span)),
                Event::MessageEnd { .. } => self.push("MessageEnd".to_string()),
                Event::ParseError { at, code } => {
                    let at = self.base + at;
                    self.push(format!("Error {:?}", format!("{:?}@{}", code, at)))
                }
                Event::NeedsInput { .. } | Event::BatchExhausted { .. } => {}
            }
        }
    }
}

/// Run `input` through a fresh session the way a host would.
pub fn collect(
    direction: Direction,
    config: &ParserConfig,
    input: &[u8],
    feed: &Feed,
    eof: bool,
) -> Vec<String> {
    let config = config.clone().batch_capacity(feed.batch_capacity);
    let mut session = ParserSession::with_config(direction, config).expect("valid config");
    let mut rec = Recorder::default();
    let mut pending: Vec<u8> = Vec::new();

    let mut bounds: Vec<usize> = feed.splits.iter().map(|&s| s.min(input.len())).collect();
    bounds.push(input.len());
    let mut start = 0;

    'feed: for end in bounds {
        let end = end.max(start);
        pending.extend_from_slice(&input[start..end]);
        start = end;

        let mut offset = 0;
        while offset < pending.len() {
            let Ok(batch) = session.execute(&pending, offset, pending.len() - offset) else {
                break 'feed;
            };
            rec.record(&batch);
            match batch.terminal().copied() {
                Some(Event::BatchExhausted { at }) => offset = at,
                Some(Event::NeedsInput { at }) => {
                    offset = at;
                    break;
                }
                _ => break 'feed,
            }
        }
        rec.base += offset;
        pending.drain(..offset);
    }

    if eof {
        if let Ok(batch) = session.finish() {
            rec.record(&batch);
        }
    }
    rec.flush_body();
    rec.out
}

pub fn collect_whole(case: &TestCase) -> Vec<String> {
    collect(
        case.direction(),
        &case.config(),
        case.input.as_bytes(),
        &Feed::whole(),
        case.eof,
    )
}

/// Result of running a test
#[derive(Debug)]
pub struct TestResult {
    pub passed: bool,
    pub input: Vec<u8>,
    pub feed: Feed,
    pub expected: Vec<String>,
    pub actual: Vec<String>,
    pub seed: u64,
    pub errors: Vec<String>,
}

fn compare(expected: &[String], actual: &[String]) -> Vec<String> {
    let mut errors = Vec::new();
    if actual.len() != expected.len() {
        errors.push(format!(
            "Event count mismatch: expected {}, got {}",
            expected.len(),
            actual.len()
        ));
    }
    for (i, (act, exp)) in actual.iter().zip(expected.iter()).enumerate() {
        if act != exp {
            errors.push(format!("Event {}: expected '{}', got '{}'", i, exp, act));
        }
    }
    errors
}

fn run_feed(case: &TestCase, feed: Feed, seed: u64) -> TestResult {
    let input = case.input.as_bytes();
    let actual = collect(case.direction(), &case.config(), input, &feed, case.eof);
    let expected: Vec<String> = case.events.iter().map(|e| e.format()).collect();
    let errors = compare(&expected, &actual);
    TestResult {
        passed: errors.is_empty(),
        input: input.to_vec(),
        feed,
        expected,
        actual,
        seed,
        errors,
    }
}

/// Run a single test case (whole input, one call)
pub fn run_test(case: &TestCase) -> TestResult {
    run_feed(case, Feed::whole(), 0)
}

/// Run with random chunk boundaries and a random batch size
pub fn run_with_variations(case: &TestCase, gen: &mut Gen) -> TestResult {
    let feed = Feed::split_at(gen.splits(case.input.len()), gen.batch_capacity());
    run_feed(case, feed, gen.seed)
}

impl TestResult {
    /// Print detailed failure info
    pub fn print_failure(&self, case_id: &str) {
        eprintln!("\n=== FAILED: {} ===", case_id);
        eprintln!("Seed: {} (set HTTPEV_TEST_SEED={} to reproduce)", self.seed, self.seed);
        eprintln!("Feed: {:?}", self.feed);
        eprintln!("\nInput:");
        eprintln!("{:?}", String::from_utf8_lossy(&self.input));
        eprintln!("\nExpected events:");
        for (i, e) in self.expected.iter().enumerate() {
            eprintln!("  {}: {}", i, e);
        }
        eprintln!("\nActual events:");
        for (i, e) in self.actual.iter().enumerate() {
            eprintln!("  {}: {}", i, e);
        }
        eprintln!("\nErrors:");
        for e in &self.errors {
            eprintln!("  - {}", e);
        }
    }
}
