//! Fixture loading from YAML files

use serde::Deserialize;
use std::path::Path;

use httpev_core::{Direction, ParserConfig};

/// A single test case from a fixture file
#[derive(Debug, Clone, Deserialize)]
pub struct TestCase {
    pub id: String,
    pub desc: String,
    pub direction: String,
    pub input: String,
    /// Signal end of input after the last byte
    #[serde(default)]
    pub eof: bool,
    #[serde(default)]
    pub url_components: bool,
    #[serde(default)]
    pub max_line_len: Option<usize>,
    #[serde(default)]
    pub max_headers: Option<usize>,
    pub events: Vec<ExpectedEvent>,
}

impl TestCase {
    pub fn direction(&self) -> Direction {
        self.direction
            .parse()
            .unwrap_or_else(|e| panic!("{}: {}", self.id, e))
    }

    pub fn config(&self) -> ParserConfig {
        let mut config = ParserConfig::default().url_components(self.url_components);
        if let Some(n) = self.max_line_len {
            config = config.max_line_len(n);
        }
        if let Some(n) = self.max_headers {
            config = config.max_headers(n);
        }
        config
    }
}

/// Expected event - either a bare name or [name, content]
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ExpectedEvent {
    /// Event without payload (MessageEnd)
    Bare(String),
    /// Event with payload [Url, "/path"]
    WithContent(String, String),
}

impl ExpectedEvent {
    pub fn format(&self) -> String {
        match self {
            ExpectedEvent::Bare(name) => name.clone(),
            ExpectedEvent::WithContent(name, content) => format!("{} {:?}", name, content),
        }
    }
}

/// Load all test cases from a YAML fixture file
pub fn load_fixtures(path: &Path) -> Vec<TestCase> {
    let content = std::fs::read_to_string(path)
        .unwrap_or_else(|e| panic!("Failed to read fixture file {:?}: {}", path, e));
    serde_yaml::from_str(&content)
        .unwrap_or_else(|e| panic!("Failed to parse fixture file {:?}: {}", path, e))
}

/// Load fixtures from the standard fixtures directory
pub fn load_fixtures_by_name(name: &str) -> Vec<TestCase> {
    let path = Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(format!("{}.yaml", name));
    load_fixtures(&path)
}
