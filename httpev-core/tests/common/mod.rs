//! Test infrastructure for httpev
//!
//! Provides fixture loading, a reference host loop, and seeded generators.

#![allow(dead_code)]

mod generators;
mod harness;
mod loader;

pub use generators::Gen;
pub use harness::{collect, collect_whole, run_test, run_with_variations, Feed};
pub use loader::{load_fixtures_by_name, ExpectedEvent, TestCase};
