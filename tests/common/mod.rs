//! Shared test utilities for integration and E2E tests.
//!
//! Add `mod common;` to a test file, then use the helpers:
//!
//! ```rust,ignore
//! mod common;
//! use common::{fixture_resolver, fixture_path};
//! ```

#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;

use layerconf::fetch::DefaultFetcher;
use layerconf::location::FixedWorkingDir;
use layerconf::{Options, Resolver};

/// Directory holding the include fixtures.
pub fn fixture_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("testdata")
        .join("includes")
}

/// Absolute path of a fixture, as a string.
pub fn fixture_path(name: &str) -> String {
    fixture_dir().join(name).to_string_lossy().into_owned()
}

/// A resolver reading real files, with relative paths resolved against the
/// fixture directory.
pub fn fixture_resolver(options: Options) -> Resolver {
    Resolver::new(
        Arc::new(DefaultFetcher::new()),
        Arc::new(FixedWorkingDir::new(fixture_dir())),
        options,
    )
}

/// Parses JSON test input into a tree.
pub fn tree(json: serde_json::Value) -> layerconf::Value {
    layerconf::Value::try_from(json).expect("test JSON fits the value model")
}
