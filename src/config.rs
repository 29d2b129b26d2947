//! # Build Options
//!
//! Options that control how a set of documents is resolved. They are fixed
//! when a [`Resolver`](crate::resolver::Resolver) is constructed and apply to
//! every document it reads, includes and all.
//!
//! `Options` implements `Deserialize` so a host application can embed it in
//! its own configuration file:
//!
//! ```
//! use layerconf::config::Options;
//!
//! let options: Options = toml::from_str("expand = true").unwrap();
//! assert!(options.expand);
//! assert!(!options.parallel);
//! ```

use serde::{Deserialize, Serialize};

/// Options applied to every document of a build.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Options {
    /// Replace `$NAME` tokens with environment variables before decoding.
    pub expand: bool,
    /// Fetch and resolve sibling includes concurrently. Results are still
    /// merged in the order they are listed.
    pub parallel: bool,
}

impl Options {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_expand(mut self, expand: bool) -> Self {
        self.expand = expand;
        self
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }
}
