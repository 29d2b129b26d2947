//! # layerconf
//!
//! This library builds one configuration tree out of many layered documents.
//! Documents can be JSON, YAML or TOML, live on disk or behind an HTTP(S)
//! URL, and pull in other documents through a reserved `includes` key. The
//! `layerconf` command-line tool is a thin wrapper around it.
//!
//! ## Quick Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use layerconf::fetch::MemoryFetcher;
//! use layerconf::location::FixedWorkingDir;
//! use layerconf::{Document, Options, Resolver};
//!
//! let mut fetcher = MemoryFetcher::new();
//! fetcher
//!     .add_file_string("/etc/app/parent.json", r#"{"includes": ["child.yaml"], "k": "parent"}"#)
//!     .unwrap();
//! fetcher
//!     .add_file_string("/etc/app/child.yaml", "k: child\nonly_child: c\n")
//!     .unwrap();
//!
//! let resolver = Resolver::new(
//!     Arc::new(fetcher),
//!     Arc::new(FixedWorkingDir::new("/etc/app")),
//!     Options::default(),
//! );
//! let mut doc = Document::with_resolver(resolver);
//! doc.add_files(&["parent.json"]).unwrap();
//!
//! let json = String::from_utf8(doc.to_json().unwrap()).unwrap();
//! assert_eq!(json, "{\n  \"k\": \"parent\",\n  \"only_child\": \"c\"\n}\n");
//! ```
//!
//! ## Core Concepts
//!
//! - **Values (`value`)**: The format-neutral tree every document decodes to.
//! - **Merging (`merge`)**: Deep merge of two trees. Objects merge key by key,
//!   arrays concatenate, and scalars of the same kind are replaced.
//! - **Formats (`format`)**: JSON, YAML and TOML decoders and encoders, plus
//!   detection for documents without a known extension.
//! - **Locations and fetching (`location`, `fetch`)**: Where documents live
//!   and how their bytes are loaded.
//! - **Include resolution (`resolver`)**: Recursively loads a document's
//!   includes and merges them beneath it.
//! - **Documents (`document`)**: The facade that accumulates layers, encodes
//!   the result and delegates schema checks to a [`validate::Validator`].
//!
//! ## Precedence
//!
//! Later layers win over earlier ones. Within a single document, the
//! document's own keys win over anything it includes, and later includes win
//! over earlier includes.

pub mod config;
pub mod document;
pub mod error;
pub mod expand;
pub mod fetch;
pub mod format;
pub mod location;
pub mod merge;
pub mod resolver;
pub mod validate;
pub mod value;

#[cfg(test)]
mod merge_proptest;

pub use config::Options;
pub use document::Document;
pub use error::{Error, Result};
pub use format::Format;
pub use location::Location;
pub use resolver::{Resolver, Source};
pub use value::Value;
