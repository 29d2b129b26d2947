//! # Fetching Documents
//!
//! The resolver never reads files or talks to the network itself. It asks a
//! [`Fetcher`] for the raw bytes behind a [`Location`], which keeps transport
//! concerns out of the merge pipeline and lets tests swap in an in-memory
//! implementation.
//!
//! ## Implementations
//!
//! - **`DefaultFetcher`**: reads `file://` locations from disk and downloads
//!   `http`/`https` locations with `ureq`. Query strings are passed through
//!   unmodified.
//! - **`MemoryFetcher`**: serves documents from an in-memory map and records
//!   every location it was asked for.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

use log::debug;
use url::Url;

use crate::error::{Error, Result};
use crate::location::Location;

/// Trait for loading raw document bytes - allows mocking in tests
pub trait Fetcher: Send + Sync {
    /// Returns the bytes stored at `location`.
    fn fetch(&self, location: &Location) -> Result<Vec<u8>>;
}

/// Reads local files and downloads HTTP(S) documents.
pub struct DefaultFetcher {
    agent: ureq::Agent,
}

impl DefaultFetcher {
    pub fn new() -> Self {
        Self {
            agent: ureq::Agent::new_with_defaults(),
        }
    }

    /// Creates a fetcher whose HTTP requests give up after `timeout`.
    pub fn with_timeout(timeout: Duration) -> Self {
        let config = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .build();
        Self {
            agent: ureq::Agent::new_with_config(config),
        }
    }

    fn fetch_file(&self, location: &Location) -> Result<Vec<u8>> {
        let path = location.url().to_file_path().map_err(|_| Error::Load {
            location: location.to_string(),
            message: "not a valid file path".to_string(),
        })?;
        debug!("Reading {}", path.display());
        std::fs::read(&path).map_err(|e| Error::Load {
            location: location.to_string(),
            message: e.to_string(),
        })
    }

    fn fetch_http(&self, location: &Location) -> Result<Vec<u8>> {
        debug!("GET {}", location);
        let load_error = |e: ureq::Error| Error::Load {
            location: location.to_string(),
            message: e.to_string(),
        };
        let mut response = self
            .agent
            .get(location.url().as_str())
            .call()
            .map_err(load_error)?;
        response.body_mut().read_to_vec().map_err(load_error)
    }
}

impl Default for DefaultFetcher {
    fn default() -> Self {
        Self::new()
    }
}

impl Fetcher for DefaultFetcher {
    fn fetch(&self, location: &Location) -> Result<Vec<u8>> {
        match location.scheme() {
            "file" => self.fetch_file(location),
            "http" | "https" => self.fetch_http(location),
            other => Err(Error::Load {
                location: location.to_string(),
                message: format!("unsupported scheme '{}'", other),
            }),
        }
    }
}

/// In-memory document store for fast, hermetic resolution
#[derive(Debug, Default)]
pub struct MemoryFetcher {
    /// Documents stored as location URL -> content mapping
    files: HashMap<String, Vec<u8>>,
    /// Every location requested, in request order
    requests: Mutex<Vec<String>>,
}

impl MemoryFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or update a document.
    ///
    /// `location` is either a URL or an absolute filesystem path.
    pub fn add_file<S: AsRef<str>>(&mut self, location: S, content: Vec<u8>) -> Result<()> {
        let location = Self::key(location.as_ref())?;
        self.files.insert(location, content);
        Ok(())
    }

    /// Add a document with string content
    pub fn add_file_string<S: AsRef<str>>(&mut self, location: S, content: &str) -> Result<()> {
        self.add_file(location, content.as_bytes().to_vec())
    }

    /// Check if a document exists
    pub fn exists(&self, location: &Location) -> bool {
        self.files.contains_key(location.url().as_str())
    }

    /// Get the number of documents
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Check if the store is empty
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Locations requested so far, in request order.
    pub fn requests(&self) -> Vec<String> {
        self.requests
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    fn key(raw: &str) -> Result<String> {
        match Url::parse(raw) {
            Ok(url) if url.scheme().len() > 1 => Ok(url.to_string()),
            _ => Ok(Location::from_path(Path::new(raw))?.to_string()),
        }
    }
}

impl Fetcher for MemoryFetcher {
    fn fetch(&self, location: &Location) -> Result<Vec<u8>> {
        let key = location.url().as_str();
        self.requests
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(key.to_string());
        self.files.get(key).cloned().ok_or_else(|| Error::Load {
            location: key.to_string(),
            message: "document not found".to_string(),
        })
    }
}
