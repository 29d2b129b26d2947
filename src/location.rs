//! Document locations
//!
//! A [`Location`] is where a document comes from: a `file://` URL for paths on
//! disk, or an `http(s)://` URL for remote documents.
//!
//! Top-level locations given by the caller are resolved against a working
//! directory, supplied through the [`WorkingDir`] trait so that tests and
//! embedders can pin it instead of relying on the process state. Includes are
//! resolved against the location of the document that lists them.

use std::fmt;
use std::path::{Path, PathBuf};

use url::Url;

use crate::error::{Error, Result};

/// Provides the directory that relative top-level locations resolve against.
pub trait WorkingDir: Send + Sync {
    fn current_dir(&self) -> std::io::Result<PathBuf>;
}

/// Uses the working directory of the current process.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessWorkingDir;

impl WorkingDir for ProcessWorkingDir {
    fn current_dir(&self) -> std::io::Result<PathBuf> {
        std::env::current_dir()
    }
}

/// Always resolves against the same directory.
#[derive(Debug, Clone)]
pub struct FixedWorkingDir(pub PathBuf);

impl FixedWorkingDir {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self(dir.into())
    }
}

impl WorkingDir for FixedWorkingDir {
    fn current_dir(&self) -> std::io::Result<PathBuf> {
        Ok(self.0.clone())
    }
}

/// The origin of a document.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Location {
    url: Url,
}

impl Location {
    pub fn from_url(url: Url) -> Self {
        Self { url }
    }

    /// Builds a location for an absolute filesystem path.
    pub fn from_path(path: &Path) -> Result<Self> {
        let url = Url::from_file_path(path).map_err(|_| Error::PathResolution {
            location: path.display().to_string(),
            base: "the filesystem root".to_string(),
            message: "not an absolute path".to_string(),
        })?;
        // Reparse so that `.` and `..` segments are normalized.
        let url = Url::parse(url.as_str()).map_err(|e| Error::PathResolution {
            location: path.display().to_string(),
            base: "the filesystem root".to_string(),
            message: e.to_string(),
        })?;
        Ok(Self { url })
    }

    /// Parses a top-level location: a URL, an absolute path, or a path
    /// relative to `working_dir`.
    pub fn parse(raw: &str, working_dir: &dyn WorkingDir) -> Result<Self> {
        if let Some(url) = parse_absolute_url(raw) {
            return Ok(Self { url });
        }

        let path = Path::new(raw);
        if path.is_absolute() {
            return Self::from_path(path);
        }

        let dir = working_dir
            .current_dir()
            .map_err(|e| Error::PathResolution {
                location: raw.to_string(),
                base: "the working directory".to_string(),
                message: e.to_string(),
            })?;
        Self::from_path(&dir.join(path))
    }

    /// Resolves `raw` relative to this location.
    ///
    /// When this location is an HTTP URL with a query string and `raw` has
    /// none, the query is carried over to the result.
    pub fn join(&self, raw: &str) -> Result<Self> {
        if let Some(url) = parse_absolute_url(raw) {
            return Ok(Self { url });
        }

        if self.url.cannot_be_a_base() {
            return Err(Error::PathResolution {
                location: raw.to_string(),
                base: self.to_string(),
                message: format!("'{}' locations have no directory", self.url.scheme()),
            });
        }

        if self.url.scheme() == "file" && Path::new(raw).is_absolute() {
            return Self::from_path(Path::new(raw));
        }

        let mut url = self.url.join(raw).map_err(|e| Error::PathResolution {
            location: raw.to_string(),
            base: self.to_string(),
            message: e.to_string(),
        })?;

        if self.is_remote() && url.query().is_none() && self.url.query().is_some() {
            url.set_query(self.url.query());
        }

        Ok(Self { url })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn scheme(&self) -> &str {
        self.url.scheme()
    }

    /// Returns true for `http` and `https` locations.
    pub fn is_remote(&self) -> bool {
        matches!(self.url.scheme(), "http" | "https")
    }

    /// The lowercased extension of the last path segment, if any.
    pub fn extension(&self) -> Option<String> {
        let name = self.url.path().rsplit('/').next()?;
        let (stem, ext) = name.rsplit_once('.')?;
        if stem.is_empty() || ext.is_empty() {
            return None;
        }
        Some(ext.to_ascii_lowercase())
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.url.as_str())
    }
}

// Single-letter schemes are Windows drive letters, not URLs.
fn parse_absolute_url(raw: &str) -> Option<Url> {
    match Url::parse(raw) {
        Ok(url) if url.scheme().len() > 1 => Some(url),
        _ => None,
    }
}
