//! # Error Handling
//!
//! This module defines the centralized error type for `layerconf`. It uses the
//! `thiserror` library to create a single `Error` enum covering every failure
//! a build can run into, from fetching a document to encoding the merged
//! result.
//!
//! ## Key Components
//!
//! - **`Error`**: The main enum. Each variant carries the context needed to
//!   locate the failure: the document location, the path inside the tree, or
//!   the format involved.
//!
//! - **`Result<T>`**: A type alias for `std::result::Result<T, Error>`.
//!
//! Errors raised while resolving a document's includes are wrapped in
//! `Error::InDocument`, one layer per document, so the display string shows
//! the chain of documents that led to the failure. `Error::root_cause` strips
//! those layers when the caller needs the underlying variant.

use thiserror::Error;

use crate::value::Kind;

/// Boxed error returned by external collaborators such as validators.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Main error type for layerconf operations
#[derive(Error, Debug)]
pub enum Error {
    /// A document could not be fetched from its location.
    #[error("Failed to load {location}: {message}")]
    Load { location: String, message: String },

    /// The bytes of a document are not valid for the selected format.
    #[error("Could not decode {location} as {format}: {message}")]
    Decode {
        location: String,
        format: String,
        message: String,
    },

    /// The reserved `includes` key is present but is not a list of strings.
    #[error("Could not extract includes{}: {message}", location.as_ref().map(|l| format!(" from {}", l)).unwrap_or_default())]
    IncludesFormat {
        location: Option<String>,
        message: String,
    },

    /// A location string could not be resolved against its base.
    #[error("Could not resolve location '{location}' against {base}: {message}")]
    PathResolution {
        location: String,
        base: String,
        message: String,
    },

    /// Two values of incompatible structure met during a merge.
    #[error("Failed to merge at {path}: cannot merge {src} into {dest}")]
    MergeShape { path: String, dest: Kind, src: Kind },

    /// Two scalars of different kinds met during a merge.
    #[error("Failed to merge at {path}: the destination type ({dest}) must be the same as the source type ({src})")]
    MergeType { path: String, dest: Kind, src: Kind },

    /// A document includes itself, directly or through other documents.
    #[error("Circular include detected: {cycle}")]
    CircularInclude { cycle: String },

    /// An error raised while processing a specific document.
    #[error("Error processing {location}: {source}")]
    InDocument {
        location: String,
        #[source]
        source: Box<Error>,
    },

    /// The merged tree could not be serialized.
    #[error("The data could not be marshalled to {format}: {message}")]
    Marshal { format: String, message: String },

    /// The configured validator rejected the merged tree.
    #[error("Schema validation failed: {source}")]
    Validation {
        #[source]
        source: BoxError,
    },

    /// The configured validator could not apply defaults.
    #[error("The defaults could not be applied: {source}")]
    Defaults {
        #[source]
        source: BoxError,
    },

    /// An operation was called before its prerequisites were configured.
    #[error("Precondition failed: {message}")]
    Precondition { message: String },
}

impl Error {
    /// Wraps `self` with the location of the document being processed.
    pub fn in_document(self, location: impl Into<String>) -> Self {
        Error::InDocument {
            location: location.into(),
            source: Box::new(self),
        }
    }

    /// Returns the innermost error, skipping `InDocument` layers.
    pub fn root_cause(&self) -> &Error {
        let mut current = self;
        while let Error::InDocument { source, .. } = current {
            current = source;
        }
        current
    }
}

/// A convenient type alias for `Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;
