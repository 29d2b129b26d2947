//! Document formats
//!
//! Each supported format has its own submodule with a decoder (bytes to
//! [`Value`]) and an encoder ([`Value`] to bytes):
//!
//! - JSON (json.rs)
//! - YAML (yaml.rs)
//! - TOML (toml.rs)
//!
//! The format of a document is chosen from its location's extension. When
//! the extension is missing or unknown, [`decode_document`] detects it.

use std::fmt;
use std::str::FromStr;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::location::Location;
use crate::value::Value;

pub mod json;
pub mod toml;
pub mod yaml;

/// A supported document format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    Json,
    Yaml,
    Toml,
}

impl Format {
    pub const ALL: [Format; 3] = [Format::Json, Format::Yaml, Format::Toml];

    pub fn name(self) -> &'static str {
        match self {
            Format::Json => "json",
            Format::Yaml => "yaml",
            Format::Toml => "toml",
        }
    }

    /// Maps a file extension (without the dot) to a format.
    pub fn from_extension(ext: &str) -> Option<Format> {
        match ext.to_ascii_lowercase().as_str() {
            "json" | "jsn" => Some(Format::Json),
            "yaml" | "yml" => Some(Format::Yaml),
            "toml" | "tml" => Some(Format::Toml),
            _ => None,
        }
    }

    /// The format implied by a location's extension.
    pub fn for_location(location: &Location) -> Option<Format> {
        location.extension().and_then(|ext| Format::from_extension(&ext))
    }

    /// Decode `bytes` as this format. The error is the decoder's message.
    pub fn decode(self, bytes: &[u8]) -> std::result::Result<Value, String> {
        match self {
            Format::Json => json::decode(bytes),
            Format::Yaml => yaml::decode(bytes),
            Format::Toml => toml::decode(bytes),
        }
    }

    /// Encode `value` as this format.
    pub fn encode(self, value: &Value) -> Result<Vec<u8>> {
        match self {
            Format::Json => json::encode(value),
            Format::Yaml => yaml::encode(value),
            Format::Toml => toml::encode(value),
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Format {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Format::from_extension(s).ok_or_else(|| {
            format!("unknown format '{}', expected one of json, yaml, toml", s)
        })
    }
}

/// Decode a document named `name`, using `format` when it is known and
/// detecting it otherwise.
///
/// Detection tries JSON first, then YAML when it yields an object, then
/// TOML, and finally accepts a non-object YAML document.
pub fn decode_document(bytes: &[u8], format: Option<Format>, name: &str) -> Result<Value> {
    match format {
        Some(format) => format.decode(bytes).map_err(|message| Error::Decode {
            location: name.to_string(),
            format: format.name().to_string(),
            message,
        }),
        None => detect(bytes, name),
    }
}

fn detect(bytes: &[u8], name: &str) -> Result<Value> {
    let json_error = match json::decode(bytes) {
        Ok(value) => return Ok(value),
        Err(e) => e,
    };

    let yaml = match yaml::decode(bytes) {
        Ok(value @ Value::Object(_)) => {
            debug!("Detected yaml for {}", name);
            return Ok(value);
        }
        other => other,
    };

    if let Ok(value) = toml::decode(bytes) {
        debug!("Detected toml for {}", name);
        return Ok(value);
    }

    yaml.map_err(|_| Error::Decode {
        location: name.to_string(),
        format: "json, yaml or toml".to_string(),
        message: json_error,
    })
}
