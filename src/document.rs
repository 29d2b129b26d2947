//! # Document
//!
//! [`Document`] holds a merged tree and is the main entry point of the crate.
//! Layers are added from files, URLs, raw bytes or in-memory values. Each
//! layer is merged on top of what the document already holds, so later layers
//! take precedence.
//!
//! ```no_run
//! use layerconf::Document;
//!
//! # fn main() -> layerconf::Result<()> {
//! let doc = Document::from_files(&["base.yaml", "production.json"])?;
//! let json = doc.to_json()?;
//! # Ok(())
//! # }
//! ```
//!
//! A failed `add_*` call leaves the document as it was.

use std::fmt;

use log::info;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{Error, Result};
use crate::format::{json, Format};
use crate::location::Location;
use crate::merge::merge_to;
use crate::resolver::{Resolver, Source};
use crate::validate::Validator;
use crate::value::Value;

#[derive(Clone, Default)]
pub struct Document {
    resolver: Resolver,
    value: Value,
}

impl fmt::Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Document")
            .field("options", self.resolver.options())
            .field("value", &self.value)
            .finish()
    }
}

impl Document {
    /// An empty document using the default resolver.
    pub fn new() -> Self {
        Self::default()
    }

    /// An empty document that resolves layers with `resolver`.
    pub fn with_resolver(resolver: Resolver) -> Self {
        Self {
            resolver,
            value: Value::Null,
        }
    }

    pub fn resolver(&self) -> &Resolver {
        &self.resolver
    }

    /// Enables or disables environment variable expansion for later layers.
    pub fn set_expand(&mut self, expand: bool) {
        self.resolver.set_expand(expand);
    }

    pub fn from_files<S: AsRef<str>>(raw: &[S]) -> Result<Self> {
        let mut doc = Self::new();
        doc.add_files(raw)?;
        Ok(doc)
    }

    pub fn from_locations(locations: &[Location]) -> Result<Self> {
        let mut doc = Self::new();
        doc.add_locations(locations)?;
        Ok(doc)
    }

    pub fn from_data<B: AsRef<[u8]>>(data: &[B]) -> Result<Self> {
        let mut doc = Self::new();
        doc.add_data(data)?;
        Ok(doc)
    }

    pub fn from_sources(sources: &[Source]) -> Result<Self> {
        let mut doc = Self::new();
        doc.add_sources(sources)?;
        Ok(doc)
    }

    pub fn from_values<T: Serialize>(values: &[T]) -> Result<Self> {
        let mut doc = Self::new();
        doc.add_values(values)?;
        Ok(doc)
    }

    /// Merges file paths or URLs, resolved against the working directory.
    pub fn add_files<S: AsRef<str>>(&mut self, raw: &[S]) -> Result<()> {
        let locations = raw
            .iter()
            .map(|r| self.resolver.parse_location(r.as_ref()))
            .collect::<Result<Vec<_>>>()?;
        self.add_locations(&locations)
    }

    pub fn add_locations(&mut self, locations: &[Location]) -> Result<()> {
        let layers = self.resolver.resolve_trees(locations)?;
        self.merge_layers(&layers)
    }

    /// Merges raw documents. Their format is detected and their includes are
    /// resolved against the working directory.
    pub fn add_data<B: AsRef<[u8]>>(&mut self, data: &[B]) -> Result<()> {
        let sources: Vec<Source> = data.iter().map(|d| Source::new(d.as_ref())).collect();
        self.add_sources(&sources)
    }

    pub fn add_sources(&mut self, sources: &[Source]) -> Result<()> {
        let layers = self.resolver.resolve_source_trees(sources)?;
        self.merge_layers(&layers)
    }

    /// Merges in-memory values. They are converted through `serde_json` and
    /// their `includes` keys are not processed.
    pub fn add_values<T: Serialize>(&mut self, values: &[T]) -> Result<()> {
        let layers = values
            .iter()
            .map(to_value)
            .collect::<Result<Vec<_>>>()?;
        self.merge_layers(&layers)
    }

    pub fn add_value(&mut self, value: Value) -> Result<()> {
        self.merge_layers(std::slice::from_ref(&value))
    }

    fn merge_layers(&mut self, layers: &[Value]) -> Result<()> {
        self.value = merge_to(self.value.clone(), layers)?;
        info!("Merged {} layer(s)", layers.len());
        Ok(())
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn into_value(self) -> Value {
        self.value
    }

    /// True when nothing has been merged yet, or only empty objects.
    pub fn is_empty(&self) -> bool {
        match &self.value {
            Value::Null => true,
            Value::Object(map) => map.is_empty(),
            _ => false,
        }
    }

    /// Deserializes the merged tree into `T`.
    ///
    /// NaN and infinite floats fail with `Error::Marshal`.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T> {
        json::ensure_finite(&self.value)?;
        serde_json::from_value(serde_json::Value::from(&self.value)).map_err(|e| Error::Decode {
            location: "merged document".to_string(),
            format: std::any::type_name::<T>().to_string(),
            message: e.to_string(),
        })
    }

    pub fn to_json(&self) -> Result<Vec<u8>> {
        self.encode(Format::Json)
    }

    pub fn to_yaml(&self) -> Result<Vec<u8>> {
        self.encode(Format::Yaml)
    }

    pub fn to_toml(&self) -> Result<Vec<u8>> {
        self.encode(Format::Toml)
    }

    pub fn encode(&self, format: Format) -> Result<Vec<u8>> {
        format.encode(&self.value)
    }

    /// Checks the merged tree with `validator`.
    pub fn validate(&self, validator: Option<&dyn Validator>) -> Result<()> {
        let validator = validator.ok_or_else(schema_not_set)?;
        validator
            .validate(&self.value)
            .map_err(|source| Error::Validation { source })
    }

    /// Replaces the merged tree with the result of applying `validator`'s
    /// defaults to it.
    pub fn apply_defaults(&mut self, validator: Option<&dyn Validator>) -> Result<()> {
        let validator = validator.ok_or_else(schema_not_set)?;
        self.value = validator
            .apply_defaults(&self.value)
            .map_err(|source| Error::Defaults { source })?;
        Ok(())
    }
}

fn schema_not_set() -> Error {
    Error::Precondition {
        message: "schema is not set".to_string(),
    }
}

fn to_value<T: Serialize>(value: &T) -> Result<Value> {
    let marshal = |message: String| Error::Marshal {
        format: "json".to_string(),
        message,
    };
    let raw = serde_json::to_value(value).map_err(|e| marshal(e.to_string()))?;
    Value::try_from(raw).map_err(|e| marshal(e.to_string()))
}
