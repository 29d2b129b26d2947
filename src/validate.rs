//! Schema validation seam
//!
//! `layerconf` does not ship a schema engine. A host application plugs one in
//! by implementing [`Validator`] and passing it to
//! [`Document::validate`](crate::document::Document::validate) or
//! [`Document::apply_defaults`](crate::document::Document::apply_defaults).

use crate::error::BoxError;
use crate::value::Value;

/// A schema that can check a merged tree and fill in its defaults.
pub trait Validator: Send + Sync {
    /// Checks `value` against the schema.
    fn validate(&self, value: &Value) -> Result<(), BoxError>;

    /// Returns `value` with the schema's defaults applied.
    fn apply_defaults(&self, value: &Value) -> Result<Value, BoxError>;
}
