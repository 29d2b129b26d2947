//! JSON decoding and encoding
//!
//! Output is pretty-printed with two-space indentation and a trailing
//! newline. `serde_json` does not escape `<`, `>` or `&`, and integers are
//! written without a decimal point.
//!
//! Numbers are classified by their literal text, so an integer literal
//! outside the `i64` range is a decode error rather than a float. NaN and
//! infinities have no JSON form and fail to encode.

use serde::Serialize;
use serde_json::ser::{PrettyFormatter, Serializer};

use crate::error::{Error, Result};
use crate::merge::{MergeContext, PathSegment};
use crate::value::Value;

pub fn decode(bytes: &[u8]) -> std::result::Result<Value, String> {
    let raw: serde_json::Value = serde_json::from_slice(bytes).map_err(|e| e.to_string())?;
    Value::try_from(raw).map_err(|e| e.to_string())
}

pub fn encode(value: &Value) -> Result<Vec<u8>> {
    ensure_finite(value)?;
    let mut out = Vec::new();
    let mut serializer = Serializer::with_formatter(&mut out, PrettyFormatter::with_indent(b"  "));
    value
        .serialize(&mut serializer)
        .map_err(|e| Error::Marshal {
            format: "json".to_string(),
            message: e.to_string(),
        })?;
    out.push(b'\n');
    Ok(out)
}

/// Fails with `Error::Marshal` naming the path of the first NaN or infinite
/// float in `value`.
pub fn ensure_finite(value: &Value) -> Result<()> {
    find_non_finite(value, &mut MergeContext::root()).map_or(Ok(()), |message| {
        Err(Error::Marshal {
            format: "json".to_string(),
            message,
        })
    })
}

fn find_non_finite(value: &Value, ctx: &mut MergeContext) -> Option<String> {
    match value {
        Value::Float(f) if !f.is_finite() => {
            Some(format!("{} at {} has no JSON representation", f, ctx))
        }
        Value::Array(items) => items.iter().enumerate().find_map(|(idx, item)| {
            ctx.push(PathSegment::Index(idx));
            let found = find_non_finite(item, ctx);
            ctx.pop();
            found
        }),
        Value::Object(map) => map.iter().find_map(|(key, item)| {
            ctx.push(PathSegment::Key(key.clone()));
            let found = find_non_finite(item, ctx);
            ctx.pop();
            found
        }),
        _ => None,
    }
}
