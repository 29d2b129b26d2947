//! TOML decoding and encoding
//!
//! TOML cannot represent every tree: it has no null, and the root of a
//! document must be a table. The tree is converted to a `toml::Value` first,
//! so those cases surface as ordinary `Error::Marshal` values that name the
//! offending path. Datetimes decode to their string form.

use ::toml::map::Map as TomlMap;
use ::toml::Value as TomlValue;

use crate::error::{Error, Result};
use crate::merge::{MergeContext, PathSegment};
use crate::value::{Map, Value};

pub fn decode(bytes: &[u8]) -> std::result::Result<Value, String> {
    let text = std::str::from_utf8(bytes).map_err(|e| e.to_string())?;
    let table: ::toml::Table = ::toml::from_str(text).map_err(|e| e.to_string())?;
    Ok(from_toml(TomlValue::Table(table)))
}

pub fn encode(value: &Value) -> Result<Vec<u8>> {
    let table = match value {
        Value::Object(map) => to_table(map, &mut MergeContext::root())?,
        other => {
            return Err(marshal_error(format!(
                "the root must be an object, found {}",
                other.kind()
            )))
        }
    };
    ::toml::to_string(&table)
        .map(String::into_bytes)
        .map_err(|e| marshal_error(e.to_string()))
}

fn marshal_error(message: String) -> Error {
    Error::Marshal {
        format: "toml".to_string(),
        message,
    }
}

fn from_toml(raw: TomlValue) -> Value {
    match raw {
        TomlValue::String(s) => Value::String(s),
        TomlValue::Integer(i) => Value::Int(i),
        TomlValue::Float(f) => Value::Float(f),
        TomlValue::Boolean(b) => Value::Bool(b),
        TomlValue::Datetime(dt) => Value::String(dt.to_string()),
        TomlValue::Array(items) => Value::Array(items.into_iter().map(from_toml).collect()),
        TomlValue::Table(table) => Value::Object(
            table
                .into_iter()
                .map(|(k, v)| (k, from_toml(v)))
                .collect(),
        ),
    }
}

fn to_table(map: &Map, ctx: &mut MergeContext) -> Result<TomlMap<String, TomlValue>> {
    let mut table = TomlMap::new();
    for (key, value) in map {
        ctx.push(PathSegment::Key(key.clone()));
        let converted = to_toml(value, ctx)?;
        ctx.pop();
        table.insert(key.clone(), converted);
    }
    Ok(table)
}

fn to_toml(value: &Value, ctx: &mut MergeContext) -> Result<TomlValue> {
    Ok(match value {
        Value::Null => {
            return Err(marshal_error(format!(
                "null at {} has no TOML representation",
                ctx
            )))
        }
        Value::Bool(b) => TomlValue::Boolean(*b),
        Value::Int(i) => TomlValue::Integer(*i),
        Value::Float(f) => TomlValue::Float(*f),
        Value::String(s) => TomlValue::String(s.clone()),
        Value::Array(items) => {
            let mut out = Vec::with_capacity(items.len());
            for (idx, item) in items.iter().enumerate() {
                ctx.push(PathSegment::Index(idx));
                out.push(to_toml(item, ctx)?);
                ctx.pop();
            }
            TomlValue::Array(out)
        }
        Value::Object(map) => TomlValue::Table(to_table(map, ctx)?),
    })
}
