//! YAML decoding and encoding
//!
//! Merge keys (`<<: *anchor`) are applied before conversion. Mapping keys
//! that are numbers or booleans are converted to their string form, since
//! objects only have string keys.

use serde_yaml::Value as YamlValue;

use crate::error::{Error, Result};
use crate::value::{Map, NumberOutOfRange, Value};

pub fn decode(bytes: &[u8]) -> std::result::Result<Value, String> {
    let mut raw: YamlValue = serde_yaml::from_slice(bytes).map_err(|e| e.to_string())?;
    raw.apply_merge().map_err(|e| e.to_string())?;
    from_yaml(raw)
}

pub fn encode(value: &Value) -> Result<Vec<u8>> {
    serde_yaml::to_string(value)
        .map(String::into_bytes)
        .map_err(|e| Error::Marshal {
            format: "yaml".to_string(),
            message: e.to_string(),
        })
}

fn from_yaml(raw: YamlValue) -> std::result::Result<Value, String> {
    Ok(match raw {
        YamlValue::Null => Value::Null,
        YamlValue::Bool(b) => Value::Bool(b),
        YamlValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::Int(i)
            } else if let Some(u) = n.as_u64() {
                return Err(NumberOutOfRange::Integer(u.to_string()).to_string());
            } else {
                Value::Float(n.as_f64().unwrap_or(f64::NAN))
            }
        }
        YamlValue::String(s) => Value::String(s),
        YamlValue::Sequence(items) => Value::Array(
            items
                .into_iter()
                .map(from_yaml)
                .collect::<std::result::Result<_, _>>()?,
        ),
        YamlValue::Mapping(mapping) => {
            let mut map = Map::new();
            for (key, value) in mapping {
                map.insert(key_to_string(key)?, from_yaml(value)?);
            }
            Value::Object(map)
        }
        YamlValue::Tagged(tagged) => from_yaml(tagged.value)?,
    })
}

fn key_to_string(key: YamlValue) -> std::result::Result<String, String> {
    match key {
        YamlValue::String(s) => Ok(s),
        YamlValue::Number(n) => Ok(n.to_string()),
        YamlValue::Bool(b) => Ok(b.to_string()),
        YamlValue::Null => Ok("null".to_string()),
        other => Err(format!("unsupported mapping key: {:?}", other)),
    }
}
