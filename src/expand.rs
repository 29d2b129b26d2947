//! Environment variable expansion
//!
//! Before decoding, a document's raw bytes can be scanned for `$NAME` and
//! `"$NAME"` tokens, which are replaced with the value of the environment
//! variable `NAME`:
//!
//! - `$NAME` is replaced with the raw value, so `"port": $PORT` with
//!   `PORT=8080` decodes as the number `8080`.
//! - `"$NAME"` is replaced with the value as a quoted, escaped string literal,
//!   so a value containing quotes or backslashes still decodes as a string.
//!
//! Unset variables are left as they are. The scan is a single pass over the
//! input; text that was substituted in is never scanned again.

use std::sync::OnceLock;

use regex::bytes::{Captures, Regex};

fn token_regex() -> &'static Regex {
    static TOKEN: OnceLock<Regex> = OnceLock::new();
    TOKEN.get_or_init(|| {
        Regex::new(r#""\$([A-Za-z_][A-Za-z0-9_]*)"|\$([A-Za-z_][A-Za-z0-9_]*)"#)
            .expect("token pattern is valid")
    })
}

/// Expand tokens using the environment of the current process.
pub fn expand_env(input: &[u8]) -> Vec<u8> {
    expand_with(input, |name| std::env::var(name).ok())
}

/// Expand tokens using `lookup` to find variable values.
pub fn expand_with<F>(input: &[u8], lookup: F) -> Vec<u8>
where
    F: Fn(&str) -> Option<String>,
{
    token_regex()
        .replace_all(input, |caps: &Captures| -> Vec<u8> {
            if let Some(name) = caps.get(1) {
                match lookup(&String::from_utf8_lossy(name.as_bytes())) {
                    Some(value) => quote(&value).into_bytes(),
                    None => caps[0].to_vec(),
                }
            } else {
                let name = &caps[2];
                match lookup(&String::from_utf8_lossy(name)) {
                    Some(value) => value.into_bytes(),
                    None => caps[0].to_vec(),
                }
            }
        })
        .into_owned()
}

fn quote(value: &str) -> String {
    serde_json::Value::String(value.to_string()).to_string()
}
