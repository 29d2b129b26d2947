//! Deep merge of document trees
//!
//! This module merges two [`Value`] trees into one. It is the engine behind
//! both include resolution and the merging of several top-level documents.
//!
//! ## Rules
//!
//! Evaluated in order for a destination `dest` and a source `src`:
//!
//! 1. A null destination takes the source verbatim.
//! 2. A null source leaves the destination unchanged.
//! 3. Objects are merged key by key, recursively. Keys found only in the
//!    destination are kept.
//! 4. Arrays are concatenated, destination first. Elements are never merged
//!    with each other.
//! 5. Scalars of the same kind: the source wins.
//! 6. Anything else is an error naming both kinds and the path where the
//!    conflict happened.
//!
//! The destination is taken by value, so a failed merge never hands back a
//! half-merged tree.

use std::fmt;

use log::debug;

use crate::error::{Error, Result};
use crate::value::Value;

/// A segment of a path into a nested tree
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PathSegment {
    /// A named key for accessing object members
    Key(String),
    /// A numeric index for accessing array elements
    Index(usize),
}

/// The stack of keys and indices leading to the value currently being merged.
///
/// Only used to build error messages. Renders as `servers[0].host`, with keys
/// that contain `.`, `[` or `]` written as `config["special.key"]`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MergeContext {
    segments: Vec<PathSegment>,
}

impl MergeContext {
    pub fn root() -> Self {
        Self::default()
    }

    pub fn push(&mut self, segment: PathSegment) {
        self.segments.push(segment);
    }

    pub fn pop(&mut self) -> Option<PathSegment> {
        self.segments.pop()
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }
}

impl fmt::Display for MergeContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.segments.is_empty() {
            return f.write_str("<root>");
        }
        for (i, segment) in self.segments.iter().enumerate() {
            match segment {
                PathSegment::Key(key) if key.contains(['.', '[', ']']) => {
                    write!(f, "[{:?}]", key)?;
                }
                PathSegment::Key(key) => {
                    if i > 0 {
                        f.write_str(".")?;
                    }
                    f.write_str(key)?;
                }
                PathSegment::Index(idx) => write!(f, "[{}]", idx)?,
            }
        }
        Ok(())
    }
}

/// Merge `src` into `dest` and return the result.
///
/// # Errors
///
/// Returns `Error::MergeType` when two scalars of different kinds meet, and
/// `Error::MergeShape` when an array or object meets a value of another
/// shape.
pub fn merge(dest: Value, src: &Value) -> Result<Value> {
    merge_in_context(&mut MergeContext::root(), dest, src)
}

/// Merge each of `sources` into `dest`, left to right.
///
/// Earlier sources are base layers; later ones override or extend them.
pub fn merge_to(dest: Value, sources: &[Value]) -> Result<Value> {
    let total = sources.len();
    sources
        .iter()
        .enumerate()
        .try_fold(dest, |acc, (i, src)| {
            debug!("Merging source {} of {}", i + 1, total);
            merge(acc, src)
        })
}

/// Merge all `sources` into an empty tree.
pub fn merge_all(sources: &[Value]) -> Result<Value> {
    merge_to(Value::Null, sources)
}

fn merge_in_context(ctx: &mut MergeContext, dest: Value, src: &Value) -> Result<Value> {
    match (dest, src) {
        (Value::Null, src) => Ok(src.clone()),
        (dest, Value::Null) => Ok(dest),
        (Value::Object(mut dest_map), Value::Object(src_map)) => {
            for (key, src_value) in src_map {
                let merged = match dest_map.remove(key) {
                    Some(dest_value) => {
                        ctx.push(PathSegment::Key(key.clone()));
                        let merged = merge_in_context(ctx, dest_value, src_value)?;
                        ctx.pop();
                        merged
                    }
                    None => src_value.clone(),
                };
                dest_map.insert(key.clone(), merged);
            }
            Ok(Value::Object(dest_map))
        }
        (Value::Array(mut dest_items), Value::Array(src_items)) => {
            dest_items.extend(src_items.iter().cloned());
            Ok(Value::Array(dest_items))
        }
        (dest, src) if dest.kind() == src.kind() => {
            if dest == *src {
                Ok(dest)
            } else {
                Ok(src.clone())
            }
        }
        (dest, src) if dest.kind().is_scalar() && src.kind().is_scalar() => Err(Error::MergeType {
            path: ctx.to_string(),
            dest: dest.kind(),
            src: src.kind(),
        }),
        (dest, src) => Err(Error::MergeShape {
            path: ctx.to_string(),
            dest: dest.kind(),
            src: src.kind(),
        }),
    }
}
