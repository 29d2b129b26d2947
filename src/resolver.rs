//! # Include Resolution
//!
//! This module turns locations into fully merged trees. A document may list
//! other documents under the reserved top-level `includes` key; those are
//! resolved first and act as base layers beneath the document's own body.
//!
//! ## Process
//!
//! For each location:
//!
//! 1.  **Fetch**: The raw bytes are loaded through the configured
//!     [`Fetcher`].
//! 2.  **Expand**: If enabled, `$NAME` tokens are replaced with environment
//!     variables (see [`crate::expand`]).
//! 3.  **Decode**: The format is chosen from the location's extension, or
//!     detected when there is none.
//! 4.  **Extract includes**: The `includes` key is removed from the body and
//!     parsed into a list of locations ([`ParsedDocument`]).
//! 5.  **Recurse**: Each include is resolved relative to the current
//!     location, left to right, including its own includes.
//! 6.  **Fold**: The included trees are merged left to right, and the
//!     document's body is merged on top. A document always wins over what it
//!     includes, and later includes win over earlier ones.
//!
//! ## Cycle Detection
//!
//! Each branch of the resolution carries the chain of documents that led to
//! it. A location that appears twice in its own chain is a cycle and fails
//! with `Error::CircularInclude`. The same document included from two
//! separate branches is allowed.
//!
//! With [`Options::parallel`](crate::config::Options) set, sibling includes
//! are resolved concurrently with `rayon`, and their results are collected in
//! listed order before folding.

use std::borrow::Cow;
use std::sync::Arc;

use log::debug;
use rayon::prelude::*;

use crate::config::Options;
use crate::error::{Error, Result};
use crate::expand::expand_env;
use crate::fetch::{DefaultFetcher, Fetcher};
use crate::format::{self, Format};
use crate::location::{Location, ProcessWorkingDir, WorkingDir};
use crate::merge::{merge, merge_all};
use crate::value::Value;

/// The reserved key listing a document's includes.
pub const INCLUDES_KEY: &str = "includes";

/// A decoded document split into its body and its include list.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedDocument {
    /// The document with the `includes` key removed.
    pub body: Value,
    /// The raw include locations, in listed order.
    pub includes: Vec<String>,
}

impl ParsedDocument {
    /// Extracts the `includes` key from a decoded document.
    ///
    /// A missing or null `includes` means no includes. Anything other than an
    /// array of strings is an `Error::IncludesFormat`.
    pub fn from_value(value: Value) -> Result<Self> {
        let mut map = match value {
            Value::Object(map) => map,
            other => {
                return Ok(Self {
                    body: other,
                    includes: Vec::new(),
                })
            }
        };

        let includes = match map.remove(INCLUDES_KEY) {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Array(items)) => items
                .into_iter()
                .enumerate()
                .map(|(idx, item)| match item {
                    Value::String(s) => Ok(s),
                    other => Err(Error::IncludesFormat {
                        location: None,
                        message: format!(
                            "{}[{}] must be a string, found {}",
                            INCLUDES_KEY,
                            idx,
                            other.kind()
                        ),
                    }),
                })
                .collect::<Result<Vec<_>>>()?,
            Some(other) => {
                return Err(Error::IncludesFormat {
                    location: None,
                    message: format!(
                        "{} must be an array of strings, found {}",
                        INCLUDES_KEY,
                        other.kind()
                    ),
                })
            }
        };

        Ok(Self {
            body: Value::Object(map),
            includes,
        })
    }
}

/// Raw document bytes that are not fetched from a location.
#[derive(Debug, Clone)]
pub struct Source {
    /// Where the bytes came from, used to pick a format and as the base for
    /// relative includes. Without one, includes resolve against the working
    /// directory.
    pub location: Option<Location>,
    /// Overrides the format implied by `location`.
    pub format: Option<Format>,
    pub bytes: Vec<u8>,
}

impl Source {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            location: None,
            format: None,
            bytes: bytes.into(),
        }
    }

    pub fn with_location(mut self, location: Location) -> Self {
        self.location = Some(location);
        self
    }

    pub fn with_format(mut self, format: Format) -> Self {
        self.format = Some(format);
        self
    }

    fn name(&self) -> String {
        self.location
            .as_ref()
            .map(Location::to_string)
            .unwrap_or_else(|| "<data>".to_string())
    }
}

/// A document whose includes have been resolved but not yet merged.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedDocument {
    pub location: Option<Location>,
    /// The document's own body, without `includes`.
    pub body: Value,
    /// The fully resolved trees of its includes, in listed order.
    pub includes: Vec<Value>,
}

impl ResolvedDocument {
    /// Merges the includes left to right, then the body on top.
    pub fn into_value(self) -> Result<Value> {
        let base = merge_all(&self.includes)?;
        merge(base, &self.body)
    }
}

/// Resolves locations and raw sources into merged trees.
#[derive(Clone)]
pub struct Resolver {
    fetcher: Arc<dyn Fetcher>,
    working_dir: Arc<dyn WorkingDir>,
    options: Options,
}

impl Default for Resolver {
    fn default() -> Self {
        Self::new(
            Arc::new(DefaultFetcher::new()),
            Arc::new(ProcessWorkingDir),
            Options::default(),
        )
    }
}

impl Resolver {
    pub fn new(
        fetcher: Arc<dyn Fetcher>,
        working_dir: Arc<dyn WorkingDir>,
        options: Options,
    ) -> Self {
        Self {
            fetcher,
            working_dir,
            options,
        }
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    pub fn set_expand(&mut self, expand: bool) {
        self.options.expand = expand;
    }

    /// Parses a top-level location string against the working directory.
    pub fn parse_location(&self, raw: &str) -> Result<Location> {
        Location::parse(raw, self.working_dir.as_ref())
    }

    /// Resolves a single location and its includes.
    pub fn resolve(&self, location: &Location) -> Result<ResolvedDocument> {
        self.resolve_branch(location, &[])
    }

    /// Resolves each location into a merged tree, in order.
    pub fn resolve_trees(&self, locations: &[Location]) -> Result<Vec<Value>> {
        self.map_ordered(locations, |location| self.resolve_tree(location, &[]))
    }

    /// Resolves every location and merges the results left to right.
    pub fn resolve_all(&self, locations: &[Location]) -> Result<Value> {
        merge_all(&self.resolve_trees(locations)?)
    }

    /// Parses path or URL strings and resolves them like [`Self::resolve_all`].
    pub fn resolve_paths<S: AsRef<str>>(&self, raw: &[S]) -> Result<Value> {
        let locations = raw
            .iter()
            .map(|r| self.parse_location(r.as_ref()))
            .collect::<Result<Vec<_>>>()?;
        self.resolve_all(&locations)
    }

    /// Resolves the includes of a raw source.
    pub fn resolve_source(&self, source: &Source) -> Result<ResolvedDocument> {
        let format = source
            .format
            .or_else(|| source.location.as_ref().and_then(Format::for_location));
        let ancestors: Vec<Location> = source.location.iter().cloned().collect();
        self.build(
            &source.bytes,
            format,
            &source.name(),
            source.location.as_ref(),
            &ancestors,
        )
    }

    /// Resolves each source into a merged tree, in order.
    pub fn resolve_source_trees(&self, sources: &[Source]) -> Result<Vec<Value>> {
        self.map_ordered(sources, |source| {
            self.resolve_source(source)?
                .into_value()
                .map_err(|e| e.in_document(source.name()))
        })
    }

    fn resolve_tree(&self, location: &Location, ancestors: &[Location]) -> Result<Value> {
        self.resolve_branch(location, ancestors)?
            .into_value()
            .map_err(|e| e.in_document(location.to_string()))
    }

    fn resolve_branch(
        &self,
        location: &Location,
        ancestors: &[Location],
    ) -> Result<ResolvedDocument> {
        if ancestors.contains(location) {
            let cycle = ancestors
                .iter()
                .skip_while(|ancestor| *ancestor != location)
                .chain(std::iter::once(location))
                .map(Location::to_string)
                .collect::<Vec<_>>()
                .join(" -> ");
            return Err(Error::CircularInclude { cycle });
        }

        debug!("Fetching {}", location);
        let bytes = self.fetcher.fetch(location)?;

        let mut chain = ancestors.to_vec();
        chain.push(location.clone());
        self.build(
            &bytes,
            Format::for_location(location),
            &location.to_string(),
            Some(location),
            &chain,
        )
    }

    fn build(
        &self,
        bytes: &[u8],
        format: Option<Format>,
        name: &str,
        base: Option<&Location>,
        chain: &[Location],
    ) -> Result<ResolvedDocument> {
        let parsed = self.parse(bytes, format, name)?;
        debug!("{} lists {} include(s)", name, parsed.includes.len());

        let includes = self
            .resolve_includes(&parsed.includes, base, chain)
            .map_err(|e| e.in_document(name))?;

        Ok(ResolvedDocument {
            location: base.cloned(),
            body: parsed.body,
            includes,
        })
    }

    fn parse(&self, bytes: &[u8], format: Option<Format>, name: &str) -> Result<ParsedDocument> {
        let bytes = if self.options.expand {
            Cow::Owned(expand_env(bytes))
        } else {
            Cow::Borrowed(bytes)
        };
        let value = format::decode_document(&bytes, format, name)?;
        ParsedDocument::from_value(value).map_err(|e| match e {
            Error::IncludesFormat { message, .. } => Error::IncludesFormat {
                location: Some(name.to_string()),
                message,
            },
            other => other,
        })
    }

    fn resolve_includes(
        &self,
        includes: &[String],
        base: Option<&Location>,
        chain: &[Location],
    ) -> Result<Vec<Value>> {
        let locations = includes
            .iter()
            .map(|raw| match base {
                Some(base) => base.join(raw),
                None => self.parse_location(raw),
            })
            .collect::<Result<Vec<_>>>()?;
        self.map_ordered(&locations, |location| self.resolve_tree(location, chain))
    }

    /// Applies `f` to every item. In parallel mode all items run to
    /// completion, and the error reported is the first one in listed order,
    /// as in sequential mode.
    fn map_ordered<I, T, F>(&self, items: &[I], f: F) -> Result<Vec<T>>
    where
        I: Sync,
        T: Send,
        F: Fn(&I) -> Result<T> + Sync + Send,
    {
        if self.options.parallel {
            let results: Vec<Result<T>> = items.par_iter().map(f).collect();
            results.into_iter().collect()
        } else {
            items.iter().map(f).collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::MemoryFetcher;
    use crate::location::FixedWorkingDir;
    use serde_json::json;

    fn v(json: serde_json::Value) -> Value {
        Value::try_from(json).unwrap()
    }

    fn resolver_with(files: &[(&str, &str)], options: Options) -> Resolver {
        let mut fetcher = MemoryFetcher::new();
        for (path, content) in files {
            fetcher.add_file_string(path, content).unwrap();
        }
        Resolver::new(
            Arc::new(fetcher),
            Arc::new(FixedWorkingDir::new("/virtual")),
            options,
        )
    }

    fn resolver(files: &[(&str, &str)]) -> Resolver {
        resolver_with(files, Options::default())
    }

    #[test]
    fn test_parsed_document_no_includes() {
        let parsed = ParsedDocument::from_value(v(json!({"x": 1}))).unwrap();
        assert!(parsed.includes.is_empty());
        assert_eq!(parsed.body, v(json!({"x": 1})));
    }

    #[test]
    fn test_parsed_document_blank_and_null_includes() {
        for doc in [json!({"includes": [], "x": 1}), json!({"includes": null, "x": 1})] {
            let parsed = ParsedDocument::from_value(v(doc)).unwrap();
            assert!(parsed.includes.is_empty());
            assert_eq!(parsed.body, v(json!({"x": 1})));
        }
    }

    #[test]
    fn test_parsed_document_includes() {
        let parsed =
            ParsedDocument::from_value(v(json!({"includes": ["test1", "test2"], "x": 1})))
                .unwrap();
        assert_eq!(parsed.includes, vec!["test1", "test2"]);
        assert!(parsed.body.get(INCLUDES_KEY).is_none());
    }

    #[test]
    fn test_parsed_document_includes_not_array() {
        let err = ParsedDocument::from_value(v(json!({"includes": "not array"}))).unwrap_err();
        assert!(matches!(err, Error::IncludesFormat { .. }));
        assert!(err.to_string().contains("Could not extract includes"));
        assert!(err.to_string().contains("found string"));
    }

    #[test]
    fn test_parsed_document_includes_element_not_string() {
        let err = ParsedDocument::from_value(v(json!({"includes": ["a", 2]}))).unwrap_err();
        assert!(err.to_string().contains("includes[1] must be a string, found int"));
    }

    #[test]
    fn test_parsed_document_non_object_body() {
        let parsed = ParsedDocument::from_value(v(json!([1, 2]))).unwrap();
        assert_eq!(parsed.body, v(json!([1, 2])));
        assert!(parsed.includes.is_empty());
    }

    #[test]
    fn test_resolve_parent_and_child() {
        let r = resolver(&[
            (
                "/virtual/parent.json",
                r#"{"includes": ["child.json"], "k": "parent"}"#,
            ),
            (
                "/virtual/child.json",
                r#"{"k": "child", "only_child": "c"}"#,
            ),
        ]);
        let value = r.resolve_paths(&["parent.json"]).unwrap();
        assert_eq!(value, v(json!({"k": "parent", "only_child": "c"})));
    }

    #[test]
    fn test_include_precedence() {
        let r = resolver(&[
            (
                "/virtual/d.json",
                r#"{"includes": ["p.yaml", "c.toml"], "v": "D"}"#,
            ),
            ("/virtual/p.yaml", "v: P\nfrom_p: true\nshared: P\n"),
            ("/virtual/c.toml", "v = \"C\"\nshared = \"C\"\n"),
        ]);
        let location = r.parse_location("d.json").unwrap();
        let resolved = r.resolve(&location).unwrap();
        assert_eq!(resolved.location, Some(location));
        assert_eq!(resolved.body, v(json!({"v": "D"})));
        assert_eq!(
            resolved.includes,
            vec![
                v(json!({"v": "P", "from_p": true, "shared": "P"})),
                v(json!({"v": "C", "shared": "C"})),
            ]
        );
        assert_eq!(
            resolved.into_value().unwrap(),
            v(json!({"v": "D", "from_p": true, "shared": "C"}))
        );
    }

    #[test]
    fn test_nested_includes_resolve_relative_to_their_document() {
        let r = resolver(&[
            ("/virtual/app.json", r#"{"includes": ["conf/base.yaml"]}"#),
            (
                "/virtual/conf/base.yaml",
                "includes:\n- ../shared/common.json\nlevel: base\n",
            ),
            (
                "/virtual/shared/common.json",
                r#"{"level": "common", "common": true}"#,
            ),
        ]);
        let value = r.resolve_paths(&["app.json"]).unwrap();
        assert_eq!(value, v(json!({"level": "base", "common": true})));
    }

    #[test]
    fn test_includes_never_survive() {
        let r = resolver(&[
            ("/virtual/a.json", r#"{"includes": ["b.json"], "a": 1}"#),
            ("/virtual/b.json", r#"{"includes": ["c.json"], "b": 2}"#),
            ("/virtual/c.json", r#"{"includes": [], "c": 3}"#),
        ]);
        let value = r.resolve_paths(&["a.json"]).unwrap();
        assert_eq!(value, v(json!({"a": 1, "b": 2, "c": 3})));
    }

    #[test]
    fn test_resolve_all_later_locations_win() {
        let r = resolver(&[
            ("/virtual/one.json", r#"{"v": 1, "list": ["one"]}"#),
            ("/virtual/two.yaml", "v: 2\nlist: [two]\n"),
        ]);
        let value = r.resolve_paths(&["one.json", "two.yaml"]).unwrap();
        assert_eq!(value, v(json!({"v": 2, "list": ["one", "two"]})));
    }

    #[test]
    fn test_missing_include_fails_with_context() {
        let r = resolver(&[(
            "/virtual/parent.json",
            r#"{"includes": ["missing.json"]}"#,
        )]);
        let err = r.resolve_paths(&["parent.json"]).unwrap_err();
        let display = err.to_string();
        assert!(display.contains("Error processing file:///virtual/parent.json"));
        assert!(display.contains("Failed to load file:///virtual/missing.json"));
        assert!(matches!(err.root_cause(), Error::Load { .. }));
    }

    #[test]
    fn test_bad_includes_reports_location() {
        let r = resolver(&[("/virtual/bad.json", r#"{"includes": {"a": 1}}"#)]);
        let err = r.resolve_paths(&["bad.json"]).unwrap_err();
        match err {
            Error::IncludesFormat { location, .. } => {
                assert_eq!(location.as_deref(), Some("file:///virtual/bad.json"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_merge_conflict_inside_include_names_document() {
        let r = resolver(&[
            (
                "/virtual/parent.json",
                r#"{"includes": ["child.json"], "x": 1}"#,
            ),
            (
                "/virtual/child.json",
                r#"{"includes": ["grandchild.json"], "y": [1]}"#,
            ),
            ("/virtual/grandchild.json", r#"{"y": {"z": 1}}"#),
        ]);
        let err = r.resolve_paths(&["parent.json"]).unwrap_err();
        let display = err.to_string();
        assert!(display.contains("Error processing file:///virtual/child.json"));
        assert!(matches!(err.root_cause(), Error::MergeShape { .. }));
    }

    #[test]
    fn test_self_include_is_a_cycle() {
        let r = resolver(&[("/virtual/a.json", r#"{"includes": ["a.json"]}"#)]);
        let err = r.resolve_paths(&["a.json"]).unwrap_err();
        match err.root_cause() {
            Error::CircularInclude { cycle } => {
                assert_eq!(cycle, "file:///virtual/a.json -> file:///virtual/a.json");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_mutual_include_is_a_cycle() {
        let r = resolver(&[
            ("/virtual/root.json", r#"{"includes": ["a.json"]}"#),
            ("/virtual/a.json", r#"{"includes": ["b.json"]}"#),
            ("/virtual/b.json", r#"{"includes": ["a.json"]}"#),
        ]);
        let err = r.resolve_paths(&["root.json"]).unwrap_err();
        match err.root_cause() {
            Error::CircularInclude { cycle } => {
                assert_eq!(
                    cycle,
                    "file:///virtual/a.json -> file:///virtual/b.json -> file:///virtual/a.json"
                );
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_diamond_include_is_not_a_cycle() {
        let r = resolver(&[
            ("/virtual/top.json", r#"{"includes": ["left.json", "right.json"]}"#),
            ("/virtual/left.json", r#"{"includes": ["base.json"], "left": 1}"#),
            ("/virtual/right.json", r#"{"includes": ["base.json"], "right": 1}"#),
            ("/virtual/base.json", r#"{"tags": ["base"]}"#),
        ]);
        let value = r.resolve_paths(&["top.json"]).unwrap();
        assert_eq!(
            value,
            v(json!({"left": 1, "right": 1, "tags": ["base", "base"]}))
        );
    }

    #[test]
    fn test_parallel_resolution_keeps_listed_order() {
        let mut files = vec![(
            "/virtual/root.json".to_string(),
            json!({"includes": (0..16).map(|i| format!("part{}.json", i)).collect::<Vec<_>>()})
                .to_string(),
        )];
        for i in 0..16 {
            files.push((
                format!("/virtual/part{}.json", i),
                json!({"order": [i], "last": i}).to_string(),
            ));
        }
        let files: Vec<(&str, &str)> = files
            .iter()
            .map(|(p, c)| (p.as_str(), c.as_str()))
            .collect();

        let sequential = resolver(&files).resolve_paths(&["root.json"]).unwrap();
        let parallel = resolver_with(&files, Options::new().with_parallel(true))
            .resolve_paths(&["root.json"])
            .unwrap();

        assert_eq!(sequential, parallel);
        assert_eq!(parallel.get("last"), Some(&Value::Int(15)));
        let order: Vec<i64> = parallel
            .get("order")
            .and_then(Value::as_array)
            .unwrap()
            .iter()
            .filter_map(Value::as_i64)
            .collect();
        assert_eq!(order, (0..16).collect::<Vec<_>>());
    }

    #[test]
    fn test_parallel_resolution_reports_first_listed_error() {
        let includes: Vec<String> = (0..12).map(|i| format!("missing{}.json", i)).collect();
        let root = json!({"includes": includes}).to_string();
        let files = [("/virtual/root.json", root.as_str())];

        let sequential = resolver(&files).resolve_paths(&["root.json"]).unwrap_err();
        for _ in 0..8 {
            let parallel = resolver_with(&files, Options::new().with_parallel(true))
                .resolve_paths(&["root.json"])
                .unwrap_err();
            assert_eq!(parallel.to_string(), sequential.to_string());
        }
        assert!(sequential
            .to_string()
            .contains("Failed to load file:///virtual/missing0.json"));
    }

    #[test]
    fn test_resolve_source_without_location_uses_working_dir() {
        let r = resolver(&[("/virtual/base.json", r#"{"base": true, "v": 0}"#)]);
        let source = Source::new(r#"{"includes": ["base.json"], "v": 1}"#);
        let value = r.resolve_source(&source).unwrap().into_value().unwrap();
        assert_eq!(value, v(json!({"base": true, "v": 1})));
    }

    #[test]
    fn test_resolve_source_with_location_and_format() {
        let r = resolver(&[("/virtual/etc/base.toml", "v = 0\nbase = true\n")]);
        let location = r.parse_location("etc/app.conf").unwrap();
        let source = Source::new("includes = [\"base.toml\"]\nv = 1\n")
            .with_location(location)
            .with_format(Format::Toml);
        let value = r.resolve_source(&source).unwrap().into_value().unwrap();
        assert_eq!(value, v(json!({"base": true, "v": 1})));
    }

    #[test]
    fn test_resolve_source_missing_include() {
        let r = resolver(&[]);
        let err = r
            .resolve_source(&Source::new(r#"{"includes": ["missing"]}"#))
            .unwrap_err();
        assert!(err.to_string().contains("Error processing <data>"));
        assert!(err.to_string().contains("Failed to load"));
    }

    #[test]
    #[serial_test::serial]
    fn test_expand_applies_to_includes() {
        std::env::set_var("LAYERCONF_RESOLVER_PORT", "8443");
        let r = resolver_with(
            &[
                ("/virtual/app.json", r#"{"includes": ["net.yaml"]}"#),
                ("/virtual/net.yaml", "port: $LAYERCONF_RESOLVER_PORT\n"),
            ],
            Options::new().with_expand(true),
        );
        let value = r.resolve_paths(&["app.json"]);
        std::env::remove_var("LAYERCONF_RESOLVER_PORT");
        assert_eq!(value.unwrap(), v(json!({"port": 8443})));
    }

    #[test]
    fn test_fetches_happen_in_listed_order() {
        let mut fetcher = MemoryFetcher::new();
        fetcher
            .add_file_string("/virtual/root.json", r#"{"includes": ["a.json", "b.json"]}"#)
            .unwrap();
        fetcher
            .add_file_string("/virtual/a.json", r#"{"includes": ["c.json"]}"#)
            .unwrap();
        fetcher.add_file_string("/virtual/b.json", "{}").unwrap();
        fetcher.add_file_string("/virtual/c.json", "{}").unwrap();
        let fetcher = Arc::new(fetcher);

        let r = Resolver::new(
            fetcher.clone(),
            Arc::new(FixedWorkingDir::new("/virtual")),
            Options::default(),
        );
        r.resolve_paths(&["root.json"]).unwrap();
        assert_eq!(
            fetcher.requests(),
            vec![
                "file:///virtual/root.json",
                "file:///virtual/a.json",
                "file:///virtual/c.json",
                "file:///virtual/b.json",
            ]
        );
    }
}
