//! Property-based tests for the merge engine.
//!
//! These tests use proptest to generate random trees and verify that the
//! merge rules hold for all of them.

#[cfg(test)]
mod proptest_tests {
    use crate::format::{json, toml, yaml};
    use crate::merge::{merge, merge_all, merge_to};
    use crate::value::Value;
    use proptest::prelude::*;

    /// Any finite float, covering subnormals and both ends of the exponent
    /// range.
    fn finite_float() -> impl Strategy<Value = f64> {
        any::<f64>().prop_filter("finite", |f| f.is_finite())
    }

    fn present_scalar() -> impl Strategy<Value = Value> {
        prop_oneof![
            any::<bool>().prop_map(Value::Bool),
            any::<i64>().prop_map(Value::Int),
            finite_float().prop_map(Value::Float),
            "[a-z]{0,8}".prop_map(Value::String),
        ]
    }

    fn scalar() -> impl Strategy<Value = Value> {
        prop_oneof![Just(Value::Null), present_scalar()]
    }

    /// Small trees with few distinct keys, so merges often collide.
    fn tree() -> impl Strategy<Value = Value> {
        scalar().prop_recursive(3, 24, 4, |inner| {
            prop_oneof![
                prop::collection::vec(inner.clone(), 0..4).prop_map(Value::Array),
                prop::collection::btree_map("[a-c]", inner, 0..4).prop_map(Value::Object),
            ]
        })
    }

    /// Object trees without nulls, which every format can represent.
    fn null_free_object() -> impl Strategy<Value = Value> {
        let leaf = present_scalar().prop_recursive(3, 24, 4, |inner| {
            prop_oneof![
                prop::collection::vec(inner.clone(), 0..4).prop_map(Value::Array),
                prop::collection::btree_map("[a-c]", inner, 0..4).prop_map(Value::Object),
            ]
        });
        prop::collection::btree_map("[a-e]", leaf, 0..5).prop_map(Value::Object)
    }

    fn outcome(result: crate::error::Result<Value>) -> Result<Value, String> {
        result.map_err(|e| e.to_string())
    }

    proptest! {
        /// Property: null is the identity on both sides
        #[test]
        fn null_is_identity(v in tree()) {
            prop_assert_eq!(merge(Value::Null, &v).unwrap(), v.clone());
            prop_assert_eq!(merge(v.clone(), &Value::Null).unwrap(), v);
        }

        /// Property: merging a list of layers equals merging them one at a time
        #[test]
        fn sequential_fold_law(d in tree(), a in tree(), b in tree()) {
            let folded = outcome(merge_to(d.clone(), &[a.clone(), b.clone()]));
            let stepwise = outcome(merge(d, &a).and_then(|da| merge(da, &b)));
            prop_assert_eq!(folded, stepwise);
        }

        /// Property: merge_all starts from null
        #[test]
        fn merge_all_starts_from_null(layers in prop::collection::vec(tree(), 0..4)) {
            prop_assert_eq!(
                outcome(merge_all(&layers)),
                outcome(merge_to(Value::Null, &layers))
            );
        }

        /// Property: merging a scalar into itself yields the same scalar
        #[test]
        fn scalar_merge_is_idempotent(s in scalar()) {
            prop_assert_eq!(merge(s.clone(), &s).unwrap(), s);
        }

        /// Property: arrays concatenate, destination first
        #[test]
        fn arrays_concatenate(
            a in prop::collection::vec(tree(), 0..5),
            b in prop::collection::vec(tree(), 0..5),
        ) {
            let merged = merge(Value::Array(a.clone()), &Value::Array(b.clone())).unwrap();
            let items = merged.as_array().unwrap();
            prop_assert_eq!(items.len(), a.len() + b.len());
            prop_assert_eq!(&items[..a.len()], &a[..]);
            prop_assert_eq!(&items[a.len()..], &b[..]);
        }

        /// Property: a successful object merge keeps the union of keys
        #[test]
        fn object_merge_keeps_all_keys(
            a in prop::collection::btree_map("[a-e]", scalar(), 0..5),
            b in prop::collection::btree_map("[a-e]", scalar(), 0..5),
        ) {
            if let Ok(merged) = merge(Value::Object(a.clone()), &Value::Object(b.clone())) {
                let map = merged.as_object().unwrap();
                for key in a.keys().chain(b.keys()) {
                    prop_assert!(map.contains_key(key), "missing key {}", key);
                }
                prop_assert!(map.keys().all(|k| a.contains_key(k) || b.contains_key(k)));
            }
        }

        /// Property: JSON encoding round-trips every tree
        #[test]
        fn json_round_trip(v in tree()) {
            let bytes = json::encode(&v).unwrap();
            prop_assert_eq!(json::decode(&bytes).unwrap(), v);
        }

        /// Property: YAML encoding round-trips every null-free tree
        #[test]
        fn yaml_round_trip(v in null_free_object()) {
            let bytes = yaml::encode(&v).unwrap();
            prop_assert_eq!(yaml::decode(&bytes).unwrap(), v);
        }

        /// Property: TOML encoding round-trips every null-free tree
        #[test]
        fn toml_round_trip(v in null_free_object()) {
            let bytes = toml::encode(&v).unwrap();
            prop_assert_eq!(toml::decode(&bytes).unwrap(), v);
        }
    }
}
