//! Flattening of hierarchical configuration entries into a memory tree.
//!
//! Configuration providers expose an ordered sequence of
//! colon-delimited keys (`"luis:models:0:endpoint"`) with scalar
//! values. The settings scope materializes them once per turn into a
//! nested mapping/array tree compatible with the path evaluator.
//!
//! Runs of consecutive integer keys starting at 0 under a common parent
//! become array nodes; a non-numeric sibling forces the node back to a
//! mapping keyed by each element's positional index.

use serde_json::{Map, Value};
use std::cmp::Ordering;

/// Ordered configuration entries, as handed over by the host's provider.
pub type ConfigEntries = Vec<(String, Value)>;

/// Flatten configuration entries into a nested mapping/array tree.
///
/// Entries are sorted into a deterministic segment-wise order first
/// (numeric segments compare numerically and sort before non-numeric
/// siblings), so the result does not depend on the provider's
/// enumeration order.
pub fn flatten_settings(entries: &[(String, Value)]) -> Value {
    let mut sorted: Vec<&(String, Value)> = entries.iter().collect();
    sorted.sort_by(|a, b| compare_keys(&a.0, &b.0));

    let mut root = Value::Object(Map::new());
    for (key, value) in sorted {
        insert_entry(&mut root, key, value.clone());
    }
    root
}

/// Segment-wise natural ordering of colon-delimited keys.
fn compare_keys(a: &str, b: &str) -> Ordering {
    let mut left = a.split(':');
    let mut right = b.split(':');
    loop {
        match (left.next(), right.next()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(l), Some(r)) => {
                let ord = match (l.parse::<usize>(), r.parse::<usize>()) {
                    (Ok(li), Ok(ri)) => li.cmp(&ri),
                    // Numeric segments sort before non-numeric siblings
                    // so array runs are processed contiguously.
                    (Ok(_), Err(_)) => Ordering::Less,
                    (Err(_), Ok(_)) => Ordering::Greater,
                    (Err(_), Err(_)) => l.cmp(r),
                };
                if ord != Ordering::Equal {
                    return ord;
                }
            }
        }
    }
}

fn insert_entry(root: &mut Value, key: &str, value: Value) {
    let segments: Vec<&str> = key.split(':').collect();
    let (last, parents) = match segments.split_last() {
        Some(split) => split,
        None => return,
    };

    let mut node = root;
    for seg in parents {
        ensure_mapping(node);
        let map = match node.as_object_mut() {
            Some(map) => map,
            None => return,
        };
        node = map.entry(seg.to_string()).or_insert(Value::Null);
    }

    match last.parse::<usize>() {
        Ok(index) => store_numeric(node, index, value),
        Err(_) => store_named(node, last, value),
    }
}

/// Coerce a node into a mapping so a child segment can descend into it.
/// Arrays demote to index-keyed mappings; scalars are discarded.
fn ensure_mapping(node: &mut Value) {
    match node {
        Value::Object(_) => {}
        Value::Array(_) => array_to_mapping(node),
        _ => *node = Value::Object(Map::new()),
    }
}

/// Store a value under a numeric leaf segment.
fn store_numeric(node: &mut Value, index: usize, value: Value) {
    match node {
        // An empty mapping has seen no non-numeric siblings: promote it
        // to an array right-sized for the index.
        Value::Object(map) if map.is_empty() => {
            let mut arr = vec![Value::Null; index + 1];
            arr[index] = value;
            *node = Value::Array(arr);
        }
        // Non-numeric siblings already present: fall back to storing
        // under the index's string form.
        Value::Object(map) => {
            map.insert(index.to_string(), value);
        }
        Value::Array(arr) => {
            if arr.len() <= index {
                arr.resize(index + 1, Value::Null);
            }
            arr[index] = value;
        }
        _ => {
            let mut arr = vec![Value::Null; index + 1];
            arr[index] = value;
            *node = Value::Array(arr);
        }
    }
}

/// Store a value under a non-numeric leaf segment.
fn store_named(node: &mut Value, key: &str, value: Value) {
    if node.is_array() {
        array_to_mapping(node);
    }
    if !node.is_object() {
        *node = Value::Object(Map::new());
    }
    if let Some(map) = node.as_object_mut() {
        map.insert(key.to_string(), value);
    }
}

/// Convert an array node back into a mapping keyed by each element's
/// positional index as a string.
fn array_to_mapping(node: &mut Value) {
    if let Value::Array(arr) = node {
        let mut map = Map::new();
        for (i, item) in arr.drain(..).enumerate() {
            map.insert(i.to_string(), item);
        }
        *node = Value::Object(map);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn entries(pairs: &[(&str, &str)]) -> ConfigEntries {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), json!(v)))
            .collect()
    }

    #[test]
    fn test_flat_keys() {
        let result = flatten_settings(&entries(&[("host", "local"), ("port", "88")]));
        assert_eq!(result, json!({"host": "local", "port": "88"}));
    }

    #[test]
    fn test_nested_keys() {
        let result = flatten_settings(&entries(&[("a:b:c", "x")]));
        assert_eq!(result, json!({"a": {"b": {"c": "x"}}}));
    }

    #[test]
    fn test_numeric_run_becomes_array() {
        let result = flatten_settings(&entries(&[("a:0", "x"), ("a:1", "y")]));
        assert_eq!(result, json!({"a": ["x", "y"]}));
    }

    #[test]
    fn test_mixed_keys_fall_back_to_mapping() {
        let result = flatten_settings(&entries(&[("a:0", "x"), ("a:foo", "y")]));
        assert_eq!(result, json!({"a": {"0": "x", "foo": "y"}}));
    }

    #[test]
    fn test_interleaved_order_is_deterministic() {
        // Provider enumeration order must not change the result.
        let forward = flatten_settings(&entries(&[("a:0", "x"), ("a:foo", "y")]));
        let reversed = flatten_settings(&entries(&[("a:foo", "y"), ("a:0", "x")]));
        assert_eq!(forward, reversed);
        assert_eq!(forward, json!({"a": {"0": "x", "foo": "y"}}));
    }

    #[test]
    fn test_sparse_numeric_keys_right_size() {
        let result = flatten_settings(&entries(&[("a:2", "z")]));
        assert_eq!(result, json!({"a": [null, null, "z"]}));
    }

    #[test]
    fn test_numeric_segments_sort_numerically() {
        let result = flatten_settings(&entries(&[
            ("a:10", "ten"),
            ("a:2", "two"),
            ("a:0", "zero"),
            ("a:1", "one"),
        ]));
        let arr = result["a"].as_array().unwrap();
        assert_eq!(arr.len(), 11);
        assert_eq!(arr[0], "zero");
        assert_eq!(arr[2], "two");
        assert_eq!(arr[10], "ten");
    }

    #[test]
    fn test_numeric_intermediate_segment_stays_mapping() {
        let result = flatten_settings(&entries(&[("a:0:b", "x")]));
        assert_eq!(result, json!({"a": {"0": {"b": "x"}}}));
    }

    #[test]
    fn test_array_then_descent_demotes_to_mapping() {
        let result = flatten_settings(&entries(&[("a:0", "x"), ("a:1:b", "y")]));
        assert_eq!(result, json!({"a": {"0": "x", "1": {"b": "y"}}}));
    }
}
