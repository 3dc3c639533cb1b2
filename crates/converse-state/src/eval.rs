//! Segment walker: get/set/remove against a scope's backing node.
//!
//! All mapping-key comparisons are case-insensitive, since end users
//! author paths in mixed case. Walkers here only see concrete segments;
//! bracket expressions are resolved to keys or indices by the manager
//! before evaluation.

use crate::error::{value_type_name, StateError, StateResult};
use crate::path::Seg;
use serde_json::{Map, Value};

/// Find the stored spelling of `key` in `map`, ignoring ASCII case.
fn find_key_ci<'a>(map: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    // Exact spelling wins over a case-insensitive match.
    map.keys()
        .find(|k| k.as_str() == key)
        .or_else(|| map.keys().find(|k| k.eq_ignore_ascii_case(key)))
        .map(String::as_str)
}

/// Walk `segs` down from `node` for reading.
///
/// Missing keys, out-of-range indices and kind mismatches all resolve
/// to `None`; reads never fail on absent data.
pub fn get_at<'a>(node: &'a Value, segs: &[Seg]) -> StateResult<Option<&'a Value>> {
    let mut current = node;
    for seg in segs {
        let next = match seg {
            Seg::Key(key) => current
                .as_object()
                .and_then(|map| find_key_ci(map, key).and_then(|k| map.get(k))),
            Seg::Index(idx) => current.as_array().and_then(|arr| arr.get(*idx)),
            Seg::First => current.as_array().and_then(|arr| arr.first()),
            Seg::Expr(expr) => {
                return Err(StateError::invalid_operation(format!(
                    "unresolved bracket expression '{}'",
                    expr
                )))
            }
        };
        match next {
            Some(v) => current = v,
            None => return Ok(None),
        }
    }
    Ok(Some(current))
}

/// Walk `segs` down from `node` and set `value` at the end.
///
/// Missing intermediate mappings are created; nodes of the wrong kind
/// in the way are replaced by mappings, matching set-wins semantics.
/// Arrays are never created or grown: an index into a missing or short
/// array is an error.
pub fn set_at(node: &mut Value, segs: &[Seg], value: Value, full_path: &str) -> StateResult<()> {
    match segs {
        [] => {
            *node = value;
            Ok(())
        }
        [Seg::Key(key), rest @ ..] => {
            if !node.is_object() {
                *node = Value::Object(Map::new());
            }
            let map = node.as_object_mut().ok_or_else(|| {
                StateError::invalid_operation("object coercion failed during set")
            })?;
            let stored = find_key_ci(map, key).map(str::to_owned);
            if rest.is_empty() {
                map.insert(stored.unwrap_or_else(|| key.clone()), value);
                Ok(())
            } else {
                let entry = map
                    .entry(stored.unwrap_or_else(|| key.clone()))
                    .or_insert(Value::Null);
                set_at(entry, rest, value, full_path)
            }
        }
        [Seg::Index(idx), rest @ ..] => match node.as_array_mut() {
            Some(arr) => {
                if *idx >= arr.len() {
                    return Err(StateError::index_out_of_bounds(full_path, *idx, arr.len()));
                }
                if rest.is_empty() {
                    arr[*idx] = value;
                    Ok(())
                } else {
                    set_at(&mut arr[*idx], rest, value, full_path)
                }
            }
            None => Err(StateError::type_mismatch(
                full_path,
                "array",
                value_type_name(node),
            )),
        },
        [Seg::First, ..] => Err(StateError::invalid_path(
            full_path,
            "first() is a read-only accessor",
        )),
        [Seg::Expr(expr), ..] => Err(StateError::invalid_operation(format!(
            "unresolved bracket expression '{}'",
            expr
        ))),
    }
}

/// Walk `segs` down from `node` and remove the final element.
///
/// Returns `true` if something was removed. Missing paths are a no-op.
pub fn remove_at(node: &mut Value, segs: &[Seg], full_path: &str) -> StateResult<bool> {
    match segs {
        [] => Err(StateError::path_required("path")),
        [Seg::Key(key)] => Ok(match node.as_object_mut() {
            Some(map) => match find_key_ci(map, key).map(str::to_owned) {
                Some(stored) => map.remove(&stored).is_some(),
                None => false,
            },
            None => false,
        }),
        [Seg::Index(idx)] => Ok(match node.as_array_mut() {
            Some(arr) if *idx < arr.len() => {
                arr.remove(*idx);
                true
            }
            _ => false,
        }),
        [Seg::First, ..] => Err(StateError::invalid_path(
            full_path,
            "first() is a read-only accessor",
        )),
        [Seg::Key(key), rest @ ..] => match node.as_object_mut() {
            Some(map) => match find_key_ci(map, key).map(str::to_owned) {
                Some(stored) => match map.get_mut(&stored) {
                    Some(child) => remove_at(child, rest, full_path),
                    None => Ok(false),
                },
                None => Ok(false),
            },
            None => Ok(false),
        },
        [Seg::Index(idx), rest @ ..] => match node.as_array_mut() {
            Some(arr) => match arr.get_mut(*idx) {
                Some(child) => remove_at(child, rest, full_path),
                None => Ok(false),
            },
            None => Ok(false),
        },
        [Seg::Expr(expr), ..] => Err(StateError::invalid_operation(format!(
            "unresolved bracket expression '{}'",
            expr
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path::parse_path;
    use serde_json::json;

    fn segs(path: &str) -> Vec<Seg> {
        parse_path(path).unwrap().segments().to_vec()
    }

    #[test]
    fn test_get_nested() {
        let doc = json!({"a": {"b": [10, 20]}});
        let v = get_at(&doc, &segs("a.b[1]")).unwrap();
        assert_eq!(v, Some(&json!(20)));
    }

    #[test]
    fn test_get_case_insensitive() {
        let doc = json!({"Profile": {"Name": "kia"}});
        let v = get_at(&doc, &segs("pRoFiLe.nAmE")).unwrap();
        assert_eq!(v, Some(&json!("kia")));
    }

    #[test]
    fn test_get_missing_is_none() {
        let doc = json!({"a": 1});
        assert_eq!(get_at(&doc, &segs("b.c")).unwrap(), None);
        // Kind mismatch reads as missing, not as an error.
        assert_eq!(get_at(&doc, &segs("a[0]")).unwrap(), None);
    }

    #[test]
    fn test_get_first() {
        let doc = json!({"items": ["x", "y"]});
        assert_eq!(
            get_at(&doc, &segs("items.first()")).unwrap(),
            Some(&json!("x"))
        );

        let empty = json!({"items": []});
        assert_eq!(get_at(&empty, &segs("items.first()")).unwrap(), None);
    }

    #[test]
    fn test_set_creates_intermediate_mappings() {
        let mut doc = json!({});
        set_at(&mut doc, &segs("a.b.c"), json!(42), "a.b.c").unwrap();
        assert_eq!(doc, json!({"a": {"b": {"c": 42}}}));
    }

    #[test]
    fn test_set_reuses_existing_key_spelling() {
        let mut doc = json!({});
        set_at(&mut doc, &segs("UseR.nuM"), json!(15), "UseR.nuM").unwrap();
        set_at(&mut doc, &segs("uSeR.NuM"), json!(25), "uSeR.NuM").unwrap();

        let map = doc.as_object().unwrap();
        assert_eq!(map.len(), 1);
        assert_eq!(
            get_at(&doc, &segs("user.num")).unwrap(),
            Some(&json!(25))
        );
    }

    #[test]
    fn test_set_never_creates_arrays() {
        let mut doc = json!({});
        let err = set_at(&mut doc, &segs("a[0]"), json!(1), "a[0]").unwrap_err();
        assert!(matches!(err, StateError::TypeMismatch { .. }));
    }

    #[test]
    fn test_set_index_out_of_bounds() {
        let mut doc = json!({"arr": [1]});
        let err = set_at(&mut doc, &segs("arr[3]"), json!(9), "arr[3]").unwrap_err();
        assert!(matches!(err, StateError::IndexOutOfBounds { .. }));
    }

    #[test]
    fn test_set_into_existing_array() {
        let mut doc = json!({"arr": [1, 2]});
        set_at(&mut doc, &segs("arr[1]"), json!(9), "arr[1]").unwrap();
        assert_eq!(doc["arr"], json!([1, 9]));
    }

    #[test]
    fn test_set_through_first_rejected() {
        let mut doc = json!({"arr": [{}]});
        let err = set_at(&mut doc, &segs("arr.first().x"), json!(1), "arr.first().x").unwrap_err();
        assert!(matches!(err, StateError::InvalidPath { .. }));
    }

    #[test]
    fn test_remove_key() {
        let mut doc = json!({"a": {"B": 1, "c": 2}});
        assert!(remove_at(&mut doc, &segs("a.b"), "a.b").unwrap());
        assert_eq!(doc, json!({"a": {"c": 2}}));
    }

    #[test]
    fn test_remove_missing_is_noop() {
        let mut doc = json!({"a": 1});
        assert!(!remove_at(&mut doc, &segs("b.c"), "b.c").unwrap());
        assert_eq!(doc, json!({"a": 1}));
    }

    #[test]
    fn test_remove_array_element() {
        let mut doc = json!({"arr": [1, 2, 3]});
        assert!(remove_at(&mut doc, &segs("arr[1]"), "arr[1]").unwrap());
        assert_eq!(doc["arr"], json!([1, 3]));
    }
}
