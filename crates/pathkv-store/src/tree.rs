//! Addressing and merging inside a record's value tree.
//!
//! Record values are [`serde_json::Value`]: scalars, sequences
//! (`Array`) and mappings (`Object`). Segments select mapping fields by
//! name; a segment that parses as an index selects a sequence element.
//! Writes past the end of a sequence extend it, padding any gap with
//! `null`, so existing elements are never dropped.

use serde_json::{Map, Value};

/// Find the node at `path`, or `None` if any segment is missing.
pub fn lookup<'a>(root: &'a Value, path: &[String]) -> Option<&'a Value> {
    path.iter().try_fold(root, |node, segment| match node {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    })
}

/// Mutable counterpart of [`lookup`]. Never creates nodes.
pub fn lookup_mut<'a>(root: &'a mut Value, path: &[String]) -> Option<&'a mut Value> {
    path.iter().try_fold(root, |node, segment| match node {
        Value::Object(map) => map.get_mut(segment),
        Value::Array(items) => segment
            .parse::<usize>()
            .ok()
            .and_then(move |i| items.get_mut(i)),
        _ => None,
    })
}

/// Whether `path` names an existing own field chain under `root`.
///
/// Unlike a defaulted read, a field holding `null` still counts.
pub fn contains(root: &Value, path: &[String]) -> bool {
    lookup(root, path).is_some()
}

/// Write `value` at `path`, creating intermediate mappings as needed.
///
/// Non-mapping intermediates are replaced by empty mappings, except
/// that a numeric segment into a sequence selects (or appends) an
/// element. At the
/// target, mapping-into-mapping merges recursively via [`merge`];
/// anything else replaces what was there. A `null` value removes the
/// target instead of storing it.
pub fn assign(root: &mut Value, path: &[String], value: Value) {
    if value.is_null() && !path.is_empty() {
        remove(root, path);
        return;
    }

    let mut node = root;
    for segment in path {
        node = descend_or_create(node, segment);
    }
    merge(node, value);
}

/// Remove the node at `path` from its parent. Returns whether it existed.
///
/// An empty path removes nothing.
pub fn remove(root: &mut Value, path: &[String]) -> bool {
    let Some((last, parents)) = path.split_last() else {
        return false;
    };
    match lookup_mut(root, parents) {
        Some(Value::Object(map)) => map.remove(last).is_some(),
        Some(Value::Array(items)) => match last.parse::<usize>() {
            Ok(i) if i < items.len() => {
                items.remove(i);
                true
            }
            _ => false,
        },
        _ => false,
    }
}

/// Recursively merge `incoming` into `target`.
///
/// Overlapping mappings merge key by key, with `null` fields deleting
/// the key. Every other combination replaces `target` outright.
pub fn merge(target: &mut Value, incoming: Value) {
    match (target, incoming) {
        (Value::Object(existing), Value::Object(fields)) => {
            for (key, value) in fields {
                if value.is_null() {
                    existing.remove(&key);
                    continue;
                }
                match existing.get_mut(&key) {
                    Some(slot) => merge(slot, value),
                    None => {
                        existing.insert(key, value);
                    }
                }
            }
        }
        (target, incoming) => *target = incoming,
    }
}

/// Falsy values start a fresh sequence on push: `null`, `false`, zero
/// and the empty string.
pub fn is_falsy(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f == 0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(_) | Value::Object(_) => false,
    }
}

fn descend_or_create<'a>(node: &'a mut Value, segment: &str) -> &'a mut Value {
    if let Some(index) = sequence_slot(node, segment) {
        return &mut node[index];
    }
    if !node.is_object() {
        *node = Value::Object(Map::new());
    }
    match node {
        Value::Object(map) => map
            .entry(segment.to_string())
            .or_insert_with(|| Value::Object(Map::new())),
        _ => unreachable!("node was just replaced by a mapping"),
    }
}

/// Index of the element `segment` selects in a sequence, growing the
/// sequence with `null`s when the index is at or past its end.
fn sequence_slot(node: &mut Value, segment: &str) -> Option<usize> {
    let Value::Array(items) = node else {
        return None;
    };
    let index = segment.parse::<usize>().ok()?;
    if index >= items.len() {
        items.resize(index + 1, Value::Null);
    }
    Some(index)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn p(raw: &str) -> Vec<String> {
        raw.split('.').map(str::to_string).collect()
    }

    #[test]
    fn lookup_walks_mappings_and_sequences() {
        let tree = json!({"a": {"b": [10, {"c": true}]}});
        assert_eq!(lookup(&tree, &p("a.b.0")), Some(&json!(10)));
        assert_eq!(lookup(&tree, &p("a.b.1.c")), Some(&json!(true)));
        assert_eq!(lookup(&tree, &p("a.x.y")), None);
        assert_eq!(lookup(&tree, &p("a.b.9")), None);
    }

    #[test]
    fn lookup_through_scalar_is_none() {
        let tree = json!({"a": "text"});
        assert_eq!(lookup(&tree, &p("a.b")), None);
    }

    #[test]
    fn contains_counts_null_fields() {
        let tree = json!({"a": null});
        assert!(contains(&tree, &p("a")));
        assert!(!contains(&tree, &p("b")));
    }

    #[test]
    fn assign_preserves_siblings() {
        let mut tree = json!({"x": 1});
        assign(&mut tree, &p("b"), json!(2));
        assert_eq!(tree, json!({"x": 1, "b": 2}));
    }

    #[test]
    fn assign_creates_intermediate_mappings() {
        let mut tree = json!({});
        assign(&mut tree, &p("a.b.c"), json!("deep"));
        assert_eq!(tree, json!({"a": {"b": {"c": "deep"}}}));
    }

    #[test]
    fn assign_replaces_scalar_intermediate() {
        let mut tree = json!({"a": 5});
        assign(&mut tree, &p("a.b"), json!(1));
        assert_eq!(tree, json!({"a": {"b": 1}}));
    }

    #[test]
    fn assign_replaces_non_mapping_root() {
        let mut tree = json!("");
        assign(&mut tree, &p("name"), json!("Alex"));
        assert_eq!(tree, json!({"name": "Alex"}));
    }

    #[test]
    fn assign_merges_overlapping_mappings() {
        let mut tree = json!({"profile": {"name": "Alex", "tags": ["a"]}});
        assign(&mut tree, &p("profile"), json!({"age": 33, "tags": ["b"]}));
        assert_eq!(
            tree,
            json!({"profile": {"name": "Alex", "age": 33, "tags": ["b"]}})
        );
    }

    #[test]
    fn assign_into_sequence_element() {
        let mut tree = json!({"list": [{"n": 1}, {"n": 2}]});
        assign(&mut tree, &p("list.1.n"), json!(20));
        assert_eq!(tree, json!({"list": [{"n": 1}, {"n": 20}]}));
    }

    #[test]
    fn assign_at_sequence_end_appends() {
        let mut tree = json!({"list": [1, 2]});
        assign(&mut tree, &p("list.2"), json!(3));
        assert_eq!(tree, json!({"list": [1, 2, 3]}));
    }

    #[test]
    fn assign_past_sequence_end_pads_with_null() {
        let mut tree = json!({"list": [1, 2]});
        assign(&mut tree, &p("list.4.name"), json!("x"));
        assert_eq!(tree, json!({"list": [1, 2, null, null, {"name": "x"}]}));
    }

    #[test]
    fn non_numeric_segment_on_sequence_becomes_mapping() {
        let mut tree = json!({"list": [1]});
        assign(&mut tree, &p("list.name"), json!("x"));
        assert_eq!(tree, json!({"list": {"name": "x"}}));
    }

    #[test]
    fn assign_null_deletes_field() {
        let mut tree = json!({"a": 1, "b": 2});
        assign(&mut tree, &p("a"), Value::Null);
        assert_eq!(tree, json!({"b": 2}));
    }

    #[test]
    fn merge_null_field_deletes_key() {
        let mut tree = json!({"a": 1, "b": 2});
        merge(&mut tree, json!({"a": null, "c": 3}));
        assert_eq!(tree, json!({"b": 2, "c": 3}));
    }

    #[test]
    fn remove_sequence_element() {
        let mut tree = json!({"list": ["x", "y", "z"]});
        assert!(remove(&mut tree, &p("list.1")));
        assert_eq!(tree, json!({"list": ["x", "z"]}));
        assert!(!remove(&mut tree, &p("list.7")));
    }

    #[test]
    fn remove_missing_is_false() {
        let mut tree = json!({"a": {}});
        assert!(!remove(&mut tree, &p("a.b")));
        assert!(!remove(&mut tree, &[]));
    }

    #[test]
    fn falsiness() {
        for v in [json!(null), json!(false), json!(0), json!(0.0), json!("")] {
            assert!(is_falsy(&v), "{v} should be falsy");
        }
        for v in [json!(true), json!(1), json!("x"), json!([]), json!({})] {
            assert!(!is_falsy(&v), "{v} should be truthy");
        }
    }
}
