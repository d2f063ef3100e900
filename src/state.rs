//! Dotted-path access into the JSON state tree
//!
//! State slices are addressed as `"counter"` or `"settings.audio.volume"`.
//! Array elements are addressed by index (`"items.0"`) for reads and for
//! writes to an existing element; writes create objects for anything missing.

use serde_json::{Map, Value};

/// Read the value at a dotted path
pub fn get_value<'a>(root: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(root, |node, segment| match node {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    })
}

/// Write `value` at a dotted path, creating intermediate objects.
///
/// Arrays along the path are kept when the segment is an in-range index.
/// Missing or scalar nodes (including the root) become empty objects.
pub fn set_value(root: &mut Value, path: &str, value: Value) {
    let mut segments = path.split('.').peekable();
    let mut node = root;
    while let Some(segment) = segments.next() {
        let slot = child_mut(node, segment);
        if segments.peek().is_none() {
            *slot = value;
            return;
        }
        node = slot;
    }
}

fn child_mut<'a>(node: &'a mut Value, segment: &str) -> &'a mut Value {
    let index = match node {
        Value::Array(items) => segment.parse::<usize>().ok().filter(|i| *i < items.len()),
        _ => None,
    };
    match (node, index) {
        (Value::Array(items), Some(i)) => &mut items[i],
        (node, _) => as_object(node)
            .entry(segment.to_string())
            .or_insert(Value::Null),
    }
}

/// Shallow union: `patch`'s top-level fields overwrite those of `target`,
/// other fields of `target` are kept.
///
/// Returns `false` (leaving `target` untouched) when `patch` is not an object.
pub fn merge_top_level(target: &mut Value, patch: Value) -> bool {
    let Value::Object(fields) = patch else {
        return false;
    };
    let map = as_object(target);
    for (name, value) in fields {
        map.insert(name, value);
    }
    true
}

fn as_object(node: &mut Value) -> &mut Map<String, Value> {
    if !node.is_object() {
        *node = Value::Object(Map::new());
    }
    match node {
        Value::Object(map) => map,
        _ => unreachable!("node was just replaced by an object"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    #[test]
    fn test_get_nested_and_indexed() {
        let state = json!({
            "counter": { "count": 3, "version": 1 },
            "todos": { "items": ["a", "b"] }
        });

        assert_eq!(get_value(&state, "counter.version"), Some(&json!(1)));
        assert_eq!(get_value(&state, "todos.items.1"), Some(&json!("b")));
        assert_eq!(get_value(&state, "counter.missing"), None);
        assert_eq!(get_value(&state, "counter.count.deeper"), None);
    }

    #[test]
    fn test_set_creates_intermediate_objects() {
        let mut state = json!({ "counter": { "count": 0 } });

        set_value(&mut state, "settings.audio.volume", json!(0.5));
        set_value(&mut state, "counter.count", json!(7));

        assert_eq!(
            state,
            json!({
                "counter": { "count": 7 },
                "settings": { "audio": { "volume": 0.5 } }
            })
        );
    }

    #[test]
    fn test_set_replaces_scalars_on_the_path() {
        let mut state = json!({ "counter": 5 });
        set_value(&mut state, "counter.count", json!(1));
        assert_eq!(state, json!({ "counter": { "count": 1 } }));

        let mut root = Value::Null;
        set_value(&mut root, "a", json!(true));
        assert_eq!(root, json!({ "a": true }));
    }

    #[test]
    fn test_set_keeps_arrays_on_the_path() {
        let mut state = json!({ "todos": { "items": ["a", "b"] } });

        set_value(&mut state, "todos.items.0", json!("z"));
        assert_eq!(state, json!({ "todos": { "items": ["z", "b"] } }));

        let mut state = json!({ "rows": [{ "done": false }, { "done": false }] });
        set_value(&mut state, "rows.1.done", json!(true));
        assert_eq!(state, json!({ "rows": [{ "done": false }, { "done": true }] }));
    }

    #[test]
    fn test_set_out_of_range_index_replaces_array() {
        let mut state = json!({ "items": ["a"] });
        set_value(&mut state, "items.5", json!("b"));
        assert_eq!(state, json!({ "items": { "5": "b" } }));
    }

    #[test]
    fn test_merge_top_level_keeps_siblings() {
        let mut state = json!({ "counter": { "count": 0 }, "lazyLoaded": { "count": 0 } });

        assert!(merge_top_level(&mut state, json!({ "counter": { "count": 100 } })));
        assert_eq!(
            state,
            json!({ "counter": { "count": 100 }, "lazyLoaded": { "count": 0 } })
        );

        assert!(!merge_top_level(&mut state, json!(42)));
        assert_eq!(state["counter"]["count"], json!(100));
    }

    fn path_strategy() -> impl Strategy<Value = String> {
        prop::collection::vec("[a-z]{1,6}", 1..4).prop_map(|segments| segments.join("."))
    }

    proptest! {
        #[test]
        fn prop_set_then_get(path in path_strategy(), n in any::<i64>()) {
            let mut state = json!({ "untouched": true });
            set_value(&mut state, &path, json!(n));
            prop_assert_eq!(get_value(&state, &path), Some(&json!(n)));
        }

        #[test]
        fn prop_merge_candidate_wins(a in any::<i32>(), b in any::<i32>(), c in any::<i32>()) {
            let mut state = json!({ "x": a, "y": b });
            merge_top_level(&mut state, json!({ "x": c }));
            prop_assert_eq!(&state["x"], &json!(c));
            prop_assert_eq!(&state["y"], &json!(b));
        }
    }
}
