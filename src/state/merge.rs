//! Reconciliation merge between persisted state and in-memory state.
//!
//! `merge_state(target, source)` is applied with the fresh persisted read as
//! `target` and the (possibly partially loaded) in-memory state as `source`.
//!
//! The rule has two tiers:
//!
//! * While `source` knows every key `target` has at a level, the merge is a
//!   deep union: keys are merged recursively where both sides are objects.
//! * At the first level where `target` has a key that `source` does not
//!   recognize, that key is preserved, and every key `source` does carry is
//!   written over wholesale with no further recursion.
//!
//! The second tier keeps unloaded branches (other characters, other
//! instances) while letting a loaded branch replace its persisted copy
//! outright. It is not a full recursive union.
//!
//! Non-object inputs never fail: the source value wins at that level.

use serde_json::{Map, Value};

/// Merge `source` onto `target`.
pub fn merge_state(target: &Value, source: &Value) -> Value {
    match (target, source) {
        (Value::Object(target), Value::Object(source)) => Value::Object(merge_maps(target, source)),
        _ => source.clone(),
    }
}

fn merge_maps(target: &Map<String, Value>, source: &Map<String, Value>) -> Map<String, Value> {
    let mut merged = target.clone();
    let source_covers_target = target.keys().all(|key| source.contains_key(key));

    for (key, incoming) in source {
        let value = match merged.get(key) {
            Some(existing) if source_covers_target && existing.is_object() && incoming.is_object() => {
                merge_state(existing, incoming)
            }
            _ => incoming.clone(),
        };
        merged.insert(key.clone(), value);
    }

    merged
}
