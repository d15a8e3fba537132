//! Deep merge of live state with a restored snapshot
//!
//! Objects merge key by key, recursively. Where both sides hold arrays the
//! configured [`ArrayMergeFn`] decides. Any other conflict is won by the
//! saved side; live keys the snapshot omits are kept untouched.

use std::rc::Rc;

use serde_json::{Map, Value};

/// Resolves an array-vs-array conflict: `(live, saved) -> merged`
pub type ArrayMergeFn = Rc<dyn Fn(Vec<Value>, Vec<Value>) -> Vec<Value>>;

/// Pluggable merge: `(live, saved, options) -> merged`
pub type MergeFn = Rc<dyn Fn(Value, Value, &MergeOptions) -> Value>;

/// Knobs passed to the merge function
#[derive(Clone)]
pub struct MergeOptions {
    pub array_merge: ArrayMergeFn,
}

impl Default for MergeOptions {
    fn default() -> Self {
        Self {
            array_merge: Rc::new(array_merge::overwrite),
        }
    }
}

impl std::fmt::Debug for MergeOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MergeOptions").finish_non_exhaustive()
    }
}

/// Built-in array merge strategies
pub mod array_merge {
    use serde_json::Value;

    use super::{MergeOptions, deep_merge};

    /// Saved array replaces the live one (default)
    pub fn overwrite(_live: Vec<Value>, saved: Vec<Value>) -> Vec<Value> {
        saved
    }

    /// Live items followed by saved items
    pub fn concat(mut live: Vec<Value>, saved: Vec<Value>) -> Vec<Value> {
        live.extend(saved);
        live
    }

    /// Deep-merge items pairwise by index; extra saved items are appended,
    /// extra live items are kept.
    pub fn combine(live: Vec<Value>, saved: Vec<Value>) -> Vec<Value> {
        let options = MergeOptions {
            array_merge: std::rc::Rc::new(combine),
        };
        let mut live = live.into_iter();
        let mut merged: Vec<Value> = saved
            .into_iter()
            .map(|s| match live.next() {
                Some(l) => deep_merge(l, s, &options),
                None => s,
            })
            .collect();
        merged.extend(live);
        merged
    }
}

/// Default merge function.
///
/// Both sides are consumed; nothing is cloned. Always returns a structured
/// value when either input is one.
pub fn deep_merge(live: Value, saved: Value, options: &MergeOptions) -> Value {
    match (live, saved) {
        (Value::Object(live), Value::Object(saved)) => {
            Value::Object(merge_objects(live, saved, options))
        }
        (Value::Array(live), Value::Array(saved)) => {
            Value::Array((options.array_merge)(live, saved))
        }
        (_, saved) => saved,
    }
}

fn merge_objects(
    mut live: Map<String, Value>,
    saved: Map<String, Value>,
    options: &MergeOptions,
) -> Map<String, Value> {
    for (key, saved_value) in saved {
        let merged = match live.remove(&key) {
            Some(live_value) if is_mergeable(&saved_value) => {
                deep_merge(live_value, saved_value, options)
            }
            _ => saved_value,
        };
        live.insert(key, merged);
    }
    live
}

fn is_mergeable(value: &Value) -> bool {
    value.is_object() || value.is_array()
}
