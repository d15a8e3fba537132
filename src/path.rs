//! Dotted/bracketed addressing into JSON state trees
//!
//! `"user.tags[0].name"` addresses `state["user"]["tags"][0]["name"]`.
//! Numeric segments index arrays; on objects they are plain keys.

use serde_json::{Map, Value};

/// Split a path into its segments. `.`, `[` and `]` are separators;
/// empty pieces are dropped, so `"a..b"` and `"a[b]"` both give `["a", "b"]`.
pub fn segments(path: &str) -> Vec<&str> {
    path.split(['.', '[', ']'])
        .filter(|s| !s.is_empty())
        .collect()
}

/// Read the value at `path`. None if any step is missing.
pub fn get<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    segments(path)
        .into_iter()
        .try_fold(value, |current, segment| child(current, segment))
}

fn child<'a>(value: &'a Value, segment: &str) -> Option<&'a Value> {
    match value {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    }
}

/// Write `new` at `path`, creating missing intermediates as objects.
///
/// Existing containers are never replaced: objects take any segment as a
/// key, arrays take an index up to their length (equal to the length
/// appends). Returns false, leaving `target` untouched, when an array
/// cannot take its segment. An empty path replaces `target` itself.
pub fn set(target: &mut Value, path: &str, new: Value) -> bool {
    let segs = segments(path);
    if !fits(target, &segs) {
        return false;
    }
    let Some((last, parents)) = segs.split_last() else {
        *target = new;
        return true;
    };

    let mut current = target;
    for segment in parents {
        current = slot(current, segment);
        if !current.is_object() && !current.is_array() {
            *current = Value::Object(Map::new());
        }
    }
    *slot(current, last) = new;
    true
}

/// Whether every array along `segs` can take its segment
fn fits(target: &Value, segs: &[&str]) -> bool {
    let mut current = Some(target);
    for segment in segs {
        current = match current {
            Some(Value::Array(items)) => match segment.parse::<usize>() {
                Ok(i) if i <= items.len() => items.get(i),
                _ => return false,
            },
            Some(Value::Object(map)) => map.get(*segment),
            _ => None,
        };
    }
    true
}

/// Slot for `segment` inside a container, or the container itself made
/// into an object when it is a scalar. Callers check array bounds first.
fn slot<'a>(value: &'a mut Value, segment: &str) -> &'a mut Value {
    if !value.is_object() && !value.is_array() {
        *value = Value::Object(Map::new());
    }
    match value {
        Value::Array(items) => {
            let i = segment.parse::<usize>().unwrap_or(items.len());
            if i == items.len() {
                items.push(Value::Null);
            }
            &mut items[i]
        }
        Value::Object(map) => map.entry(segment.to_string()).or_insert(Value::Null),
        _ => unreachable!("value was just made a container"),
    }
}

/// Build a fresh value holding only the given paths of `source`.
///
/// Paths are applied in order; a path whose source value is missing is
/// skipped without creating intermediates. Every intermediate container
/// has the same kind as the source container at that position, so object
/// keys that look like numbers stay object keys.
pub fn project(source: &Value, paths: &[String]) -> Value {
    let mut projected = Value::Object(Map::new());
    for path in paths {
        let segs = segments(path);
        if segs.is_empty() {
            projected = source.clone();
        } else if get(source, path).is_some() {
            copy_along(&mut projected, source, &segs);
        }
    }
    projected
}

/// Copy `source` at `segs` into `target`, mirroring container kinds.
/// The path is known to exist in `source`.
fn copy_along(target: &mut Value, source: &Value, segs: &[&str]) {
    let Some((segment, rest)) = segs.split_first() else {
        *target = source.clone();
        return;
    };

    match source {
        Value::Object(src) => {
            if !target.is_object() {
                *target = Value::Object(Map::new());
            }
            let (Some(next_src), Value::Object(map)) = (src.get(*segment), target) else {
                return;
            };
            let next = map.entry(segment.to_string()).or_insert(Value::Null);
            copy_along(next, next_src, rest);
        }
        Value::Array(src) => {
            let Some((i, next_src)) = segment
                .parse::<usize>()
                .ok()
                .and_then(|i| src.get(i).map(|v| (i, v)))
            else {
                return;
            };
            if !target.is_array() {
                *target = Value::Array(Vec::new());
            }
            let Value::Array(items) = target else {
                return;
            };
            // Bounded by the source array's length
            if items.len() <= i {
                items.resize(i + 1, Value::Null);
            }
            copy_along(&mut items[i], next_src, rest);
        }
        _ => {}
    }
}
