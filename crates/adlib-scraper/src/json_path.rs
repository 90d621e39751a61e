//! Optional-path lookups over `serde_json::Value`.
//!
//! Upstream payloads are probed the way a dynamically typed client would:
//! a value only counts when it is "present", meaning non-null, non-false,
//! non-zero and non-empty for strings. Everything else is treated as absent
//! so a fallback chain moves on to its next candidate.

use serde_json::Value;

/// One step of a lookup path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Seg {
    Key(&'static str),
    Index(usize),
}

pub(crate) use Seg::{Index, Key};

/// Follows `path` from `root`. Returns `None` as soon as a step does not match
/// the shape (key on a non-object, index on a non-array, missing member).
pub(crate) fn get<'a>(root: &'a Value, path: &[Seg]) -> Option<&'a Value> {
    path.iter().try_fold(root, |current, seg| match (seg, current) {
        (Seg::Key(key), Value::Object(map)) => map.get(*key),
        (Seg::Index(i), Value::Array(items)) => items.get(*i),
        _ => None,
    })
}

/// Follows a key-only path.
pub(crate) fn get_keys<'a>(root: &'a Value, keys: &[&'static str]) -> Option<&'a Value> {
    keys.iter().try_fold(root, |current, key| current.as_object()?.get(*key))
}

pub(crate) fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Returns the value only if it is truthy.
pub(crate) fn present(value: Option<&Value>) -> Option<&Value> {
    value.filter(|v| is_truthy(v))
}

/// Renders a present scalar as a string. Numbers use their decimal form;
/// `true` renders as `"true"`. Objects and arrays are not strings.
pub(crate) fn present_string(value: Option<&Value>) -> Option<String> {
    match present(value)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

/// Returns the array only if it has at least one element.
pub(crate) fn non_empty_array(value: Option<&Value>) -> Option<&Vec<Value>> {
    value?.as_array().filter(|items| !items.is_empty())
}
