//! Dotted-key flattening for nested documents.
//!
//! The in-memory engine addresses nested paths uniformly by flattening each
//! document into a single-level object whose keys are dot-separated paths
//! (`{"user": {"name": "a"}}` becomes `{"user.name": "a"}`). Arrays stay in
//! place, but object elements inside them are flattened recursively so that
//! wildcard-path predicates can probe them with the same dotted keys.
//! [`unflatten`] restores the nested shape on the way out.

use std::collections::HashMap;

use crate::value::Value;

const SEP: char = '.';

/// Flatten a document into a dotted-key object.
///
/// Non-object values are returned unchanged.
///
/// # Examples
///
/// ```
/// use xql_lang::{Value, flatten::flatten};
/// use std::collections::HashMap;
///
/// let mut inner = HashMap::new();
/// inner.insert("city".to_string(), Value::String("NY".to_string()));
/// let mut doc = HashMap::new();
/// doc.insert("address".to_string(), Value::Object(inner));
///
/// let flat = flatten(&Value::Object(doc));
/// let map = flat.as_object().unwrap();
/// assert_eq!(map.get("address.city"), Some(&Value::String("NY".to_string())));
/// ```
pub fn flatten(doc: &Value) -> Value {
    match doc {
        Value::Object(map) => {
            let mut out = HashMap::new();
            flatten_into(map, "", &mut out);
            Value::Object(out)
        }
        other => other.clone(),
    }
}

fn flatten_into(map: &HashMap<String, Value>, prefix: &str, out: &mut HashMap<String, Value>) {
    for (k, v) in map {
        let key = if prefix.is_empty() {
            k.clone()
        } else {
            format!("{prefix}{SEP}{k}")
        };
        match v {
            Value::Object(inner) => flatten_into(inner, &key, out),
            Value::Array(items) => {
                let flat_items = items.iter().map(flatten).collect();
                out.insert(key, Value::Array(flat_items));
            }
            other => {
                out.insert(key, other.clone());
            }
        }
    }
}

/// Rebuild a nested document from a dotted-key object.
///
/// Inverse of [`flatten`]; non-object values are returned unchanged. When a
/// dotted path runs through an existing non-object value, the leaf wins and
/// the previous value is replaced.
pub fn unflatten(doc: &Value) -> Value {
    match doc {
        Value::Object(map) => {
            let mut out = HashMap::new();
            for (k, v) in map {
                let v = match v {
                    Value::Array(items) => Value::Array(items.iter().map(unflatten).collect()),
                    other => other.clone(),
                };
                set_nested(&mut out, k, v);
            }
            Value::Object(out)
        }
        other => other.clone(),
    }
}

fn set_nested(out: &mut HashMap<String, Value>, path: &str, value: Value) {
    let mut parts = path.split(SEP).peekable();
    let mut current = out;
    while let Some(part) = parts.next() {
        if parts.peek().is_none() {
            current.insert(part.to_string(), value);
            return;
        }
        let entry = current
            .entry(part.to_string())
            .or_insert_with(|| Value::Object(HashMap::new()));
        if !matches!(entry, Value::Object(_)) {
            *entry = Value::Object(HashMap::new());
        }
        current = match entry {
            Value::Object(map) => map,
            _ => unreachable!(),
        };
    }
}
