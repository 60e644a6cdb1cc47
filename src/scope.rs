//! Scopes: the key/value environment a band instance's expressions see.
//!
//! A scope is the data object's top-level fields plus built-ins
//! (`_pageNumber`, `_totalPages`, `_anchors`) and loop bindings (the item
//! name, `_index`, `_groupKey`, `_groupCount`). The data fields are read-only
//! and shared by every scope of a section; each instance owns only its
//! bindings, which shadow data fields of the same name. Nothing is mutated
//! after placement except the final page-number stamp.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;
use serde_json::{Map, Value};

pub const PAGE_NUMBER: &str = "_pageNumber";
pub const TOTAL_PAGES: &str = "_totalPages";
pub const INDEX: &str = "_index";
pub const GROUP_KEY: &str = "_groupKey";
pub const GROUP_COUNT: &str = "_groupCount";
pub const ANCHORS: &str = "_anchors";

/// Serializes as its bindings only; the shared data is the caller's input.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Scope {
    #[serde(skip)]
    data: Arc<Map<String, Value>>,
    bindings: Map<String, Value>,
}

impl Scope {
    /// Build the section-wide base scope: `{...data, _pageNumber: 0,
    /// _totalPages: hint, _anchors}`. Non-object data contributes no fields.
    pub fn base(data: &Value, total_pages_hint: usize, anchors: &BTreeMap<String, usize>) -> Self {
        let data = match data {
            Value::Object(fields) => fields.clone(),
            _ => Map::new(),
        };
        let mut bindings = Map::new();
        bindings.insert(PAGE_NUMBER.to_string(), Value::from(0));
        bindings.insert(TOTAL_PAGES.to_string(), Value::from(total_pages_hint));
        let anchors: Map<String, Value> = anchors
            .iter()
            .map(|(name, page)| (name.clone(), Value::from(*page)))
            .collect();
        bindings.insert(ANCHORS.to_string(), Value::Object(anchors));
        Scope {
            data: Arc::new(data),
            bindings,
        }
    }

    /// A copy of this scope with one more binding.
    pub fn with(&self, key: &str, value: Value) -> Scope {
        self.with_all([(key, value)])
    }

    /// A copy of this scope with several more bindings. The data fields are
    /// shared, not copied.
    pub fn with_all<'k>(&self, bindings: impl IntoIterator<Item = (&'k str, Value)>) -> Scope {
        let mut own = self.bindings.clone();
        for (key, value) in bindings {
            own.insert(key.to_string(), value);
        }
        Scope {
            data: Arc::clone(&self.data),
            bindings: own,
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.bindings.get(key).or_else(|| self.data.get(key))
    }

    /// Resolve a dot-separated path such as `item.lines.0.qty`.
    pub fn resolve_path(&self, path: &str) -> Option<&Value> {
        let mut parts = path.split('.');
        let head = parts.next()?;
        let root = self.get(head)?;
        let rest: Vec<&str> = parts.collect();
        traverse(root, &rest)
    }

    pub(crate) fn stamp_page_number(&mut self, page_number: usize) {
        self.bindings
            .insert(PAGE_NUMBER.to_string(), Value::from(page_number));
    }

    pub fn page_number(&self) -> usize {
        self.get(PAGE_NUMBER)
            .and_then(Value::as_u64)
            .unwrap_or(0) as usize
    }

    /// Built-ins and loop bindings, without the data fields.
    pub fn bindings(&self) -> &Map<String, Value> {
        &self.bindings
    }

    #[cfg(test)]
    pub(crate) fn shares_data_with(&self, other: &Scope) -> bool {
        Arc::ptr_eq(&self.data, &other.data)
    }
}

/// Resolve a dot path against an arbitrary JSON value. Numeric segments index
/// into arrays. An empty path returns the value itself.
pub fn resolve_path<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    let path = path.trim();
    if path.is_empty() {
        return Some(value);
    }
    let parts: Vec<&str> = path.split('.').collect();
    traverse(value, &parts)
}

/// Traverse a JSON value by dot-path segments.
fn traverse<'a>(value: &'a Value, parts: &[&str]) -> Option<&'a Value> {
    let mut current = value;
    for part in parts {
        match current {
            Value::Object(map) => {
                current = map.get(*part)?;
            }
            Value::Array(arr) => {
                let idx: usize = part.parse().ok()?;
                current = arr.get(idx)?;
            }
            _ => return None,
        }
    }
    Some(current)
}

/// Stringify a value the way group keys and interpolation see it.
/// Strings are taken verbatim; null and missing values become empty.
pub fn value_to_string(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        Value::Array(_) | Value::Object(_) => v.to_string(),
    }
}

/// Determine if a JSON value is truthy.
pub fn is_truthy(v: &Value) -> bool {
    match v {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(_) => true,
    }
}
