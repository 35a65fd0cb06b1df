//! The flat, position-indexed query encoding.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A single query-string parameter value.
///
/// Most parameters are plain strings; a handful of pass-through fields
/// (e.g. `bug_status`) are arrays, which the HTTP layer serializes by
/// repeating the key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    /// A single value, serialized as one `key=value` pair.
    Single(String),
    /// Multiple values, serialized by repeating the key.
    Many(Vec<String>),
}

impl ParamValue {
    /// Returns the value as a string slice if it is a single value.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ParamValue::Single(s) => Some(s),
            ParamValue::Many(_) => None,
        }
    }

    /// Converts a JSON value into a parameter value.
    ///
    /// Arrays become [`ParamValue::Many`]; everything else is stringified
    /// (bare strings without surrounding quotes).
    pub fn from_json(value: &serde_json::Value) -> Self {
        match value {
            serde_json::Value::Array(items) => {
                ParamValue::Many(items.iter().map(json_to_string).collect())
            }
            other => ParamValue::Single(json_to_string(other)),
        }
    }
}

/// Stringifies a JSON scalar without the quotes `Value::to_string` adds.
pub(crate) fn json_to_string(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        ParamValue::Single(value.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        ParamValue::Single(value)
    }
}

impl From<i64> for ParamValue {
    fn from(value: i64) -> Self {
        ParamValue::Single(value.to_string())
    }
}

impl From<Vec<String>> for ParamValue {
    fn from(values: Vec<String>) -> Self {
        ParamValue::Many(values)
    }
}

/// A compiled, flat query for the bug-search endpoint.
///
/// Keys are either pass-through field names (`component`, `order`, …) or the
/// positional triplets `f{n}`/`o{n}`/`v{n}` with group markers `j{n}` and
/// `j_top`. Nesting is encoded entirely in the key names, so the map itself
/// needs no order beyond being deterministic.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FlatQuery {
    #[serde(flatten)]
    params: BTreeMap<String, ParamValue>,
}

impl FlatQuery {
    /// Creates an empty query.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a parameter, replacing any previous value for the key.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<ParamValue>) {
        self.params.insert(key.into(), value.into());
    }

    /// Returns the value for a key, if present.
    pub fn get(&self, key: &str) -> Option<&ParamValue> {
        self.params.get(key)
    }

    /// Returns the single-string value for a key, if present.
    ///
    /// Array-valued parameters return `None`; use [`FlatQuery::get`] for those.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(ParamValue::as_str)
    }

    /// Returns true if no parameters have been emitted.
    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Returns the number of parameters (array values count once).
    pub fn len(&self) -> usize {
        self.params.len()
    }

    /// Iterates over all parameters in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
        self.params.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Flattens the query into `(key, value)` pairs for URL encoding.
    ///
    /// Array-valued parameters repeat the key once per element.
    pub fn to_pairs(&self) -> Vec<(&str, &str)> {
        let mut pairs = Vec::with_capacity(self.params.len());
        for (key, value) in &self.params {
            match value {
                ParamValue::Single(v) => pairs.push((key.as_str(), v.as_str())),
                ParamValue::Many(vs) => {
                    pairs.extend(vs.iter().map(|v| (key.as_str(), v.as_str())));
                }
            }
        }
        pairs
    }

    /// Serializes the query as a URL query string.
    pub fn to_query_string(&self) -> Result<String, serde_urlencoded::ser::Error> {
        serde_urlencoded::to_string(self.to_pairs())
    }
}
