//! Parsed API responses.
//!
//! Responses are JSON objects whose shape varies per endpoint, so the model
//! keeps the raw map and exposes the few fields the crawler cares about as
//! optional accessors.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A raw link entry as it appears under a `links` object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawLink {
    pub href: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
}

/// A fetched API document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Document(Map<String, Value>);

impl Document {
    pub fn new(fields: Map<String, Value>) -> Self {
        Self(fields)
    }

    /// Returns `None` unless the value is a JSON object.
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(fields) => Some(Self(fields)),
            _ => None,
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// The top-level `links` object, if present and non-empty.
    pub fn links(&self) -> Option<&Map<String, Value>> {
        non_empty_links(self.0.get("links"))
    }

    /// The `resources` array of a list response.
    pub fn resources(&self) -> Option<&[Value]> {
        self.0
            .get("resources")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
    }

    /// The `links` object of the last entry in `resources`, if present and
    /// non-empty.
    pub fn last_resource_links(&self) -> Option<&Map<String, Value>> {
        self.resources()
            .and_then(<[Value]>::last)
            .and_then(|resource| non_empty_links(resource.get("links")))
    }
}

fn non_empty_links(value: Option<&Value>) -> Option<&Map<String, Value>> {
    value
        .and_then(Value::as_object)
        .filter(|links| !links.is_empty())
}
