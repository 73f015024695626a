use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use libris_core::ExternalId;

/// A raw metadata value: sources return either one string or a list of them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetadataValue {
    Scalar(String),
    List(Vec<String>),
}

impl MetadataValue {
    /// Join a list with `separator`; a scalar is returned as-is.
    pub fn joined(&self, separator: &str) -> String {
        match self {
            MetadataValue::Scalar(s) => s.clone(),
            MetadataValue::List(items) => items.join(separator),
        }
    }

    /// The scalar, or the first list element.
    pub fn first(&self) -> Option<&str> {
        match self {
            MetadataValue::Scalar(s) => Some(s),
            MetadataValue::List(items) => items.first().map(String::as_str),
        }
    }

    fn from_json(value: &JsonValue) -> Option<Self> {
        match value {
            JsonValue::String(s) => Some(Self::Scalar(s.clone())),
            JsonValue::Number(n) => Some(Self::Scalar(n.to_string())),
            JsonValue::Bool(b) => Some(Self::Scalar(b.to_string())),
            JsonValue::Array(items) => Some(Self::List(
                items
                    .iter()
                    .filter_map(|item| match item {
                        JsonValue::String(s) => Some(s.clone()),
                        JsonValue::Number(n) => Some(n.to_string()),
                        JsonValue::Bool(b) => Some(b.to_string()),
                        _ => None,
                    })
                    .collect(),
            )),
            JsonValue::Null | JsonValue::Object(_) => None,
        }
    }
}

impl From<&str> for MetadataValue {
    fn from(value: &str) -> Self {
        Self::Scalar(value.to_string())
    }
}

impl From<Vec<&str>> for MetadataValue {
    fn from(value: Vec<&str>) -> Self {
        Self::List(value.into_iter().map(str::to_string).collect())
    }
}

/// Unordered key → value metadata as delivered by the source.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawMetadata(BTreeMap<String, MetadataValue>);

impl RawMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<MetadataValue>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<MetadataValue>) {
        self.0.insert(key.into(), value.into());
    }

    /// Insert only when `key` is absent.
    pub fn insert_missing(&mut self, key: impl Into<String>, value: impl Into<MetadataValue>) {
        self.0.entry(key.into()).or_insert_with(|| value.into());
    }

    /// Take every field of `other` whose key is absent here.
    pub fn merge_missing(&mut self, other: RawMetadata) {
        for (key, value) in other.0 {
            self.0.entry(key).or_insert(value);
        }
    }

    pub fn get(&self, key: &str) -> Option<&MetadataValue> {
        self.0.get(key)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Build from a JSON object. Nulls, nested objects and non-object input are dropped.
    pub fn from_json(value: &JsonValue) -> Self {
        let map = value
            .as_object()
            .map(|obj| {
                obj.iter()
                    .filter_map(|(k, v)| MetadataValue::from_json(v).map(|v| (k.clone(), v)))
                    .collect()
            })
            .unwrap_or_default();
        Self(map)
    }
}

/// One record returned by a source query.
///
/// Search results carry the identifier and a few listing fields; the full
/// metadata and the content are fetched separately. Listing fields only fill
/// gaps in the fetched metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceItem {
    pub identifier: ExternalId,
    pub metadata: RawMetadata,
    pub content: Option<String>,
}

impl SourceItem {
    pub fn new(identifier: impl Into<ExternalId>) -> Self {
        Self {
            identifier: identifier.into(),
            metadata: RawMetadata::new(),
            content: None,
        }
    }

    pub fn with_metadata(mut self, metadata: RawMetadata) -> Self {
        self.metadata = metadata;
        self
    }
}

/// Metadata and file list of one item, as fetched together.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemDetails {
    pub metadata: RawMetadata,
    pub files: Vec<FileEntry>,
}

/// A file attached to a source item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEntry {
    pub name: String,
}

impl FileEntry {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// One page of query results.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchPage {
    pub items: Vec<SourceItem>,
    /// Total matches reported by the source, when known.
    pub total: Option<usize>,
}

/// Query for the text items of one collection.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CollectionQuery {
    collection: String,
}

impl CollectionQuery {
    pub fn new(collection: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
        }
    }
}

impl fmt::Display for CollectionQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "collection:({}) AND mediatype:(texts)", self.collection)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn from_json_keeps_scalars_and_lists() {
        let raw = RawMetadata::from_json(&json!({
            "identifier": "alice",
            "creator": ["Carroll, Lewis", "Tenniel, John"],
            "downloads": 42,
            "nested": {"a": 1},
            "missing": null
        }));

        assert_eq!(raw.get("identifier"), Some(&MetadataValue::from("alice")));
        assert_eq!(
            raw.get("creator"),
            Some(&MetadataValue::from(vec!["Carroll, Lewis", "Tenniel, John"]))
        );
        assert_eq!(raw.get("downloads"), Some(&MetadataValue::from("42")));
        assert_eq!(raw.get("nested"), None);
        assert_eq!(raw.get("missing"), None);
    }

    #[test]
    fn from_json_on_non_object_is_empty() {
        assert!(RawMetadata::from_json(&json!([1, 2])).is_empty());
    }

    #[test]
    fn insert_missing_does_not_overwrite() {
        let mut raw = RawMetadata::new().with("identifier", "from-metadata");
        raw.insert_missing("identifier", "from-search");
        raw.insert_missing("title", "Alice");

        assert_eq!(raw.get("identifier").and_then(MetadataValue::first), Some("from-metadata"));
        assert_eq!(raw.get("title").and_then(MetadataValue::first), Some("Alice"));
    }

    #[test]
    fn merge_missing_keeps_existing_fields() {
        let mut fetched = RawMetadata::new().with("title", "Alice").with("creator", "Carroll, Lewis");
        fetched.merge_missing(RawMetadata::new().with("title", "ALICE").with("language", "eng"));

        assert_eq!(fetched.get("title").and_then(MetadataValue::first), Some("Alice"));
        assert_eq!(fetched.get("creator").and_then(MetadataValue::first), Some("Carroll, Lewis"));
        assert_eq!(fetched.get("language").and_then(MetadataValue::first), Some("eng"));
    }

    #[test]
    fn collection_query_renders_texts_filter() {
        assert_eq!(
            CollectionQuery::new("gutenberg").to_string(),
            "collection:(gutenberg) AND mediatype:(texts)"
        );
    }
}
