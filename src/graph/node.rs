//! Output points (graph nodes)

use super::property::{PropertyMap, PropertyValue};
use serde::{Deserialize, Serialize};

/// A node in the finished graph
///
/// Points are only created for ids that survive capping as an endpoint of
/// at least one link, and are not modified after the graph is emitted
/// (analytics consumers may add metadata to their own copy).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Point {
    /// Tag or entity id
    pub id: String,

    /// Display label
    pub label: String,

    /// Earliest timestamp of any observation touching this node
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_seen: Option<i64>,

    /// Extra display fields, flattened into the point's JSON object
    #[serde(flatten)]
    pub metadata: PropertyMap,
}

impl Point {
    /// Create a point with no timeline or metadata
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        Point {
            id: id.into(),
            label: label.into(),
            first_seen: None,
            metadata: PropertyMap::new(),
        }
    }

    pub fn with_first_seen(mut self, first_seen: Option<i64>) -> Self {
        self.first_seen = first_seen;
        self
    }

    pub fn with_metadata(mut self, metadata: PropertyMap) -> Self {
        self.metadata = metadata;
        self
    }

    /// Set a metadata value, returning the previous one
    pub fn set_property(&mut self, key: impl Into<String>, value: impl Into<PropertyValue>) -> Option<PropertyValue> {
        self.metadata.insert(key.into(), value.into())
    }

    /// Get a metadata value
    pub fn get_property(&self, key: &str) -> Option<&PropertyValue> {
        self.metadata.get(key)
    }
}
