//! Entity records and the per-entity profiles built from them
//!
//! An entity (artist, album) may appear in many records. Each record adds
//! to the entity's profile; the profile is what gets indexed.

use crate::graph::{EntityId, PropertyMap, TagId};
use crate::normalize::pretty_label;
use std::collections::{BTreeMap, BTreeSet};

/// One input record, already reduced to an entity key and its tags
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EntityRecord {
    pub key: EntityId,
    /// Display label; the first non-empty label seen for a key wins
    pub label: String,
    /// Tags that link entities to each other
    pub edge_tags: Vec<TagId>,
    /// Display and filter tags by category ("genres", "styles", "artists")
    pub categories: BTreeMap<String, Vec<String>>,
    pub first_seen: Option<i64>,
    pub metadata: PropertyMap,
}

impl EntityRecord {
    pub fn new(key: impl Into<EntityId>, label: impl Into<String>) -> Self {
        EntityRecord {
            key: key.into(),
            label: label.into(),
            ..Default::default()
        }
    }

    pub fn with_edge_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<TagId>,
    {
        self.edge_tags.extend(tags.into_iter().map(Into::into));
        self
    }

    pub fn with_category<I, S>(mut self, category: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.categories
            .entry(category.into())
            .or_default()
            .extend(values.into_iter().map(Into::into));
        self
    }

    pub fn with_first_seen(mut self, first_seen: Option<i64>) -> Self {
        self.first_seen = first_seen;
        self
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<crate::graph::PropertyValue>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

/// Everything known about one entity after the scan pass
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EntityProfile {
    pub label: String,
    pub edge_tags: BTreeSet<TagId>,
    pub categories: BTreeMap<String, BTreeSet<String>>,
    pub first_seen: Option<i64>,
    pub metadata: PropertyMap,
    /// Number of records merged into this profile
    pub records: u64,
}

impl EntityProfile {
    /// Merge a record: tags union, earliest timestamp, first label and
    /// first value per metadata key
    pub fn absorb(&mut self, record: EntityRecord) {
        if self.label.is_empty() {
            self.label = record.label;
        }
        self.edge_tags.extend(record.edge_tags.into_iter().filter(|t| !t.is_empty()));
        for (category, values) in record.categories {
            self.categories.entry(category).or_default().extend(values);
        }
        self.first_seen = match (self.first_seen, record.first_seen) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        };
        for (key, value) in record.metadata {
            self.metadata.entry(key).or_insert(value);
        }
        self.records += 1;
    }

    /// Number of distinct edge tags, the ranking key for node capping
    pub fn diversity(&self) -> usize {
        self.edge_tags.len()
    }

    /// Output metadata: profile metadata plus `" | "`-joined category tags
    pub fn display_metadata(&self) -> PropertyMap {
        let mut out = self.metadata.clone();
        for (category, values) in &self.categories {
            if category == "artists" || values.is_empty() {
                continue;
            }
            let joined = values
                .iter()
                .map(|v| pretty_label(v))
                .collect::<Vec<_>>()
                .join(" | ");
            out.entry(category.clone()).or_insert(joined.into());
        }
        out
    }
}

/// Required-tag filter: AND across categories, OR within a category
///
/// Matching is case-insensitive. An entity is judged on its complete
/// profile, never on a single record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequiredTags {
    required: BTreeMap<String, BTreeSet<String>>,
}

impl RequiredTags {
    pub fn new() -> Self {
        Self::default()
    }

    /// Require at least one of `values` in `category`
    pub fn require<I, S>(mut self, category: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.required
            .entry(category.into())
            .or_default()
            .extend(values.into_iter().map(|v| v.as_ref().trim().to_lowercase()));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.required.is_empty()
    }

    pub fn matches(&self, categories: &BTreeMap<String, BTreeSet<String>>) -> bool {
        self.required.iter().all(|(category, allowed)| {
            categories
                .get(category)
                .map(|values| values.iter().any(|v| allowed.contains(&v.trim().to_lowercase())))
                .unwrap_or(false)
        })
    }
}
