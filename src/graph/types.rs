//! Core identifiers for tag and entity graphs

use serde::{Deserialize, Serialize};
use std::fmt;

/// Normalized tag identifier (lowercase, trimmed)
pub type TagId = String;

/// Stable entity key, e.g. `"<title>::<artist>"` or an artist name
pub type EntityId = String;

/// An unordered pair of node ids stored with `source <= target`
///
/// The derived `Ord` compares `source` then `target`, which is the
/// canonical pair order used to break weight ties.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CanonicalPair {
    source: String,
    target: String,
}

impl CanonicalPair {
    /// Build a pair from two ids in either order
    pub fn new(a: impl Into<String>, b: impl Into<String>) -> Self {
        let a = a.into();
        let b = b.into();
        if a <= b {
            CanonicalPair { source: a, target: b }
        } else {
            CanonicalPair { source: b, target: a }
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn into_parts(self) -> (String, String) {
        (self.source, self.target)
    }
}

impl fmt::Display for CanonicalPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.source, self.target)
    }
}

/// One input record reduced to its tag set and optional timestamp
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Observation {
    pub tags: Vec<TagId>,
    /// Epoch milliseconds or a year, depending on the source
    pub timestamp: Option<i64>,
}

impl Observation {
    pub fn new<I, S>(tags: I, timestamp: Option<i64>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<TagId>,
    {
        Observation {
            tags: tags.into_iter().map(Into::into).collect(),
            timestamp,
        }
    }
}
