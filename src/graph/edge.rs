//! Output links (graph edges)

use serde::{Deserialize, Serialize};

/// An undirected weighted edge in the finished graph
///
/// `source <= target` always holds; builders only emit canonical pairs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    pub source: String,
    pub target: String,

    /// Co-occurrence count (or shared-tag count for entity graphs)
    pub weight: u64,

    /// Earliest timestamp of any observation containing this pair
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_seen: Option<i64>,
}

impl Link {
    /// Create a link; the endpoints are reordered into canonical form
    pub fn new(a: impl Into<String>, b: impl Into<String>, weight: u64) -> Self {
        let a = a.into();
        let b = b.into();
        let (source, target) = if a <= b { (a, b) } else { (b, a) };
        Link {
            source,
            target,
            weight,
            first_seen: None,
        }
    }

    pub fn with_first_seen(mut self, first_seen: Option<i64>) -> Self {
        self.first_seen = first_seen;
        self
    }

    /// True when this link touches `id`
    pub fn touches(&self, id: &str) -> bool {
        self.source == id || self.target == id
    }

    pub fn is_canonical(&self) -> bool {
        self.source <= self.target
    }
}
