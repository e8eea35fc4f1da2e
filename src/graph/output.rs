//! The finished `{points, links}` graph
//!
//! This is the output contract shared with exporters, the serving layer and
//! analytics consumers. An empty graph is a valid result, not an error.

use super::edge::Link;
use super::node::Point;
use super::property::{PropertyMap, PropertyValue};
use crate::error::GraphBuildResult;
use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;
use tracing::debug;

/// Result of a graph build
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CooccurrenceGraph {
    /// Nodes sorted by id
    #[serde(default)]
    pub points: Vec<Point>,
    /// Edges sorted by weight descending, then canonical pair order
    #[serde(default)]
    pub links: Vec<Link>,
}

impl CooccurrenceGraph {
    pub fn new(points: Vec<Point>, links: Vec<Link>) -> Self {
        CooccurrenceGraph { points, links }
    }

    /// True when the graph has no links (and therefore no points)
    pub fn is_empty(&self) -> bool {
        self.points.is_empty() && self.links.is_empty()
    }

    pub fn node_count(&self) -> usize {
        self.points.len()
    }

    pub fn edge_count(&self) -> usize {
        self.links.len()
    }

    /// Look up a point by id (points are sorted by id)
    pub fn point(&self, id: &str) -> Option<&Point> {
        self.points
            .binary_search_by(|p| p.id.as_str().cmp(id))
            .ok()
            .map(|idx| &self.points[idx])
    }

    /// Look up the link between two ids, in either order
    pub fn link(&self, a: &str, b: &str) -> Option<&Link> {
        let (source, target) = if a <= b { (a, b) } else { (b, a) };
        self.links
            .iter()
            .find(|l| l.source == source && l.target == target)
    }

    /// Set of all link endpoints
    pub fn endpoint_ids(&self) -> BTreeSet<&str> {
        let mut ids = BTreeSet::new();
        for link in &self.links {
            ids.insert(link.source.as_str());
            ids.insert(link.target.as_str());
        }
        ids
    }

    /// Sum of incident link weights for `id`
    pub fn strength(&self, id: &str) -> u64 {
        self.links
            .iter()
            .filter(|l| l.touches(id))
            .map(|l| l.weight)
            .sum()
    }

    /// Attach an `external_links` list to every point
    pub fn with_external_links(mut self) -> Self {
        for point in &mut self.points {
            let links = external_links(point);
            point.set_property("external_links", PropertyValue::Array(links));
        }
        self
    }

    pub fn to_json_string(&self) -> GraphBuildResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn to_json_string_pretty(&self) -> GraphBuildResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json_str(json: &str) -> GraphBuildResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Write the graph as pretty JSON, creating parent directories
    pub fn write_json(&self, path: impl AsRef<Path>) -> GraphBuildResult<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.to_json_string_pretty()?)?;
        debug!(
            "Wrote graph to {:?}: {} points, {} links",
            path,
            self.points.len(),
            self.links.len()
        );
        Ok(())
    }

    pub fn read_json(path: impl AsRef<Path>) -> GraphBuildResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }
}

/// Build the external search links for a point
///
/// Points with an `artist` field are albums, points with `genres` or
/// `styles` but no artist are artists, and anything else is a tag.
pub fn external_links(point: &Point) -> Vec<PropertyValue> {
    let label = point.label.trim();
    if label.is_empty() {
        return Vec::new();
    }

    let field = |key: &str| {
        point
            .get_property(key)
            .and_then(PropertyValue::as_string)
            .map(str::trim)
            .unwrap_or("")
    };
    let artist = field("artist");
    let has_tags = !field("genres").is_empty() || !field("styles").is_empty();

    let (query, kind) = if !artist.is_empty() {
        (format!("{} {}", label, artist), "release")
    } else if has_tags {
        (label.to_string(), "artist")
    } else {
        (label.to_string(), "all")
    };
    let url = format!(
        "https://www.discogs.com/search/?q={}&type={}",
        utf8_percent_encode(&query, NON_ALPHANUMERIC),
        kind
    );

    let mut link = PropertyMap::new();
    link.insert("platform".to_string(), "discogs".into());
    link.insert("url".to_string(), url.into());
    link.insert("label".to_string(), "Discogs".into());
    vec![PropertyValue::Map(link)]
}
