//! Traverse Graph
//!
//! Builds weighted, undirected co-occurrence graphs from large streams of
//! tagged records. Nodes are tags (genres, styles) or entities (artists,
//! albums); an edge joins two items that appear together and its weight is
//! how often they do.
//!
//! # Architecture
//!
//! - `normalize`: raw field values -> canonical lowercase tags
//! - `schema`: header resolution and typed row projection
//! - `cooccurrence`: streaming tag-pair accumulator and the shared finalizer
//! - `entity`: inverted-index entity pairing with bounded-memory batch
//!   consolidation of pair counts
//! - `graph`: the `{points, links}` output model and JSON export
//! - `algo`: analytics passes over a finished graph
//! - `cache`: build-or-load handle for finished graphs
//!
//! # Guarantees
//!
//! - Every link is canonical: `source <= target`
//! - Points are exactly the endpoints of surviving links
//! - Ranking ties always break on ascending id, so output never depends on
//!   input order or hash iteration order
//! - An empty graph is a valid result, never an error
//!
//! ## Example Usage
//!
//! ```rust
//! use traverse_graph::{CooccurrenceAccumulator, CooccurrenceConfig};
//!
//! let config = CooccurrenceConfig::default().with_min_cooccurrence(2);
//! let mut acc = CooccurrenceAccumulator::new(config).unwrap();
//!
//! acc.add(["rock", "pop"], Some(1_000));
//! acc.add(["pop", "rock"], Some(500));
//! acc.add(["jazz", "rock"], None);
//!
//! let graph = acc.build();
//! assert_eq!(graph.links.len(), 1);
//! assert_eq!(graph.links[0].source, "pop");
//! assert_eq!(graph.links[0].weight, 2);
//! assert_eq!(graph.links[0].first_seen, Some(500));
//! ```

#![allow(missing_docs)]
#![warn(clippy::all)]

pub mod algo;
pub mod cache;
pub mod config;
pub mod cooccurrence;
pub mod entity;
pub mod error;
pub mod graph;
pub mod normalize;
pub mod schema;

// Re-export main types for convenience
pub use graph::{
    external_links, CanonicalPair, CooccurrenceGraph, EntityId, Link, Observation, Point,
    PropertyMap, PropertyValue, TagId,
};

pub use error::{GraphBuildError, GraphBuildResult};

pub use config::{
    ConsolidationConfig, CooccurrenceConfig, DegreePolicy, PairGeneratorConfig, PrunePolicy,
};

pub use cooccurrence::{
    AccumulatorStats, CapLimits, CooccurrenceAccumulator, GraphFinalizer, ScoredEdge,
};

pub use entity::{
    BatchConsolidator, ConsolidationStats, DegreeReport, EntityProfile, EntityRecord,
    InvertedIndex, InvertedIndexPairGenerator, PairGeneratorStats, RequiredTags, WeightTable,
};

pub use schema::{EntityKeyMode, RawRecord, RecordSchema, TagKind};

pub use normalize::{normalize, pretty_label, TagSplitter};

pub use algo::{ConnectedComponentLabeler, GraphAnalytics, GraphView};

pub use cache::GraphCache;

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Get version string
pub fn version() -> &'static str {
    VERSION
}
