//! Tag co-occurrence graphs
//!
//! `CooccurrenceAccumulator` counts tag pairs in a single streaming pass and
//! `GraphFinalizer` turns any set of pair weights into a capped graph.

pub mod accumulator;
pub mod finalize;

pub use accumulator::{AccumulatorStats, CooccurrenceAccumulator};
pub use finalize::{endpoint_set, node_strength, sort_by_weight, CapLimits, GraphFinalizer, ScoredEdge};
