//! Streaming tag co-occurrence accumulator
//!
//! One pass over the input: each observation's unique tags contribute one
//! count to every unordered pair they form. Tag vocabularies are small, so
//! pair weights live in a plain hash map.

use super::finalize::{endpoint_set, CapLimits, GraphFinalizer, ScoredEdge};
use crate::config::CooccurrenceConfig;
use crate::error::GraphBuildResult;
use crate::graph::{CanonicalPair, CooccurrenceGraph, Link, Observation, Point, TagId};
use rayon::prelude::*;
use rustc_hash::FxHashMap;
use serde::Serialize;
use std::collections::BTreeSet;
use tracing::info;

/// Diagnostic counters; none of these affect the output
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AccumulatorStats {
    pub rows_seen: u64,
    pub rows_with_tags: u64,
    pub rows_with_pairs: u64,
    pub unique_pairs: usize,
    pub unique_tags: usize,
}

/// Accumulates tag pair counts, first-seen times and labels
#[derive(Debug, Clone)]
pub struct CooccurrenceAccumulator {
    config: CooccurrenceConfig,
    counts: FxHashMap<CanonicalPair, u64>,
    pair_first_seen: FxHashMap<CanonicalPair, i64>,
    node_first_seen: FxHashMap<TagId, i64>,
    labels: FxHashMap<TagId, String>,
    rows_seen: u64,
    rows_with_tags: u64,
    rows_with_pairs: u64,
}

fn lower_min(slot: Option<&mut i64>, ts: i64) -> bool {
    match slot {
        Some(prev) => {
            if ts < *prev {
                *prev = ts;
            }
            true
        }
        None => false,
    }
}

impl CooccurrenceAccumulator {
    /// Create an accumulator after validating `config`
    pub fn new(config: CooccurrenceConfig) -> GraphBuildResult<Self> {
        config.validate()?;
        Ok(Self::with_config(config))
    }

    fn with_config(config: CooccurrenceConfig) -> Self {
        CooccurrenceAccumulator {
            config,
            counts: FxHashMap::default(),
            pair_first_seen: FxHashMap::default(),
            node_first_seen: FxHashMap::default(),
            labels: FxHashMap::default(),
            rows_seen: 0,
            rows_with_tags: 0,
            rows_with_pairs: 0,
        }
    }

    pub fn config(&self) -> &CooccurrenceConfig {
        &self.config
    }

    /// Add one observation; tags are used as their own labels
    pub fn add<I, S>(&mut self, tags: I, timestamp: Option<i64>)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.add_with_labels(tags, timestamp, |tag| tag.to_string());
    }

    /// Add one observation, computing display labels for unseen tags
    ///
    /// The first label recorded for a tag is kept for the accumulator's
    /// lifetime.
    pub fn add_with_labels<I, S, F>(&mut self, tags: I, timestamp: Option<i64>, label_fn: F)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
        F: Fn(&str) -> String,
    {
        self.rows_seen += 1;

        let unique: BTreeSet<String> = tags
            .into_iter()
            .filter_map(|t| {
                let t = t.as_ref();
                (!t.is_empty()).then(|| t.to_string())
            })
            .collect();
        if unique.is_empty() {
            return;
        }
        self.rows_with_tags += 1;

        for tag in &unique {
            if !self.labels.contains_key(tag) {
                self.labels.insert(tag.clone(), label_fn(tag));
            }
            if let Some(ts) = timestamp {
                if !lower_min(self.node_first_seen.get_mut(tag), ts) {
                    self.node_first_seen.insert(tag.clone(), ts);
                }
            }
        }

        if unique.len() < 2 {
            return;
        }
        self.rows_with_pairs += 1;

        // BTreeSet iteration is sorted, so (a, b) with a < b is already canonical
        let sorted: Vec<&String> = unique.iter().collect();
        for (i, a) in sorted.iter().enumerate() {
            for b in &sorted[i + 1..] {
                let key = CanonicalPair::new(a.as_str(), b.as_str());
                if let Some(ts) = timestamp {
                    if !lower_min(self.pair_first_seen.get_mut(&key), ts) {
                        self.pair_first_seen.insert(key.clone(), ts);
                    }
                }
                *self.counts.entry(key).or_insert(0) += 1;
            }
        }
    }

    /// Add an [`Observation`]
    pub fn add_observation(&mut self, observation: &Observation) {
        self.add(&observation.tags, observation.timestamp);
    }

    /// Current weight of a pair, in either order
    pub fn weight(&self, a: &str, b: &str) -> u64 {
        self.counts
            .get(&CanonicalPair::new(a, b))
            .copied()
            .unwrap_or(0)
    }

    pub fn stats(&self) -> AccumulatorStats {
        AccumulatorStats {
            rows_seen: self.rows_seen,
            rows_with_tags: self.rows_with_tags,
            rows_with_pairs: self.rows_with_pairs,
            unique_pairs: self.counts.len(),
            unique_tags: self.labels.len(),
        }
    }

    /// Clear all accumulated state, keeping the configuration
    pub fn reset(&mut self) {
        self.counts.clear();
        self.pair_first_seen.clear();
        self.node_first_seen.clear();
        self.labels.clear();
        self.rows_seen = 0;
        self.rows_with_tags = 0;
        self.rows_with_pairs = 0;
    }

    /// Fold another partial accumulation into this one
    ///
    /// Weights and counters add, timestamps take the minimum and labels
    /// already present here win. The weight result is independent of merge
    /// order.
    pub fn merge(&mut self, other: CooccurrenceAccumulator) {
        for (key, weight) in other.counts {
            *self.counts.entry(key).or_insert(0) += weight;
        }
        for (key, ts) in other.pair_first_seen {
            if !lower_min(self.pair_first_seen.get_mut(&key), ts) {
                self.pair_first_seen.insert(key, ts);
            }
        }
        for (tag, ts) in other.node_first_seen {
            if !lower_min(self.node_first_seen.get_mut(&tag), ts) {
                self.node_first_seen.insert(tag, ts);
            }
        }
        for (tag, label) in other.labels {
            self.labels.entry(tag).or_insert(label);
        }
        self.rows_seen += other.rows_seen;
        self.rows_with_tags += other.rows_with_tags;
        self.rows_with_pairs += other.rows_with_pairs;
    }

    /// Accumulate independent chunks on the rayon pool and merge the partials
    ///
    /// Rayon's reduce keeps chunk order, so labels resolve as if the chunks
    /// had been fed sequentially.
    pub fn accumulate_parallel(
        config: CooccurrenceConfig,
        chunks: Vec<Vec<Observation>>,
    ) -> GraphBuildResult<Self> {
        config.validate()?;
        let merged = chunks
            .into_par_iter()
            .map(|chunk| {
                let mut partial = Self::with_config(config.clone());
                for observation in &chunk {
                    partial.add_observation(observation);
                }
                partial
            })
            .reduce(
                || Self::with_config(config.clone()),
                |mut left, right| {
                    left.merge(right);
                    left
                },
            );
        Ok(merged)
    }

    fn cap_limits(&self) -> CapLimits {
        CapLimits {
            min_weight: self.config.min_cooccurrence,
            max_edge_weight: self.config.max_edge_weight,
            max_nodes: self.config.max_nodes,
            max_edges: self.config.max_edges,
        }
    }

    /// Apply thresholds and caps and emit `{points, links}`
    ///
    /// Does not modify the accumulator; calling it twice yields the same graph.
    pub fn build(&self) -> CooccurrenceGraph {
        let edges = self.counts.iter().map(|(key, &weight)| {
            ScoredEdge::new(key.source(), key.target(), weight)
                .with_first_seen(self.pair_first_seen.get(key).copied())
        });
        let edges = GraphFinalizer::new(self.cap_limits()).finalize(edges);

        let points: Vec<Point> = endpoint_set(&edges)
            .into_iter()
            .map(|id| {
                let label = self.labels.get(id).cloned().unwrap_or_else(|| id.to_string());
                Point::new(id, label).with_first_seen(self.node_first_seen.get(id).copied())
            })
            .collect();

        let links: Vec<Link> = edges
            .into_iter()
            .map(|e| Link::new(e.source, e.target, e.weight).with_first_seen(e.first_seen))
            .collect();

        info!(
            "Co-occurrence graph: {} rows, {} unique pairs -> {} points, {} links (min_cooccurrence={})",
            self.rows_seen,
            self.counts.len(),
            points.len(),
            links.len(),
            self.config.min_cooccurrence
        );

        CooccurrenceGraph::new(points, links)
    }
}
