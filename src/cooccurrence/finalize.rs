//! Thresholding and capping of accumulated pair weights
//!
//! Shared by the tag accumulator and the entity pair generator. The steps run
//! in a fixed order:
//! 1. drop pairs below the minimum weight
//! 2. clip weights at the maximum weight, if set
//! 3. compute node strength (weighted degree)
//! 4. keep the strongest `max_nodes` nodes, dropping edges that leave the set
//! 5. keep the heaviest `max_edges` edges
//!
//! All rankings break ties on ascending id, so the result depends only on
//! the accumulated counts and never on hash-map iteration order.

use rustc_hash::{FxHashMap, FxHashSet};
use std::cmp::Reverse;
use std::collections::BTreeSet;
use std::hash::Hash;
use tracing::debug;

/// An accumulated pair with `source <= target`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoredEdge<K> {
    pub source: K,
    pub target: K,
    pub weight: u64,
    pub first_seen: Option<i64>,
}

impl<K> ScoredEdge<K> {
    pub fn new(source: K, target: K, weight: u64) -> Self {
        ScoredEdge {
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
}

/// Limits applied by [`GraphFinalizer`]; zero means unlimited for caps
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CapLimits {
    pub min_weight: u64,
    pub max_edge_weight: u64,
    pub max_nodes: usize,
    pub max_edges: usize,
}

/// Applies threshold, clip, node cap and edge cap to a set of pairs
#[derive(Debug, Clone, Copy)]
pub struct GraphFinalizer {
    limits: CapLimits,
}

impl GraphFinalizer {
    pub fn new(limits: CapLimits) -> Self {
        GraphFinalizer { limits }
    }

    pub fn limits(&self) -> &CapLimits {
        &self.limits
    }

    /// Run the pipeline and return surviving edges sorted by weight
    /// descending, then by `(source, target)`
    pub fn finalize<K>(&self, edges: impl IntoIterator<Item = ScoredEdge<K>>) -> Vec<ScoredEdge<K>>
    where
        K: Ord + Hash + Clone,
    {
        let limits = &self.limits;

        let mut edges: Vec<ScoredEdge<K>> = edges
            .into_iter()
            .filter(|e| e.weight >= limits.min_weight)
            .collect();
        let thresholded = edges.len();

        if limits.max_edge_weight > 0 {
            for edge in &mut edges {
                edge.weight = edge.weight.min(limits.max_edge_weight);
            }
        }

        if limits.max_nodes > 0 {
            let strength = node_strength(&edges);
            if strength.len() > limits.max_nodes {
                let keep = strongest_nodes(strength, limits.max_nodes);
                edges.retain(|e| keep.contains(&e.source) && keep.contains(&e.target));
            }
        }

        sort_by_weight(&mut edges);

        if limits.max_edges > 0 && edges.len() > limits.max_edges {
            edges.truncate(limits.max_edges);
        }

        debug!(
            "Finalized {} edges ({} above min weight {})",
            edges.len(),
            thresholded,
            limits.min_weight
        );
        edges
    }
}

/// Weighted degree of every endpoint
pub fn node_strength<K>(edges: &[ScoredEdge<K>]) -> FxHashMap<K, u64>
where
    K: Hash + Eq + Clone,
{
    let mut strength: FxHashMap<K, u64> = FxHashMap::default();
    for edge in edges {
        *strength.entry(edge.source.clone()).or_insert(0) += edge.weight;
        *strength.entry(edge.target.clone()).or_insert(0) += edge.weight;
    }
    strength
}

/// Top `n` nodes by strength, ties broken by ascending id
fn strongest_nodes<K>(strength: FxHashMap<K, u64>, n: usize) -> FxHashSet<K>
where
    K: Ord + Hash + Clone,
{
    let mut ranked: Vec<(K, u64)> = strength.into_iter().collect();
    ranked.sort_by(|(a_id, a_w), (b_id, b_w)| b_w.cmp(a_w).then_with(|| a_id.cmp(b_id)));
    ranked.into_iter().take(n).map(|(id, _)| id).collect()
}

/// Sort by weight descending, ties by canonical pair order
pub fn sort_by_weight<K: Ord>(edges: &mut [ScoredEdge<K>]) {
    edges.sort_by(|a, b| {
        (Reverse(a.weight), &a.source, &a.target).cmp(&(Reverse(b.weight), &b.source, &b.target))
    });
}

/// Union of all edge endpoints, in ascending order
pub fn endpoint_set<K: Ord + Clone>(edges: &[ScoredEdge<K>]) -> BTreeSet<K> {
    let mut nodes = BTreeSet::new();
    for edge in edges {
        nodes.insert(edge.source.clone());
        nodes.insert(edge.target.clone());
    }
    nodes
}
