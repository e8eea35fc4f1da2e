//! Shared utilities for graph analytics
//!
//! Provides a read-only, dense view of a finished graph's topology.

use crate::graph::CooccurrenceGraph;
use rustc_hash::FxHashMap;

/// A dense, integer-indexed view of an undirected graph in Compressed
/// Sparse Row (CSR) format.
///
/// Every link appears twice, once from each endpoint.
#[derive(Debug, Clone, Default)]
pub struct GraphView {
    /// Number of nodes
    pub node_count: usize,
    /// Mapping from dense index (0..N) back to point id
    pub index_to_node: Vec<String>,
    /// Mapping from point id to dense index
    pub node_to_index: FxHashMap<String, usize>,
    /// Offsets into `neighbors`. Size = node_count + 1
    pub offsets: Vec<usize>,
    /// Contiguous array of neighbour indices
    pub neighbors: Vec<usize>,
    /// Edge weights aligned with `neighbors`
    pub weights: Vec<u64>,
}

impl GraphView {
    /// Build a view over the points of `graph`
    ///
    /// Dense indices follow point order. Links naming an unknown point are
    /// ignored.
    pub fn from_graph(graph: &CooccurrenceGraph) -> Self {
        let node_count = graph.points.len();
        let mut index_to_node = Vec::with_capacity(node_count);
        let mut node_to_index = FxHashMap::default();
        for (idx, point) in graph.points.iter().enumerate() {
            index_to_node.push(point.id.clone());
            node_to_index.insert(point.id.clone(), idx);
        }

        let mut adjacency: Vec<Vec<(usize, u64)>> = vec![Vec::new(); node_count];
        for link in &graph.links {
            let (Some(&u), Some(&v)) = (node_to_index.get(&link.source), node_to_index.get(&link.target)) else {
                continue;
            };
            adjacency[u].push((v, link.weight));
            if u != v {
                adjacency[v].push((u, link.weight));
            }
        }

        let mut offsets = Vec::with_capacity(node_count + 1);
        let mut neighbors = Vec::new();
        let mut weights = Vec::new();
        offsets.push(0);
        for row in adjacency {
            for (v, w) in row {
                neighbors.push(v);
                weights.push(w);
            }
            offsets.push(neighbors.len());
        }

        GraphView {
            node_count,
            index_to_node,
            node_to_index,
            offsets,
            neighbors,
            weights,
        }
    }

    pub fn degree(&self, idx: usize) -> usize {
        self.offsets[idx + 1] - self.offsets[idx]
    }

    /// Neighbours of a node (by index)
    pub fn neighbors(&self, idx: usize) -> &[usize] {
        &self.neighbors[self.offsets[idx]..self.offsets[idx + 1]]
    }

    /// Weights aligned with [`GraphView::neighbors`]
    pub fn weights(&self, idx: usize) -> &[u64] {
        &self.weights[self.offsets[idx]..self.offsets[idx + 1]]
    }

    /// Weighted degree of a node (by index)
    pub fn strength(&self, idx: usize) -> u64 {
        self.weights(idx).iter().sum()
    }
}
