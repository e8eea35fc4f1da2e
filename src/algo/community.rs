//! Connected-component labelling
//!
//! Component ids are 0-indexed and ordered by size descending, so the
//! largest component is always 0. Equal sizes are ordered by their
//! smallest member index.

use super::common::GraphView;
use super::GraphAnalytics;
use crate::error::GraphBuildResult;
use crate::graph::{CooccurrenceGraph, PropertyValue};
use rustc_hash::FxHashMap;
use tracing::debug;

/// Metadata key written onto each point
pub const COMMUNITY_KEY: &str = "community";

/// Result of component labelling
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ComponentResult {
    /// Component id per dense node index
    pub labels: Vec<usize>,
    /// Size of each component, indexed by component id
    pub sizes: Vec<usize>,
}

impl ComponentResult {
    pub fn component_count(&self) -> usize {
        self.sizes.len()
    }
}

/// Union-Find data structure
struct UnionFind {
    parent: Vec<usize>,
    rank: Vec<usize>,
}

impl UnionFind {
    fn new(size: usize) -> Self {
        UnionFind {
            parent: (0..size).collect(),
            rank: vec![0; size],
        }
    }

    fn find(&mut self, i: usize) -> usize {
        let mut root = i;
        while self.parent[root] != root {
            root = self.parent[root];
        }
        // Path compression
        let mut node = i;
        while self.parent[node] != root {
            let next = self.parent[node];
            self.parent[node] = root;
            node = next;
        }
        root
    }

    fn union(&mut self, i: usize, j: usize) {
        let root_i = self.find(i);
        let root_j = self.find(j);

        if root_i != root_j {
            if self.rank[root_i] < self.rank[root_j] {
                self.parent[root_i] = root_j;
            } else if self.rank[root_i] > self.rank[root_j] {
                self.parent[root_j] = root_i;
            } else {
                self.parent[root_j] = root_i;
                self.rank[root_i] += 1;
            }
        }
    }
}

/// Connected components of an undirected view
pub fn connected_components(view: &GraphView) -> ComponentResult {
    let n = view.node_count;
    let mut uf = UnionFind::new(n);
    for u in 0..n {
        for &v in view.neighbors(u) {
            uf.union(u, v);
        }
    }

    // root -> (size, smallest member)
    let mut groups: FxHashMap<usize, (usize, usize)> = FxHashMap::default();
    let roots: Vec<usize> = (0..n).map(|i| uf.find(i)).collect();
    for (i, &root) in roots.iter().enumerate() {
        let entry = groups.entry(root).or_insert((0, i));
        entry.0 += 1;
    }

    let mut ranked: Vec<(usize, usize, usize)> = groups
        .into_iter()
        .map(|(root, (size, first))| (size, first, root))
        .collect();
    ranked.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.cmp(&b.1)));

    let mut component_of_root: FxHashMap<usize, usize> = FxHashMap::default();
    let mut sizes = Vec::with_capacity(ranked.len());
    for (id, (size, _, root)) in ranked.into_iter().enumerate() {
        component_of_root.insert(root, id);
        sizes.push(size);
    }

    let labels = roots.iter().map(|root| component_of_root[root]).collect();
    ComponentResult { labels, sizes }
}

/// Writes a `community` value onto every point: the id of its connected
/// component
#[derive(Debug, Clone, Copy, Default)]
pub struct ConnectedComponentLabeler;

impl ConnectedComponentLabeler {
    pub fn new() -> Self {
        ConnectedComponentLabeler
    }
}

impl GraphAnalytics for ConnectedComponentLabeler {
    fn name(&self) -> &str {
        "connected_components"
    }

    fn annotate(&self, graph: &mut CooccurrenceGraph) -> GraphBuildResult<()> {
        let view = GraphView::from_graph(graph);
        let result = connected_components(&view);
        for (point, &label) in graph.points.iter_mut().zip(result.labels.iter()) {
            point.set_property(COMMUNITY_KEY, PropertyValue::Integer(label as i64));
        }
        debug!(
            "Labelled {} points into {} components",
            view.node_count,
            result.component_count()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{Link, Point};

    fn graph(ids: &[&str], links: &[(&str, &str)]) -> CooccurrenceGraph {
        CooccurrenceGraph::new(
            ids.iter().map(|id| Point::new(*id, *id)).collect(),
            links.iter().map(|(a, b)| Link::new(*a, *b, 1)).collect(),
        )
    }

    #[test]
    fn test_components_ranked_by_size() {
        // a-b, c-d-e, f isolated
        let g = graph(&["a", "b", "c", "d", "e", "f"], &[("a", "b"), ("c", "d"), ("d", "e")]);
        let result = connected_components(&GraphView::from_graph(&g));
        assert_eq!(result.sizes, vec![3, 2, 1]);
        assert_eq!(result.labels, vec![1, 1, 0, 0, 0, 2]);
    }

    #[test]
    fn test_labeler_writes_metadata() {
        let mut g = graph(&["a", "b", "c"], &[("a", "b")]);
        ConnectedComponentLabeler::new().annotate(&mut g).unwrap();
        assert_eq!(g.point("a").unwrap().get_property(COMMUNITY_KEY), Some(&PropertyValue::Integer(0)));
        assert_eq!(g.point("c").unwrap().get_property(COMMUNITY_KEY), Some(&PropertyValue::Integer(1)));
    }

    #[test]
    fn test_empty_graph() {
        let mut g = CooccurrenceGraph::default();
        ConnectedComponentLabeler::new().annotate(&mut g).unwrap();
        assert!(g.is_empty());
    }
}
