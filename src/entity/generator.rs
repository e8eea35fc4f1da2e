//! Inverted-index entity similarity graphs
//!
//! Entities (artists, albums) are linked when they share tags; the edge
//! weight is the number of shared tags. The build runs in passes:
//! 1. scan: merge every record into its entity's profile
//! 2. filter: drop entities failing the required-tag predicate
//! 3. cap: keep the `max_nodes` most tag-diverse entities, before indexing
//! 4. index: dense ids by key order, tag -> posting list
//! 5. degree control: skip or sample posting lists above `max_tag_degree`
//! 6. pairs: stream ascending pairs per tag into the batch consolidator
//! 7. finalize: threshold, clip, sort, edge cap, points from endpoints

use super::consolidate::{emit_pairs, BatchConsolidator, ConsolidationStats};
use super::index::{DegreeReport, InvertedIndex};
use super::record::{EntityProfile, EntityRecord, RequiredTags};
use crate::config::PairGeneratorConfig;
use crate::cooccurrence::{endpoint_set, CapLimits, GraphFinalizer, ScoredEdge};
use crate::error::GraphBuildResult;
use crate::graph::{CooccurrenceGraph, EntityId, Link, Point};
use rustc_hash::FxHashMap;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Per-pass counters from the last build
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PairGeneratorStats {
    pub records_scanned: u64,
    pub records_without_tags: u64,
    pub entities_seen: usize,
    pub entities_filtered: usize,
    pub entities_capped: usize,
    pub indexed_entities: usize,
    pub indexed_tags: usize,
    pub degree: DegreeReport,
    pub consolidation: ConsolidationStats,
    pub unique_pairs: usize,
    pub points: usize,
    pub links: usize,
}

/// Builds entity graphs from a stream of [`EntityRecord`]s
#[derive(Debug, Clone)]
pub struct InvertedIndexPairGenerator {
    config: PairGeneratorConfig,
    required: Option<RequiredTags>,
    profiles: FxHashMap<EntityId, EntityProfile>,
    records_scanned: u64,
    records_without_tags: u64,
}

impl InvertedIndexPairGenerator {
    /// Create a generator after validating `config`
    pub fn new(config: PairGeneratorConfig) -> GraphBuildResult<Self> {
        config.validate()?;
        Ok(InvertedIndexPairGenerator {
            config,
            required: None,
            profiles: FxHashMap::default(),
            records_scanned: 0,
            records_without_tags: 0,
        })
    }

    /// Only keep entities whose merged profile passes `required`
    pub fn with_required_tags(mut self, required: RequiredTags) -> Self {
        self.required = (!required.is_empty()).then_some(required);
        self
    }

    pub fn config(&self) -> &PairGeneratorConfig {
        &self.config
    }

    /// Scan pass: merge one record into its entity's profile
    ///
    /// Records without a key or without edge tags are counted and ignored.
    pub fn ingest(&mut self, record: EntityRecord) {
        self.records_scanned += 1;
        if record.key.is_empty() || record.edge_tags.iter().all(|t| t.is_empty()) {
            self.records_without_tags += 1;
            return;
        }
        self.profiles
            .entry(record.key.clone())
            .or_default()
            .absorb(record);
    }

    pub fn entity_count(&self) -> usize {
        self.profiles.len()
    }

    pub fn profile(&self, key: &str) -> Option<&EntityProfile> {
        self.profiles.get(key)
    }

    /// Clear all scanned state, keeping configuration and filter
    pub fn reset(&mut self) {
        self.profiles.clear();
        self.records_scanned = 0;
        self.records_without_tags = 0;
    }

    /// Build the graph; does not modify the scanned state
    pub fn build(&self) -> GraphBuildResult<CooccurrenceGraph> {
        self.build_with_stats().map(|(graph, _)| graph)
    }

    /// Build the graph and report per-pass counters
    pub fn build_with_stats(&self) -> GraphBuildResult<(CooccurrenceGraph, PairGeneratorStats)> {
        let mut stats = PairGeneratorStats {
            records_scanned: self.records_scanned,
            records_without_tags: self.records_without_tags,
            entities_seen: self.profiles.len(),
            ..Default::default()
        };
        info!(
            "Scan: {} records, {} entities with tags",
            self.records_scanned,
            self.profiles.len()
        );

        let selected = self.select_entities(&mut stats);
        let mut index = InvertedIndex::build(selected.iter().map(|(k, p)| (*k, *p)))?;
        stats.indexed_entities = index.entity_count();
        stats.indexed_tags = index.tag_count();
        info!(
            "Index: {} entities -> {} unique tags",
            index.entity_count(),
            index.tag_count()
        );

        stats.degree = index.apply_degree_policy(self.config.max_tag_degree, self.config.degree_policy);
        if stats.degree.sampled_tags + stats.degree.skipped_tags > 0 {
            info!(
                "Degree control: {} tags sampled, {} tags skipped (degree > {})",
                stats.degree.sampled_tags, stats.degree.skipped_tags, self.config.max_tag_degree
            );
        }

        let edges = if self.config.max_edges_per_node > 0 {
            self.nearest_neighbor_edges(&index)
        } else {
            let (edges, consolidation) = self.pairwise_edges(&index);
            stats.consolidation = consolidation;
            edges
        };
        stats.unique_pairs = edges.len();

        let limits = CapLimits {
            min_weight: self.config.effective_min_weight(),
            max_edge_weight: if self.config.unweighted { 0 } else { self.config.max_edge_weight },
            // Entities were already capped before indexing
            max_nodes: 0,
            max_edges: self.config.max_edges,
        };
        let mut edges = GraphFinalizer::new(limits).finalize(edges);
        if self.config.unweighted {
            for edge in &mut edges {
                edge.weight = 1;
            }
        }

        let graph = assemble(&index, &selected, &edges);
        stats.points = graph.points.len();
        stats.links = graph.links.len();
        info!(
            "Entity graph: {} points, {} links (min_cooccurrence={}, unweighted={})",
            stats.points,
            stats.links,
            limits.min_weight,
            self.config.unweighted
        );
        Ok((graph, stats))
    }

    /// Filter and cap the scanned entities; result is sorted by key
    fn select_entities(&self, stats: &mut PairGeneratorStats) -> Vec<(&EntityId, &EntityProfile)> {
        let mut selected: Vec<(&EntityId, &EntityProfile)> = self
            .profiles
            .iter()
            .filter(|(_, p)| !p.edge_tags.is_empty())
            .collect();

        if let Some(required) = &self.required {
            let before = selected.len();
            selected.retain(|(_, p)| required.matches(&p.categories));
            stats.entities_filtered = before - selected.len();
            info!("Required-tag filter: {} -> {} entities", before, selected.len());
        }

        let max_nodes = self.config.max_nodes;
        if max_nodes > 0 && selected.len() > max_nodes {
            selected.sort_by(|(ka, pa), (kb, pb)| {
                pb.diversity().cmp(&pa.diversity()).then_with(|| ka.cmp(kb))
            });
            stats.entities_capped = selected.len() - max_nodes;
            selected.truncate(max_nodes);
            info!(
                "Node cap: kept {} entities (min tag count in kept set: {})",
                max_nodes,
                selected.last().map(|(_, p)| p.diversity()).unwrap_or(0)
            );
        }

        selected.sort_by(|(ka, _), (kb, _)| ka.cmp(kb));
        selected
    }

    /// Full pairwise mode: every tag contributes one to each pair it links
    fn pairwise_edges(&self, index: &InvertedIndex) -> (Vec<ScoredEdge<u32>>, ConsolidationStats) {
        let mut consolidator =
            BatchConsolidator::new(self.config.consolidation, self.config.effective_min_weight());
        consolidator.expect_sources(index.pair_sources() as u64);

        for (_, postings) in index.iter() {
            if postings.len() < 2 {
                continue;
            }
            emit_pairs(postings, &mut consolidator);
            consolidator.finish_source();
        }

        let (table, consolidation) = consolidator.finish();
        debug!(
            "Pairwise: {} observations -> {} unique pairs in {} consolidations ({} pruned)",
            consolidation.observations,
            table.len(),
            consolidation.consolidations,
            consolidation.pruned
        );
        let edges = table
            .iter()
            .map(|(row, col, w)| ScoredEdge::new(row, col, w as u64))
            .collect();
        (edges, consolidation)
    }

    /// Nearest-neighbour mode: each entity keeps its top-K overlaps
    ///
    /// Overlap is symmetric, so a pair found from either side carries the
    /// same weight.
    fn nearest_neighbor_edges(&self, index: &InvertedIndex) -> Vec<ScoredEdge<u32>> {
        let k = self.config.max_edges_per_node;
        let min_weight = self.config.effective_min_weight();
        let entity_tags = index.entity_tags();
        let mut kept: BTreeMap<(u32, u32), u64> = BTreeMap::new();

        for (id, tags) in entity_tags.iter().enumerate() {
            let id = id as u32;
            let mut overlap: FxHashMap<u32, u64> = FxHashMap::default();
            for tag in tags {
                for &other in index.postings(tag).unwrap_or(&[]) {
                    if other != id {
                        *overlap.entry(other).or_insert(0) += 1;
                    }
                }
            }
            let mut ranked: Vec<(u32, u64)> = overlap.into_iter().collect();
            ranked.sort_by(|(a, wa), (b, wb)| wb.cmp(wa).then_with(|| a.cmp(b)));
            for (other, weight) in ranked.into_iter().take(k) {
                if weight < min_weight {
                    break;
                }
                let pair = (id.min(other), id.max(other));
                let slot = kept.entry(pair).or_insert(0);
                *slot = (*slot).max(weight);
            }
        }

        debug!("Nearest-neighbour: {} unique pairs (k={})", kept.len(), k);
        kept.into_iter()
            .map(|((a, b), w)| ScoredEdge::new(a, b, w))
            .collect()
    }
}

/// Map integer edges back to keys and build points from the endpoints
fn assemble(
    index: &InvertedIndex,
    selected: &[(&EntityId, &EntityProfile)],
    edges: &[ScoredEdge<u32>],
) -> CooccurrenceGraph {
    // `selected` is in key order, so position == integer id
    let points: Vec<Point> = endpoint_set(edges)
        .into_iter()
        .map(|id| {
            let (key, profile) = selected[id as usize];
            let label = if profile.label.is_empty() { key.as_str() } else { profile.label.as_str() };
            Point::new(key.as_str(), label)
                .with_first_seen(profile.first_seen)
                .with_metadata(profile.display_metadata())
        })
        .collect();

    let links: Vec<Link> = edges
        .iter()
        .map(|e| Link::new(index.key(e.source), index.key(e.target), e.weight))
        .collect();

    CooccurrenceGraph::new(points, links)
}
