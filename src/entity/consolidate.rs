//! Bounded-memory pair weight accumulation
//!
//! Pair observations `(row, col)` are packed into a single `u64` key and
//! buffered. A full buffer is sorted and run-length counted into a
//! [`WeightTable`], which is then merged into the running total. Peak memory
//! is the buffer plus the number of distinct pairs, regardless of how many
//! observations stream through.

use crate::config::{ConsolidationConfig, PrunePolicy};
use rayon::prelude::*;
use serde::Serialize;
use std::cmp::Ordering;
use tracing::debug;

/// Packing base; larger than any `u32` id
pub const PAIR_BASE: u64 = 1 << 32;

/// Pack an ascending pair into one key
#[inline]
pub fn pack(row: u32, col: u32) -> u64 {
    (row as u64) * PAIR_BASE + col as u64
}

#[inline]
pub fn unpack(key: u64) -> (u32, u32) {
    ((key / PAIR_BASE) as u32, (key % PAIR_BASE) as u32)
}

/// Sorted unique packed pairs with their summed weights
///
/// Weights saturate at `u32::MAX` rather than wrapping.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WeightTable {
    keys: Vec<u64>,
    weights: Vec<u32>,
}

impl WeightTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Group-by-sum over raw packed keys, by sorting and counting runs
    pub fn from_packed(mut keys: Vec<u64>) -> Self {
        keys.sort_unstable();
        let mut table = WeightTable {
            keys: Vec::new(),
            weights: Vec::new(),
        };
        for key in keys {
            match table.keys.last() {
                Some(&last) if last == key => {
                    if let Some(w) = table.weights.last_mut() {
                        *w = w.saturating_add(1);
                    }
                }
                _ => {
                    table.keys.push(key);
                    table.weights.push(1);
                }
            }
        }
        table.keys.shrink_to_fit();
        table.weights.shrink_to_fit();
        table
    }

    /// Exact count of a set of pair observations
    pub fn from_pairs(pairs: impl IntoIterator<Item = (u32, u32)>) -> Self {
        Self::from_packed(pairs.into_iter().map(|(r, c)| pack(r, c)).collect())
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Weight of a pair, if present
    pub fn get(&self, row: u32, col: u32) -> Option<u32> {
        self.keys
            .binary_search(&pack(row, col))
            .ok()
            .map(|idx| self.weights[idx])
    }

    /// `(row, col, weight)` in ascending pair order
    pub fn iter(&self) -> impl Iterator<Item = (u32, u32, u32)> + '_ {
        self.keys.iter().zip(&self.weights).map(|(&key, &w)| {
            let (row, col) = unpack(key);
            (row, col, w)
        })
    }

    /// Sum of all weights, i.e. the number of observations represented
    pub fn total_weight(&self) -> u64 {
        self.weights.iter().map(|&w| w as u64).sum()
    }

    /// Keep only pairs whose weight satisfies `keep`; returns the number removed
    pub fn retain_weights(&mut self, keep: impl Fn(u32) -> bool) -> usize {
        let before = self.keys.len();
        let mut write = 0;
        for read in 0..self.keys.len() {
            if keep(self.weights[read]) {
                self.keys[write] = self.keys[read];
                self.weights[write] = self.weights[read];
                write += 1;
            }
        }
        self.keys.truncate(write);
        self.weights.truncate(write);
        before - write
    }

    /// Combine two tables, adding the weights of shared pairs
    ///
    /// Both inputs are sorted, so this is a linear merge of the two runs.
    /// The operation is associative and commutative.
    pub fn merge(&self, other: &WeightTable) -> WeightTable {
        let mut keys = Vec::with_capacity(self.len() + other.len());
        let mut weights = Vec::with_capacity(self.len() + other.len());
        let (mut i, mut j) = (0, 0);
        while i < self.len() && j < other.len() {
            match self.keys[i].cmp(&other.keys[j]) {
                Ordering::Less => {
                    keys.push(self.keys[i]);
                    weights.push(self.weights[i]);
                    i += 1;
                }
                Ordering::Greater => {
                    keys.push(other.keys[j]);
                    weights.push(other.weights[j]);
                    j += 1;
                }
                Ordering::Equal => {
                    keys.push(self.keys[i]);
                    weights.push(self.weights[i].saturating_add(other.weights[j]));
                    i += 1;
                    j += 1;
                }
            }
        }
        keys.extend_from_slice(&self.keys[i..]);
        weights.extend_from_slice(&self.weights[i..]);
        keys.extend_from_slice(&other.keys[j..]);
        weights.extend_from_slice(&other.weights[j..]);
        WeightTable { keys, weights }
    }

    /// Merge any number of partial tables on the rayon pool
    pub fn merge_all(tables: Vec<WeightTable>) -> WeightTable {
        tables
            .into_par_iter()
            .reduce(WeightTable::new, |a, b| a.merge(&b))
    }
}

/// Merge a freshly consolidated batch into the running total
pub fn consolidate(running: &WeightTable, batch: &WeightTable) -> WeightTable {
    running.merge(batch)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ConsolidationStats {
    /// Raw pair observations pushed
    pub observations: u64,
    /// Buffer flushes performed
    pub consolidations: usize,
    /// Pairs discarded by the prune policy
    pub pruned: u64,
    /// Largest running table size seen
    pub peak_pairs: usize,
}

/// Buffers pair observations and periodically folds them into a running table
#[derive(Debug)]
pub struct BatchConsolidator {
    config: ConsolidationConfig,
    min_weight: u64,
    /// Sources (tags) whose pairs have not been fully pushed yet; `None`
    /// disables pruning since nothing bounds future increments
    remaining_sources: Option<u64>,
    buffer: Vec<u64>,
    running: WeightTable,
    stats: ConsolidationStats,
}

impl BatchConsolidator {
    pub fn new(config: ConsolidationConfig, min_weight: u64) -> Self {
        BatchConsolidator {
            config,
            min_weight,
            remaining_sources: None,
            buffer: Vec::with_capacity(config.batch_capacity.min(1 << 20)),
            running: WeightTable::new(),
            stats: ConsolidationStats::default(),
        }
    }

    /// Declare how many sources will be pushed; each source may add at most
    /// one to any given pair
    pub fn expect_sources(&mut self, sources: u64) {
        self.remaining_sources = Some(sources);
    }

    /// Mark one declared source as fully pushed
    pub fn finish_source(&mut self) {
        if let Some(remaining) = self.remaining_sources.as_mut() {
            *remaining = remaining.saturating_sub(1);
        }
    }

    /// Record one observation of the pair `row < col`
    pub fn push(&mut self, row: u32, col: u32) {
        debug_assert!(row < col, "pairs must be pushed in ascending order");
        self.buffer.push(pack(row, col));
        self.stats.observations += 1;
        if self.buffer.len() >= self.config.batch_capacity {
            self.flush();
        }
    }

    /// Consolidate the buffer into the running table
    pub fn flush(&mut self) {
        if self.buffer.is_empty() {
            return;
        }
        let batch = WeightTable::from_packed(std::mem::take(&mut self.buffer));
        self.running = consolidate(&self.running, &batch);
        self.stats.consolidations += 1;
        self.prune();
        self.stats.peak_pairs = self.stats.peak_pairs.max(self.running.len());
        debug!(
            "Consolidation #{}: {} unique pairs after {} observations",
            self.stats.consolidations,
            self.running.len(),
            self.stats.observations
        );
    }

    /// Drop pairs that can no longer reach `min_weight`
    ///
    /// The source being pushed when a flush happens is still counted as
    /// remaining, which over-estimates future increments and keeps the rule
    /// conservative.
    fn prune(&mut self) {
        if self.config.prune != PrunePolicy::Unreachable {
            return;
        }
        let Some(remaining) = self.remaining_sources else {
            return;
        };
        let min_weight = self.min_weight;
        if remaining >= min_weight {
            return;
        }
        let removed = self
            .running
            .retain_weights(|w| w as u64 + remaining >= min_weight);
        self.stats.pruned += removed as u64;
    }

    pub fn stats(&self) -> ConsolidationStats {
        self.stats
    }

    /// Flush what is left and return the final table
    pub fn finish(mut self) -> (WeightTable, ConsolidationStats) {
        self.flush();
        (self.running, self.stats)
    }
}

/// Push every ascending pair of a sorted, deduplicated posting list
///
/// Pairs are streamed into the consolidator one at a time; the full
/// `k * (k - 1) / 2` set is never materialized.
pub fn emit_pairs(postings: &[u32], sink: &mut BatchConsolidator) -> u64 {
    let mut emitted = 0;
    for (i, &row) in postings.iter().enumerate() {
        for &col in &postings[i + 1..] {
            sink.push(row, col);
            emitted += 1;
        }
    }
    emitted
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pack_roundtrip_extremes() {
        assert_eq!(unpack(pack(0, 1)), (0, 1));
        assert_eq!(unpack(pack(u32::MAX - 1, u32::MAX)), (u32::MAX - 1, u32::MAX));
        assert!(pack(0, u32::MAX) < pack(1, 0));
    }

    #[test]
    fn test_from_pairs_counts_runs() {
        let table = WeightTable::from_pairs(vec![(1, 2), (0, 3), (1, 2), (1, 2), (0, 3)]);
        assert_eq!(table.len(), 2);
        assert_eq!(table.get(1, 2), Some(3));
        assert_eq!(table.get(0, 3), Some(2));
        assert_eq!(table.get(0, 1), None);
        assert_eq!(table.total_weight(), 5);
        let order: Vec<_> = table.iter().collect();
        assert_eq!(order, vec![(0, 3, 2), (1, 2, 3)]);
    }

    #[test]
    fn test_merge_sums_shared_pairs() {
        let a = WeightTable::from_pairs(vec![(0, 1), (0, 2)]);
        let b = WeightTable::from_pairs(vec![(0, 2), (1, 2)]);
        let merged = consolidate(&a, &b);
        assert_eq!(merged.get(0, 1), Some(1));
        assert_eq!(merged.get(0, 2), Some(2));
        assert_eq!(merged.get(1, 2), Some(1));
        assert_eq!(merged, b.merge(&a));
        assert_eq!(a.merge(&WeightTable::new()), a);
    }

    #[test]
    fn test_merge_saturates_weight() {
        let full = WeightTable {
            keys: vec![pack(0, 1)],
            weights: vec![u32::MAX],
        };
        let one = WeightTable::from_pairs(vec![(0, 1)]);
        assert_eq!(full.merge(&one).get(0, 1), Some(u32::MAX));
    }

    #[test]
    fn test_emit_pairs() {
        let mut sink = BatchConsolidator::new(ConsolidationConfig::default(), 1);
        assert_eq!(emit_pairs(&[1, 4, 7, 9], &mut sink), 6);
        assert_eq!(emit_pairs(&[5], &mut sink), 0);
        let (table, stats) = sink.finish();
        assert_eq!(table.len(), 6);
        assert_eq!(stats.observations, 6);
        assert_eq!(stats.consolidations, 1);
    }

    #[test]
    fn test_small_batches_flush_often() {
        let config = ConsolidationConfig::default()
            .with_batch_capacity(2)
            .with_prune(PrunePolicy::Never);
        let mut sink = BatchConsolidator::new(config, 1);
        for _ in 0..3 {
            emit_pairs(&[0, 1, 2], &mut sink);
        }
        let (table, stats) = sink.finish();
        assert_eq!(stats.consolidations, 5);
        assert_eq!(table.get(0, 1), Some(3));
        assert_eq!(table.get(1, 2), Some(3));
    }

    #[test]
    fn test_prune_only_unreachable_pairs() {
        let config = ConsolidationConfig::default().with_batch_capacity(1);
        let mut sink = BatchConsolidator::new(config, 3);
        sink.expect_sources(3);

        // Source 1: pairs (0,1) and (2,3)
        emit_pairs(&[0, 1], &mut sink);
        emit_pairs(&[2, 3], &mut sink);
        sink.finish_source();
        // Source 2: (0,1) again
        emit_pairs(&[0, 1], &mut sink);
        sink.finish_source();
        // One source left: (2,3) has weight 1 and can reach at most 2 < 3
        emit_pairs(&[0, 1], &mut sink);
        sink.finish_source();

        let (table, stats) = sink.finish();
        assert_eq!(table.get(0, 1), Some(3));
        assert_eq!(table.get(2, 3), None);
        assert_eq!(stats.pruned, 1);
    }

    #[test]
    fn test_no_prune_without_declared_sources() {
        let config = ConsolidationConfig::default().with_batch_capacity(1);
        let mut sink = BatchConsolidator::new(config, 10);
        emit_pairs(&[0, 1], &mut sink);
        let (table, stats) = sink.finish();
        assert_eq!(table.get(0, 1), Some(1));
        assert_eq!(stats.pruned, 0);
    }

    #[test]
    fn test_merge_all_parallel() {
        let parts = vec![
            WeightTable::from_pairs(vec![(0, 1)]),
            WeightTable::from_pairs(vec![(0, 1), (2, 3)]),
            WeightTable::from_pairs(vec![(2, 3), (0, 1)]),
        ];
        let merged = WeightTable::merge_all(parts);
        assert_eq!(merged.get(0, 1), Some(3));
        assert_eq!(merged.get(2, 3), Some(2));
    }
}
