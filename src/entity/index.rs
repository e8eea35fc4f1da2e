//! Tag -> entity inverted index over dense integer ids
//!
//! Entity ids are assigned by the sorted order of their string keys, so
//! integer order and key order agree and the id space is dense.

use super::record::EntityProfile;
use crate::config::DegreePolicy;
use crate::error::{GraphBuildError, GraphBuildResult};
use crate::graph::{EntityId, TagId};
use rand::rngs::StdRng;
use rand::seq::index::sample;
use rand::SeedableRng;
use serde::Serialize;
use std::collections::BTreeMap;

/// Outcome of applying a [`DegreePolicy`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DegreeReport {
    pub sampled_tags: usize,
    pub skipped_tags: usize,
}

/// Posting lists for every tag carried by the indexed entities
#[derive(Debug, Clone, Default)]
pub struct InvertedIndex {
    keys: Vec<EntityId>,
    /// Tags in sorted order; each list is ascending and duplicate-free
    postings: BTreeMap<TagId, Vec<u32>>,
}

impl InvertedIndex {
    /// Index entities given in ascending key order
    pub fn build<'a, I>(entities: I) -> GraphBuildResult<Self>
    where
        I: IntoIterator<Item = (&'a EntityId, &'a EntityProfile)>,
    {
        let mut keys: Vec<EntityId> = Vec::new();
        let mut postings: BTreeMap<TagId, Vec<u32>> = BTreeMap::new();

        for (key, profile) in entities {
            debug_assert!(keys.last().map_or(true, |last| last < key), "entities must be sorted by key");
            let id = u32::try_from(keys.len())
                .map_err(|_| GraphBuildError::TooManyEntities(keys.len() + 1))?;
            keys.push(key.clone());
            for tag in &profile.edge_tags {
                postings.entry(tag.clone()).or_default().push(id);
            }
        }

        Ok(InvertedIndex { keys, postings })
    }

    pub fn entity_count(&self) -> usize {
        self.keys.len()
    }

    pub fn tag_count(&self) -> usize {
        self.postings.len()
    }

    /// String key for an integer id
    pub fn key(&self, id: u32) -> &str {
        &self.keys[id as usize]
    }

    pub fn postings(&self, tag: &str) -> Option<&[u32]> {
        self.postings.get(tag).map(Vec::as_slice)
    }

    /// `(tag, posting list)` in ascending tag order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[u32])> {
        self.postings.iter().map(|(t, p)| (t.as_str(), p.as_slice()))
    }

    /// Posting lists that can produce at least one pair
    pub fn pair_sources(&self) -> usize {
        self.postings.values().filter(|p| p.len() >= 2).count()
    }

    /// Bound every posting list to `max_degree` entries
    ///
    /// `Skip` removes oversized tags; `Sample` keeps a uniform random subset
    /// drawn from one RNG seeded once and walked in tag order, so the same
    /// index and seed always give the same result.
    pub fn apply_degree_policy(&mut self, max_degree: usize, policy: DegreePolicy) -> DegreeReport {
        let mut report = DegreeReport::default();
        match policy {
            DegreePolicy::Skip => {
                let before = self.postings.len();
                self.postings.retain(|_, ids| ids.len() <= max_degree);
                report.skipped_tags = before - self.postings.len();
            }
            DegreePolicy::Sample { seed } => {
                let mut rng = StdRng::seed_from_u64(seed);
                for ids in self.postings.values_mut() {
                    if ids.len() <= max_degree {
                        continue;
                    }
                    let mut kept: Vec<u32> = sample(&mut rng, ids.len(), max_degree)
                        .into_iter()
                        .map(|idx| ids[idx])
                        .collect();
                    kept.sort_unstable();
                    *ids = kept;
                    report.sampled_tags += 1;
                }
            }
        }
        report
    }

    /// Edge tags of each entity after the degree policy, indexed by id
    pub fn entity_tags(&self) -> Vec<Vec<&str>> {
        let mut tags = vec![Vec::new(); self.keys.len()];
        for (tag, ids) in &self.postings {
            for &id in ids {
                tags[id as usize].push(tag.as_str());
            }
        }
        tags
    }
}
