//! Build configuration
//!
//! Configuration is fixed at construction time. Both builders validate their
//! config up front so a bad combination fails before any records are read.

use crate::error::{GraphBuildError, GraphBuildResult};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Configuration for the tag co-occurrence accumulator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CooccurrenceConfig {
    /// Minimum pair weight kept in the output
    pub min_cooccurrence: u64,
    /// Node cap by strength (0 = unlimited)
    pub max_nodes: usize,
    /// Edge cap by weight (0 = unlimited)
    pub max_edges: usize,
    /// Clip reported weights at this value (0 = unlimited)
    pub max_edge_weight: u64,
}

impl Default for CooccurrenceConfig {
    fn default() -> Self {
        Self {
            min_cooccurrence: 2,
            max_nodes: 0,
            max_edges: 0,
            max_edge_weight: 0,
        }
    }
}

impl CooccurrenceConfig {
    pub fn with_min_cooccurrence(mut self, min: u64) -> Self {
        self.min_cooccurrence = min;
        self
    }

    pub fn with_max_nodes(mut self, max: usize) -> Self {
        self.max_nodes = max;
        self
    }

    pub fn with_max_edges(mut self, max: usize) -> Self {
        self.max_edges = max;
        self
    }

    pub fn with_max_edge_weight(mut self, max: u64) -> Self {
        self.max_edge_weight = max;
        self
    }

    /// Check that the limits are consistent
    pub fn validate(&self) -> GraphBuildResult<()> {
        validate_weight_clip(self.min_cooccurrence, self.max_edge_weight)
    }

    /// Parse and validate a YAML document
    pub fn from_yaml_str(yaml: &str) -> GraphBuildResult<Self> {
        let config: Self = parse_yaml(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a YAML file
    pub fn from_yaml_file(path: impl AsRef<Path>) -> GraphBuildResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&text)
    }
}

/// What to do with a tag whose posting list is longer than `max_tag_degree`
///
/// There is deliberately no `Default` impl: the two policies produce very
/// different graphs for hub tags like "rock", so callers must pick one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "policy", rename_all = "snake_case")]
pub enum DegreePolicy {
    /// Drop the tag entirely; it contributes no pairs
    Skip,
    /// Uniformly subsample the posting list down to `max_tag_degree`
    Sample {
        /// Seed for the sampler, so repeated builds are reproducible
        seed: u64,
    },
}

impl DegreePolicy {
    /// Map the boolean `sample_high_degree` switch onto a policy
    pub fn from_flag(sample_high_degree: bool, seed: u64) -> Self {
        if sample_high_degree {
            DegreePolicy::Sample { seed }
        } else {
            DegreePolicy::Skip
        }
    }

    pub fn samples(&self) -> bool {
        matches!(self, DegreePolicy::Sample { .. })
    }
}

/// Intermediate pruning applied after each batch merge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrunePolicy {
    /// Keep every pair until the final threshold
    Never,
    /// Drop a pair only once `weight + remaining_sources < min_weight`,
    /// i.e. when no amount of further input can lift it to the threshold
    #[default]
    Unreachable,
}

/// Memory bounds for batched pair consolidation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsolidationConfig {
    /// Raw pair observations buffered before a consolidation pass
    pub batch_capacity: usize,
    pub prune: PrunePolicy,
}

impl Default for ConsolidationConfig {
    fn default() -> Self {
        Self {
            // ~32 MB of packed u64 keys
            batch_capacity: 4_000_000,
            prune: PrunePolicy::Unreachable,
        }
    }
}

impl ConsolidationConfig {
    pub fn with_batch_capacity(mut self, capacity: usize) -> Self {
        self.batch_capacity = capacity;
        self
    }

    pub fn with_prune(mut self, prune: PrunePolicy) -> Self {
        self.prune = prune;
        self
    }
}

fn default_min_cooccurrence() -> u64 {
    2
}

fn default_max_tag_degree() -> usize {
    200
}

/// Configuration for the inverted-index entity pair generator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PairGeneratorConfig {
    /// Minimum number of shared tags for an edge
    #[serde(default = "default_min_cooccurrence")]
    pub min_cooccurrence: u64,
    /// Entity cap by tag diversity, applied before indexing (0 = unlimited)
    #[serde(default)]
    pub max_nodes: usize,
    /// Edge cap by weight (0 = unlimited)
    #[serde(default)]
    pub max_edges: usize,
    /// Clip reported weights at this value (0 = unlimited)
    #[serde(default)]
    pub max_edge_weight: u64,
    /// Posting lists longer than this are handled by `degree_policy`
    #[serde(default = "default_max_tag_degree")]
    pub max_tag_degree: usize,
    pub degree_policy: DegreePolicy,
    /// Any shared tag makes an edge and every weight is reported as 1
    #[serde(default)]
    pub unweighted: bool,
    /// Keep only each entity's top-K neighbours (0 = full pairwise mode)
    #[serde(default)]
    pub max_edges_per_node: usize,
    #[serde(default)]
    pub consolidation: ConsolidationConfig,
}

impl PairGeneratorConfig {
    /// Defaults for everything except the hub-tag policy
    pub fn new(degree_policy: DegreePolicy) -> Self {
        Self {
            min_cooccurrence: default_min_cooccurrence(),
            max_nodes: 0,
            max_edges: 0,
            max_edge_weight: 0,
            max_tag_degree: default_max_tag_degree(),
            degree_policy,
            unweighted: false,
            max_edges_per_node: 0,
            consolidation: ConsolidationConfig::default(),
        }
    }

    pub fn with_min_cooccurrence(mut self, min: u64) -> Self {
        self.min_cooccurrence = min;
        self
    }

    pub fn with_max_nodes(mut self, max: usize) -> Self {
        self.max_nodes = max;
        self
    }

    pub fn with_max_edges(mut self, max: usize) -> Self {
        self.max_edges = max;
        self
    }

    pub fn with_max_edge_weight(mut self, max: u64) -> Self {
        self.max_edge_weight = max;
        self
    }

    pub fn with_max_tag_degree(mut self, max: usize) -> Self {
        self.max_tag_degree = max;
        self
    }

    pub fn with_unweighted(mut self, unweighted: bool) -> Self {
        self.unweighted = unweighted;
        self
    }

    pub fn with_max_edges_per_node(mut self, max: usize) -> Self {
        self.max_edges_per_node = max;
        self
    }

    pub fn with_consolidation(mut self, consolidation: ConsolidationConfig) -> Self {
        self.consolidation = consolidation;
        self
    }

    /// Threshold actually applied; unweighted mode keeps any shared tag
    pub fn effective_min_weight(&self) -> u64 {
        if self.unweighted {
            1
        } else {
            self.min_cooccurrence
        }
    }

    /// Check that the limits are consistent
    pub fn validate(&self) -> GraphBuildResult<()> {
        if self.max_tag_degree < 2 {
            return Err(GraphBuildError::InvalidConfig(format!(
                "max_tag_degree must be at least 2 (got {})",
                self.max_tag_degree
            )));
        }
        if self.consolidation.batch_capacity == 0 {
            return Err(GraphBuildError::InvalidConfig(
                "consolidation.batch_capacity must be positive".to_string(),
            ));
        }
        if !self.unweighted {
            validate_weight_clip(self.min_cooccurrence, self.max_edge_weight)?;
        }
        Ok(())
    }

    /// Parse and validate a YAML document
    pub fn from_yaml_str(yaml: &str) -> GraphBuildResult<Self> {
        let config: Self = parse_yaml(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a YAML file
    pub fn from_yaml_file(path: impl AsRef<Path>) -> GraphBuildResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&text)
    }
}

fn validate_weight_clip(min_weight: u64, max_edge_weight: u64) -> GraphBuildResult<()> {
    if max_edge_weight > 0 && max_edge_weight < min_weight {
        return Err(GraphBuildError::InvalidConfig(format!(
            "max_edge_weight ({}) is below min_cooccurrence ({})",
            max_edge_weight, min_weight
        )));
    }
    Ok(())
}

fn parse_yaml<T: DeserializeOwned>(yaml: &str) -> GraphBuildResult<T> {
    Ok(serde_yaml::from_str(yaml)?)
}
