//! Entity similarity graphs
//!
//! Records are merged into per-entity profiles, indexed tag -> entities, and
//! every pair of entities sharing a tag is counted through a bounded-memory
//! batch consolidator.

pub mod consolidate;
pub mod generator;
pub mod index;
pub mod record;

pub use consolidate::{emit_pairs, BatchConsolidator, ConsolidationStats, WeightTable};
pub use generator::{InvertedIndexPairGenerator, PairGeneratorStats};
pub use index::{DegreeReport, InvertedIndex};
pub use record::{EntityProfile, EntityRecord, RequiredTags};
