//! Graph data model
//!
//! The types every builder emits:
//! - `Point` and `Link`, the node and edge records of the output contract
//! - `CooccurrenceGraph`, the `{points, links}` container
//! - `CanonicalPair` and the tag/entity id aliases used while accumulating

pub mod edge;
pub mod node;
pub mod output;
pub mod property;
pub mod types;

// Re-export main types
pub use edge::Link;
pub use node::Point;
pub use output::{external_links, CooccurrenceGraph};
pub use property::{PropertyMap, PropertyValue};
pub use types::{CanonicalPair, EntityId, Observation, TagId};
