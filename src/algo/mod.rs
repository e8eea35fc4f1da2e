//! Graph analytics module
//!
//! Consumers that run over a finished [`CooccurrenceGraph`] and annotate its
//! points. Builders never depend on anything in here.

pub mod common;
pub mod community;

use crate::error::GraphBuildResult;
use crate::graph::CooccurrenceGraph;

pub use common::GraphView;
pub use community::{connected_components, ComponentResult, ConnectedComponentLabeler, COMMUNITY_KEY};

/// An analysis pass over a finished graph
///
/// Implementations may add point metadata but must not add or remove
/// points or links.
pub trait GraphAnalytics {
    fn name(&self) -> &str;

    fn annotate(&self, graph: &mut CooccurrenceGraph) -> GraphBuildResult<()>;
}

/// Run `passes` over `graph` in order
pub fn run_all(graph: &mut CooccurrenceGraph, passes: &[&dyn GraphAnalytics]) -> GraphBuildResult<()> {
    for pass in passes {
        tracing::info!("Running analytics pass: {}", pass.name());
        pass.annotate(graph)?;
    }
    Ok(())
}
