//! Error types for graph construction
//!
//! Only input-shape and configuration problems are errors. Data-quality
//! issues (empty tag sets, sentinel values, bad timestamps) are absorbed by
//! the builders and show up in their statistics instead.

use thiserror::Error;

/// Errors that can occur while building a graph
#[derive(Error, Debug)]
pub enum GraphBuildError {
    /// No column in the source schema matches any of the candidates
    #[error("Missing column: expected one of [{0}]")]
    MissingColumn(String),

    /// Configuration values are inconsistent
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// More entities than fit the dense 32-bit id space
    #[error("Entity universe too large for 32-bit ids: {0} entities")]
    TooManyEntities(usize),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Config parse error: {0}")]
    ConfigParse(#[from] serde_yaml::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type GraphBuildResult<T> = Result<T, GraphBuildError>;
