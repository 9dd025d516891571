//! Error types for the flowviz core
//!
//! One taxonomy for the whole pipeline. Loading and parsing failures are
//! contained per document at the loader boundary; they never abort a full
//! rebuild of the remaining graph.

use thiserror::Error;

/// Main error type for document loading and parsing
#[derive(Error, Debug)]
pub enum FlowVizError {
    #[error("document load failed: {0}")]
    Load(String),

    #[error("invalid document: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
