//! Shared state for request handlers

use std::path::PathBuf;

/// Application state: the root of the document tree
/// (`<root>/<stand>/<flow>/integration.yaml`)
#[derive(Clone)]
pub struct AppState {
    pub docs_root: PathBuf,
}

impl AppState {
    pub fn new(docs_root: impl Into<PathBuf>) -> Self {
        Self {
            docs_root: docs_root.into(),
        }
    }
}
