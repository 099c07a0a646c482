use crate::searcher::DEFAULT_MAX_RESULTS;
use serde::Deserialize;
use std::path::PathBuf;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Directory holding the persisted index. `None` keeps it in a temporary store.
    pub index_dir: Option<PathBuf>,
    /// Cap on ranked results per search.
    pub max_results: usize,
    /// fsync on every commit.
    pub flush_on_commit: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self { index_dir: None, max_results: DEFAULT_MAX_RESULTS, flush_on_commit: true }
    }
}

impl EngineConfig {
    pub fn new<P: Into<PathBuf>>(index_dir: P) -> Self {
        Self { index_dir: Some(index_dir.into()), ..Self::default() }
    }

    pub fn temporary() -> Self {
        Self::default()
    }

    pub fn with_max_results(mut self, max_results: usize) -> Self {
        self.max_results = max_results;
        self
    }

    pub fn with_flush_on_commit(mut self, flush: bool) -> Self {
        self.flush_on_commit = flush;
        self
    }
}
