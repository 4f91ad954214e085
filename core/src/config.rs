use crate::error::{Result, SearchError};
use serde::{Deserialize, Serialize};

/// Maximum number of documents a top-K query returns.
pub const MAX_RESULT_DOCUMENT_COUNT: usize = 5;
/// Relevance values closer than this are ranked by rating instead.
pub const RELEVANCE_EPSILON: f64 = 1e-6;
/// Bucket count of the per-query relevance accumulator.
pub const ACCUMULATOR_BUCKETS: usize = 10;
/// Number of partitions of the term -> postings mapping.
pub const TERM_SHARDS: usize = 16;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub max_results: usize,
    pub relevance_epsilon: f64,
    pub accumulator_buckets: usize,
    pub term_shards: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            max_results: MAX_RESULT_DOCUMENT_COUNT,
            relevance_epsilon: RELEVANCE_EPSILON,
            accumulator_buckets: ACCUMULATOR_BUCKETS,
            term_shards: TERM_SHARDS,
        }
    }
}

impl SearchConfig {
    pub fn validate(&self) -> Result<()> {
        if self.accumulator_buckets == 0 {
            return Err(SearchError::InvalidConfig("accumulator_buckets must be > 0".into()));
        }
        if self.term_shards == 0 {
            return Err(SearchError::InvalidConfig("term_shards must be > 0".into()));
        }
        if self.relevance_epsilon.is_nan() || self.relevance_epsilon < 0.0 {
            return Err(SearchError::InvalidConfig(
                "relevance_epsilon must be a non-negative number".into(),
            ));
        }
        Ok(())
    }
}
