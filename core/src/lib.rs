//! In-process full-text search index with TF-IDF ranking.
//!
//! Documents are added with an id, text, status and ratings. Queries are plain
//! words (`cat collar`) optionally prefixed with `-` to exclude documents that
//! contain the word (`cat -dog`). Ranking and removal come in sequential and
//! parallel flavours selected by [`ExecutionPolicy`].

pub mod concurrent_map;
pub mod config;
pub mod duplicates;
pub mod error;
pub mod index;
pub mod process_queries;
pub mod query;
pub mod ranking;
pub mod request_queue;
pub mod term_pool;
pub mod timing;
pub mod tokenizer;

use serde::{Deserialize, Serialize};
use std::fmt;

pub use concurrent_map::ConcurrentMap;
pub use config::SearchConfig;
pub use duplicates::remove_duplicates;
pub use error::{ErrorKind, Result, SearchError};
pub use index::{DocMeta, Frequencies, SearchIndex};
pub use process_queries::{process_queries, process_queries_joined};
pub use query::{ExecutionPolicy, Query};
pub use ranking::status_filter;
pub use request_queue::RequestQueue;
pub use term_pool::{Term, TermPool};
pub use timing::LogDuration;

pub type DocId = i32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DocumentStatus {
    #[default]
    Actual,
    Irrelevant,
    Banned,
    Removed,
}

/// One ranked hit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: DocId,
    pub relevance: f64,
    pub rating: i32,
}

impl fmt::Display for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{{ document_id = {}, relevance = {}, rating = {} }}",
            self.id, self.relevance, self.rating
        )
    }
}
