//! Run many queries against one index at once.

use crate::error::Result;
use crate::index::SearchIndex;
use crate::timing::LogDuration;
use crate::Document;
use rayon::prelude::*;

/// Top documents for every query, in query order.
///
/// Queries run concurrently on the rayon pool. If any query fails to parse the
/// whole batch fails with one of the errors.
pub fn process_queries<S>(index: &SearchIndex, queries: &[S]) -> Result<Vec<Vec<Document>>>
where
    S: AsRef<str> + Sync,
{
    let _timer = LogDuration::new(format!("process {} queries", queries.len()));
    queries
        .par_iter()
        .map(|query| index.find_top_documents(query.as_ref()))
        .collect()
}

/// Like [`process_queries`] with all result lists concatenated.
pub fn process_queries_joined<S>(index: &SearchIndex, queries: &[S]) -> Result<Vec<Document>>
where
    S: AsRef<str> + Sync,
{
    Ok(process_queries(index, queries)?.into_iter().flatten().collect())
}
