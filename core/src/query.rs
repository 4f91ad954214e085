//! Query parsing: raw text into plus and minus term lists.

use crate::error::{Result, SearchError};
use crate::tokenizer::{is_valid_text, split_into_words};
use rayon::prelude::*;
use std::collections::BTreeSet;

/// Selects the sequential or the data-parallel implementation of an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExecutionPolicy {
    #[default]
    Sequential,
    Parallel,
}

/// Parsed query. Terms borrow from the raw query text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Query<'q> {
    pub plus_terms: Vec<&'q str>,
    pub minus_terms: Vec<&'q str>,
}

struct QueryWord<'q> {
    term: &'q str,
    is_minus: bool,
}

fn parse_query_word(token: &str) -> Result<QueryWord<'_>> {
    match token.strip_prefix('-') {
        Some("") => Err(SearchError::EmptyMinusTerm),
        Some(rest) if rest.starts_with('-') => {
            Err(SearchError::DoubleMinus { token: token.to_string() })
        }
        Some(rest) => Ok(QueryWord { term: rest, is_minus: true }),
        None => Ok(QueryWord { term: token, is_minus: false }),
    }
}

/// Parse `text` against `stop_words`.
///
/// Stop words are dropped from both lists. With `dedupe` both lists come back
/// sorted and free of repeats; otherwise they keep query order.
pub fn parse_query<'q>(
    text: &'q str,
    stop_words: &BTreeSet<String>,
    dedupe: bool,
    policy: ExecutionPolicy,
) -> Result<Query<'q>> {
    if !is_valid_text(text) {
        return Err(SearchError::InvalidQuery);
    }
    let mut query = Query::default();
    for token in split_into_words(text) {
        let word = parse_query_word(token)?;
        if stop_words.contains(word.term) {
            continue;
        }
        if word.is_minus {
            query.minus_terms.push(word.term);
        } else {
            query.plus_terms.push(word.term);
        }
    }
    if dedupe {
        match policy {
            ExecutionPolicy::Sequential => {
                sort_dedup(&mut query.plus_terms);
                sort_dedup(&mut query.minus_terms);
            }
            ExecutionPolicy::Parallel => {
                rayon::join(
                    || par_sort_dedup(&mut query.plus_terms),
                    || par_sort_dedup(&mut query.minus_terms),
                );
            }
        }
    }
    tracing::trace!(
        plus = query.plus_terms.len(),
        minus = query.minus_terms.len(),
        "parsed query"
    );
    Ok(query)
}

fn sort_dedup(terms: &mut Vec<&str>) {
    terms.sort_unstable();
    terms.dedup();
}

fn par_sort_dedup(terms: &mut Vec<&str>) {
    terms.par_sort_unstable();
    terms.dedup();
}
