//! TF-IDF ranking and per-document query matching.

use crate::concurrent_map::ConcurrentMap;
use crate::error::Result;
use crate::index::{PostingList, SearchIndex};
use crate::query::{parse_query, ExecutionPolicy, Query};
use crate::term_pool::Term;
use crate::{DocId, Document, DocumentStatus};
use rayon::prelude::*;
use std::cmp::Reverse;
use std::collections::BTreeMap;

/// Predicate accepting only documents with the given status.
pub fn status_filter(
    status: DocumentStatus,
) -> impl Fn(DocId, DocumentStatus, i32) -> bool + Sync + Copy {
    move |_, document_status, _| document_status == status
}

/// Order by relevance descending; documents within `epsilon` of the most
/// relevant member of their run form a tie group ordered by rating
/// descending, then id.
///
/// Groups are bounded by their first element, so two documents whose
/// relevances differ by `epsilon` or more never swap places.
fn sort_by_relevance(documents: &mut [Document], epsilon: f64) {
    documents.sort_by(|a, b| b.relevance.total_cmp(&a.relevance));
    let mut start = 0;
    while start < documents.len() {
        let mut end = start + 1;
        while end < documents.len()
            && documents[start].relevance - documents[end].relevance < epsilon
        {
            end += 1;
        }
        documents[start..end].sort_by_key(|doc| (Reverse(doc.rating), doc.id));
        start = end;
    }
}

impl SearchIndex {
    /// Top documents with status `Actual`.
    pub fn find_top_documents(&self, raw_query: &str) -> Result<Vec<Document>> {
        self.find_top_documents_by_status(raw_query, DocumentStatus::Actual)
    }

    pub fn find_top_documents_by_status(
        &self,
        raw_query: &str,
        status: DocumentStatus,
    ) -> Result<Vec<Document>> {
        self.find_top_documents_by(raw_query, status_filter(status))
    }

    pub fn find_top_documents_by<P>(&self, raw_query: &str, predicate: P) -> Result<Vec<Document>>
    where
        P: Fn(DocId, DocumentStatus, i32) -> bool + Sync,
    {
        self.find_top_documents_with(ExecutionPolicy::Sequential, raw_query, predicate)
    }

    /// [`Self::find_top_documents`] under an explicit execution policy.
    pub fn find_top_documents_with_policy(
        &self,
        policy: ExecutionPolicy,
        raw_query: &str,
    ) -> Result<Vec<Document>> {
        self.find_top_documents_with_status(policy, raw_query, DocumentStatus::Actual)
    }

    pub fn find_top_documents_with_status(
        &self,
        policy: ExecutionPolicy,
        raw_query: &str,
        status: DocumentStatus,
    ) -> Result<Vec<Document>> {
        self.find_top_documents_with(policy, raw_query, status_filter(status))
    }

    /// Rank every document matching `raw_query` and accepted by `predicate`,
    /// returning at most `max_results` of them.
    ///
    /// Both policies produce the same list for the same index and query.
    pub fn find_top_documents_with<P>(
        &self,
        policy: ExecutionPolicy,
        raw_query: &str,
        predicate: P,
    ) -> Result<Vec<Document>>
    where
        P: Fn(DocId, DocumentStatus, i32) -> bool + Sync,
    {
        let query = parse_query(raw_query, self.stop_words(), true, policy)?;
        let relevance = match policy {
            ExecutionPolicy::Sequential => self.accumulate_relevance(&query, &predicate)?,
            ExecutionPolicy::Parallel => self.par_accumulate_relevance(&query, &predicate)?,
        };

        let mut matched = relevance
            .into_iter()
            .map(|(id, relevance)| {
                self.meta(id).map(|meta| Document { id, relevance, rating: meta.rating })
            })
            .collect::<Result<Vec<_>>>()?;
        let total_hits = matched.len();
        sort_by_relevance(&mut matched, self.config().relevance_epsilon);
        matched.truncate(self.config().max_results);
        tracing::debug!(query = raw_query, total_hits, returned = matched.len(), ?policy, "ranked");
        Ok(matched)
    }

    fn inverse_document_freq(&self, postings: &PostingList) -> f64 {
        (self.document_count() as f64 / postings.len() as f64).ln()
    }

    fn accumulate_relevance<P>(
        &self,
        query: &Query<'_>,
        predicate: &P,
    ) -> Result<BTreeMap<DocId, f64>>
    where
        P: Fn(DocId, DocumentStatus, i32) -> bool,
    {
        let mut relevance = BTreeMap::new();
        for term in &query.plus_terms {
            let Some(postings) = self.postings(term) else {
                continue;
            };
            let idf = self.inverse_document_freq(postings);
            for (&id, &tf) in postings {
                let meta = self.meta(id)?;
                if predicate(id, meta.status, meta.rating) {
                    *relevance.entry(id).or_insert(0.0) += tf * idf;
                }
            }
        }
        for term in &query.minus_terms {
            if let Some(postings) = self.postings(term) {
                for id in postings.keys() {
                    relevance.remove(id);
                }
            }
        }
        Ok(relevance)
    }

    /// Same result as [`Self::accumulate_relevance`]. Plus terms are scored
    /// concurrently into a sharded accumulator; exclusion starts only after
    /// every plus term is done.
    fn par_accumulate_relevance<P>(
        &self,
        query: &Query<'_>,
        predicate: &P,
    ) -> Result<BTreeMap<DocId, f64>>
    where
        P: Fn(DocId, DocumentStatus, i32) -> bool + Sync,
    {
        let relevance: ConcurrentMap<DocId, f64> =
            ConcurrentMap::new(self.config().accumulator_buckets);
        query.plus_terms.par_iter().try_for_each(|term| -> Result<()> {
            let Some(postings) = self.postings(term) else {
                return Ok(());
            };
            let idf = self.inverse_document_freq(postings);
            for (&id, &tf) in postings {
                let meta = self.meta(id)?;
                if predicate(id, meta.status, meta.rating) {
                    *relevance.access(id) += tf * idf;
                }
            }
            Ok(())
        })?;
        query.minus_terms.par_iter().for_each(|term| {
            if let Some(postings) = self.postings(term) {
                for &id in postings.keys() {
                    relevance.erase(id);
                }
            }
        });
        Ok(relevance.drain_to_ordered_map())
    }

    pub fn match_document(
        &self,
        raw_query: &str,
        id: DocId,
    ) -> Result<(Vec<Term>, DocumentStatus)> {
        self.match_document_with(ExecutionPolicy::Sequential, raw_query, id)
    }

    /// Plus terms of `raw_query` present in document `id`, or nothing if the
    /// document contains any minus term.
    ///
    /// The order of the returned terms is not part of the contract.
    pub fn match_document_with(
        &self,
        policy: ExecutionPolicy,
        raw_query: &str,
        id: DocId,
    ) -> Result<(Vec<Term>, DocumentStatus)> {
        let status = self.document_status(id)?;
        let frequencies = self.word_frequencies(id)?;
        let lookup = |term: &&str| frequencies.get_key_value(*term).map(|(t, _)| Term::clone(t));

        match policy {
            ExecutionPolicy::Sequential => {
                let query = parse_query(raw_query, self.stop_words(), true, policy)?;
                if query.minus_terms.iter().any(|t| frequencies.contains_key(*t)) {
                    return Ok((Vec::new(), status));
                }
                Ok((query.plus_terms.iter().filter_map(lookup).collect(), status))
            }
            ExecutionPolicy::Parallel => {
                let query = parse_query(raw_query, self.stop_words(), false, policy)?;
                if query.minus_terms.par_iter().any(|t| frequencies.contains_key(*t)) {
                    return Ok((Vec::new(), status));
                }
                let mut matched: Vec<Term> =
                    query.plus_terms.par_iter().filter_map(lookup).collect();
                matched.par_sort_unstable();
                matched.dedup();
                Ok((matched, status))
            }
        }
    }
}
