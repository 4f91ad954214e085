//! Document store and inverted index.
//!
//! Two mappings describe the same postings from opposite sides:
//! - term -> (doc id -> tf), split into shards by term hash
//! - doc id -> (term -> tf)
//!
//! They are kept exact transposes of each other. Scoring walks the first,
//! removal walks the second to find which posting lists to touch.
//!
//! The index is single-writer: mutation takes `&mut self`, so no read can
//! overlap an add or a removal.

use crate::config::SearchConfig;
use crate::error::{Result, SearchError};
use crate::query::ExecutionPolicy;
use crate::term_pool::{Term, TermPool};
use crate::tokenizer::{is_valid_text, split_into_words, unique_non_empty};
use crate::{DocId, DocumentStatus};
use rayon::prelude::*;
use std::collections::hash_map::DefaultHasher;
use std::collections::{btree_map, BTreeMap, BTreeSet};
use std::hash::{Hash, Hasher};
use std::iter::Copied;

/// term -> term frequency for one document.
pub type Frequencies = BTreeMap<Term, f64>;

/// doc id -> term frequency for one term.
pub(crate) type PostingList = BTreeMap<DocId, f64>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DocMeta {
    /// Integer-truncated mean of the ratings given on insert.
    pub rating: i32,
    pub status: DocumentStatus,
}

/// Inverted mapping partitioned by term hash.
///
/// Each shard is an independent map, so the parallel removal path can hand
/// every shard to at most one worker.
#[derive(Debug)]
struct TermShards {
    shards: Vec<BTreeMap<Term, PostingList>>,
}

impl TermShards {
    fn new(count: usize) -> Self {
        Self { shards: (0..count).map(|_| BTreeMap::new()).collect() }
    }

    fn shard_of(&self, term: &str) -> usize {
        let mut hasher = DefaultHasher::new();
        term.hash(&mut hasher);
        (hasher.finish() % self.shards.len() as u64) as usize
    }

    fn get(&self, term: &str) -> Option<&PostingList> {
        self.shards[self.shard_of(term)].get(term)
    }

    fn insert(&mut self, term: &Term, id: DocId, tf: f64) {
        let shard = self.shard_of(term);
        self.shards[shard].entry(Term::clone(term)).or_default().insert(id, tf);
    }

    fn remove(&mut self, term: &str, id: DocId) {
        let shard = self.shard_of(term);
        remove_posting(&mut self.shards[shard], term, id);
    }

    fn par_remove<'t, I>(&mut self, terms: I, id: DocId)
    where
        I: IntoIterator<Item = &'t Term>,
    {
        let mut by_shard: Vec<Vec<&Term>> = vec![Vec::new(); self.shards.len()];
        for term in terms {
            by_shard[self.shard_of(term)].push(term);
        }
        self.shards
            .par_iter_mut()
            .zip(by_shard.into_par_iter())
            .filter(|(_, terms)| !terms.is_empty())
            .for_each(|(shard, terms)| {
                for term in terms {
                    remove_posting(shard, term, id);
                }
            });
    }

    fn iter(&self) -> impl Iterator<Item = (&Term, &PostingList)> + '_ {
        self.shards.iter().flat_map(|shard| shard.iter())
    }
}

fn remove_posting(shard: &mut BTreeMap<Term, PostingList>, term: &str, id: DocId) {
    if let Some(postings) = shard.get_mut(term) {
        postings.remove(&id);
        if postings.is_empty() {
            shard.remove(term);
        }
    }
}

fn average_rating(ratings: &[i32]) -> i32 {
    if ratings.is_empty() {
        return 0;
    }
    let sum: i64 = ratings.iter().map(|&r| i64::from(r)).sum();
    (sum / ratings.len() as i64) as i32
}

#[derive(Debug)]
pub struct SearchIndex {
    config: SearchConfig,
    stop_words: BTreeSet<String>,
    terms: TermPool,
    postings: TermShards,
    doc_terms: BTreeMap<DocId, Frequencies>,
    docs: BTreeMap<DocId, DocMeta>,
}

impl SearchIndex {
    pub fn new<I, S>(stop_words: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self::with_config(stop_words, SearchConfig::default())
    }

    /// Build an index whose stop words are the space separated words of `text`.
    pub fn from_stop_words_text(text: &str) -> Result<Self> {
        Self::new(split_into_words(text))
    }

    pub fn with_config<I, S>(stop_words: I, config: SearchConfig) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        config.validate()?;
        let stop_words = unique_non_empty(stop_words);
        if let Some(word) = stop_words.iter().find(|w| !is_valid_text(w)) {
            return Err(SearchError::InvalidStopWord { word: word.clone() });
        }
        Ok(Self {
            postings: TermShards::new(config.term_shards),
            config,
            stop_words,
            terms: TermPool::new(),
            doc_terms: BTreeMap::new(),
            docs: BTreeMap::new(),
        })
    }

    pub fn add_document(
        &mut self,
        id: DocId,
        text: &str,
        status: DocumentStatus,
        ratings: &[i32],
    ) -> Result<()> {
        if id < 0 {
            return Err(SearchError::InvalidId { id });
        }
        if self.docs.contains_key(&id) {
            return Err(SearchError::DuplicateId { id });
        }
        if !is_valid_text(text) {
            return Err(SearchError::InvalidText);
        }

        let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
        let mut total = 0usize;
        for word in split_into_words(text).filter(|w| !self.stop_words.contains(*w)) {
            *counts.entry(word).or_insert(0) += 1;
            total += 1;
        }

        let mut frequencies = Frequencies::new();
        for (word, count) in counts {
            let term = self.terms.intern(word);
            let tf = count as f64 / total as f64;
            self.postings.insert(&term, id, tf);
            frequencies.insert(term, tf);
        }

        tracing::debug!(id, terms = frequencies.len(), words = total, "document added");
        self.doc_terms.insert(id, frequencies);
        self.docs.insert(id, DocMeta { rating: average_rating(ratings), status });
        Ok(())
    }

    pub fn remove_document(&mut self, id: DocId) -> Result<()> {
        self.remove_document_with(ExecutionPolicy::Sequential, id)
    }

    /// Retract every posting of `id` from both mappings.
    ///
    /// The parallel policy groups the document's terms by shard and clears each
    /// shard on its own worker.
    pub fn remove_document_with(&mut self, policy: ExecutionPolicy, id: DocId) -> Result<()> {
        if !self.docs.contains_key(&id) {
            return Err(SearchError::UnknownId { id });
        }
        let frequencies = self.doc_terms.remove(&id).unwrap_or_default();
        match policy {
            ExecutionPolicy::Sequential => {
                for term in frequencies.keys() {
                    self.postings.remove(term, id);
                }
            }
            ExecutionPolicy::Parallel => self.postings.par_remove(frequencies.keys(), id),
        }
        self.docs.remove(&id);
        tracing::debug!(id, terms = frequencies.len(), ?policy, "document removed");
        Ok(())
    }

    /// Term frequencies of a live document.
    pub fn word_frequencies(&self, id: DocId) -> Result<&Frequencies> {
        self.doc_terms.get(&id).ok_or(SearchError::UnknownId { id })
    }

    pub fn document_status(&self, id: DocId) -> Result<DocumentStatus> {
        self.docs
            .get(&id)
            .map(|meta| meta.status)
            .ok_or(SearchError::UnknownId { id })
    }

    /// Live document ids in ascending order.
    pub fn document_ids(&self) -> Copied<btree_map::Keys<'_, DocId, DocMeta>> {
        self.docs.keys().copied()
    }

    pub fn document_count(&self) -> usize {
        self.docs.len()
    }

    /// Number of interned terms, including terms whose documents are all gone.
    pub fn term_count(&self) -> usize {
        self.terms.len()
    }

    pub fn stop_words(&self) -> &BTreeSet<String> {
        &self.stop_words
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    pub(crate) fn postings(&self, term: &str) -> Option<&PostingList> {
        self.postings.get(term)
    }

    pub(crate) fn meta(&self, id: DocId) -> Result<DocMeta> {
        self.docs
            .get(&id)
            .copied()
            .ok_or_else(|| SearchError::Inconsistent(format!("posting for unknown document {id}")))
    }

    /// Verify that the inverted and forward mappings are transposes of each
    /// other and that both agree with the set of live ids.
    pub fn check_consistency(&self) -> Result<()> {
        if !self.doc_terms.keys().eq(self.docs.keys()) {
            return Err(SearchError::Inconsistent(
                "forward mapping and metadata hold different ids".into(),
            ));
        }
        let mut inverted_entries = 0usize;
        for (term, postings) in self.postings.iter() {
            if postings.is_empty() {
                return Err(SearchError::Inconsistent(format!("empty posting list for {term:?}")));
            }
            for (id, tf) in postings {
                inverted_entries += 1;
                let forward = self.doc_terms.get(id).and_then(|f| f.get(term));
                if forward != Some(tf) {
                    return Err(SearchError::Inconsistent(format!(
                        "posting ({term:?}, {id}) has no matching forward entry"
                    )));
                }
            }
        }
        let forward_entries: usize = self.doc_terms.values().map(BTreeMap::len).sum();
        if forward_entries != inverted_entries {
            return Err(SearchError::Inconsistent(format!(
                "{forward_entries} forward entries vs {inverted_entries} postings"
            )));
        }
        Ok(())
    }
}

impl<'a> IntoIterator for &'a SearchIndex {
    type Item = DocId;
    type IntoIter = Copied<btree_map::Keys<'a, DocId, DocMeta>>;

    fn into_iter(self) -> Self::IntoIter {
        self.document_ids()
    }
}
