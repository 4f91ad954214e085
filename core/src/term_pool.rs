//! Append-only string interner for index terms.
//!
//! Every term stored in the index is a [`Term`] handed out by the pool. Handles are
//! reference counted, so they stay valid no matter what happens to the documents
//! that introduced them.

use std::collections::HashSet;
use std::sync::Arc;

/// Interned term. Cloning is a reference count bump.
pub type Term = Arc<str>;

#[derive(Debug, Default)]
pub struct TermPool {
    terms: HashSet<Term>,
}

impl TermPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the pooled handle for `word`, inserting it on first sight.
    pub fn intern(&mut self, word: &str) -> Term {
        if let Some(term) = self.terms.get(word) {
            return Arc::clone(term);
        }
        let term: Term = Arc::from(word);
        self.terms.insert(Arc::clone(&term));
        term
    }

    pub fn contains(&self, word: &str) -> bool {
        self.terms.contains(word)
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intern_returns_the_same_allocation() {
        let mut pool = TermPool::new();
        let a = pool.intern("cat");
        let b = pool.intern("cat");
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(pool.len(), 1);
    }

    #[test]
    fn distinct_words_get_distinct_entries() {
        let mut pool = TermPool::new();
        pool.intern("cat");
        pool.intern("dog");
        assert_eq!(pool.len(), 2);
        assert!(pool.contains("dog"));
        assert!(!pool.contains("bird"));
    }
}
