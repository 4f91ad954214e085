use crate::error::Result;
use crate::index::SearchIndex;
use crate::term_pool::Term;
use crate::DocId;
use std::collections::BTreeSet;

/// Remove every document whose set of distinct terms equals that of a
/// document with a smaller id. Returns the removed ids in ascending order.
pub fn remove_duplicates(index: &mut SearchIndex) -> Result<Vec<DocId>> {
    let mut seen: BTreeSet<Vec<Term>> = BTreeSet::new();
    let mut duplicates = Vec::new();
    for id in index.document_ids() {
        let words: Vec<Term> = index.word_frequencies(id)?.keys().cloned().collect();
        if !seen.insert(words) {
            duplicates.push(id);
        }
    }
    for &id in &duplicates {
        index.remove_document(id)?;
        tracing::info!(id, "found duplicate document");
    }
    Ok(duplicates)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DocumentStatus::Actual;

    #[test]
    fn removes_documents_with_same_word_set() {
        let mut idx = SearchIndex::from_stop_words_text("and with").unwrap();
        idx.add_document(1, "funny pet and nasty rat", Actual, &[7, 2, 7]).unwrap();
        idx.add_document(2, "funny pet with curly hair", Actual, &[1, 2]).unwrap();
        // same words as 2
        idx.add_document(3, "funny pet with curly hair", Actual, &[1, 2]).unwrap();
        // only stop words differ
        idx.add_document(4, "funny pet and curly hair", Actual, &[1, 2]).unwrap();
        // repeated words, same set as 1
        idx.add_document(5, "funny funny pet and nasty nasty rat", Actual, &[1, 2]).unwrap();
        // new word
        idx.add_document(6, "funny pet and not very nasty rat", Actual, &[1, 2]).unwrap();
        // same set in a different order
        idx.add_document(7, "very nasty rat and not very funny pet", Actual, &[1, 2]).unwrap();
        idx.add_document(8, "pet with rat and rat and rat", Actual, &[1, 2]).unwrap();
        idx.add_document(9, "nasty rat with curly hair", Actual, &[1, 2]).unwrap();

        let removed = remove_duplicates(&mut idx).unwrap();
        assert_eq!(removed, vec![3, 4, 5, 7]);
        assert_eq!(idx.document_ids().collect::<Vec<_>>(), vec![1, 2, 6, 8, 9]);
        idx.check_consistency().unwrap();
    }
}
