use lazy_static::lazy_static;
use regex::Regex;
use std::collections::BTreeSet;

lazy_static! {
    static ref CONTROL: Regex = Regex::new(r"[\x00-\x1F]").expect("valid regex");
}

/// Returns true if `text` contains no character below U+0020.
pub fn is_valid_text(text: &str) -> bool {
    !CONTROL.is_match(text)
}

/// Split text into words on spaces. Runs of spaces never produce empty words.
pub fn split_into_words(text: &str) -> impl Iterator<Item = &str> {
    text.split(' ').filter(|w| !w.is_empty())
}

/// Collect the distinct non-empty words of every item in `words`.
pub fn unique_non_empty<I, S>(words: I) -> BTreeSet<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    words
        .into_iter()
        .filter(|w| !w.as_ref().is_empty())
        .map(|w| w.as_ref().to_string())
        .collect()
}
