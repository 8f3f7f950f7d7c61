//! Term extraction for the bundled indexes

use smallvec::SmallVec;

/// Distinct terms of one document, sorted
pub type Terms = SmallVec<[String; 16]>;

/// Split text into distinct lowercase alphanumeric terms
pub fn tokenize(text: &str) -> Terms {
    let mut terms: Terms = text
        .split(|c: char| !c.is_alphanumeric())
        .filter(|word| !word.is_empty())
        .map(|word| word.to_lowercase())
        .collect();
    terms.sort_unstable();
    terms.dedup();
    terms
}

/// Normalize a query term the same way documents are tokenized
pub fn normalize(term: &str) -> String {
    term.trim().to_lowercase()
}
