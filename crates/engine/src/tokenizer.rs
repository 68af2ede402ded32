//! Text tokenizer for text fields and match values
//!
//! Pipeline: UAX#29 word boundaries → split on non-alphanumerics
//!           → lowercase → filter short tokens

use std::collections::HashSet;
use unicode_segmentation::UnicodeSegmentation;

/// Tokenize text into searchable terms.
///
/// # Example
///
/// ```
/// use sift_engine::tokenizer::tokenize;
///
/// let tokens = tokenize("The Quick-Brown Fox!");
/// assert_eq!(tokens, vec!["the", "quick", "brown", "fox"]);
/// ```
pub fn tokenize(text: &str) -> Vec<String> {
    text.unicode_words()
        .flat_map(|w| w.split(|c: char| !c.is_alphanumeric()))
        .map(str::to_lowercase)
        .filter(|s| s.chars().count() >= 2)
        .collect()
}

/// Tokenize and deduplicate for query processing.
///
/// # Example
///
/// ```
/// use sift_engine::tokenizer::tokenize_unique;
///
/// let tokens = tokenize_unique("test test TEST");
/// assert_eq!(tokens, vec!["test"]);
/// ```
pub fn tokenize_unique(text: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    tokenize(text)
        .into_iter()
        .filter(|t| seen.insert(t.clone()))
        .collect()
}
