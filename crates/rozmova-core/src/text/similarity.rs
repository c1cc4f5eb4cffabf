//! Word-overlap similarity metric shared by cleanup and dedup.

use std::collections::HashSet;

/// Coarse bag-of-words overlap ratio between two strings.
///
/// Both sides are tokenized on whitespace, case-insensitively; the score
/// is `|intersection of word sets| / max(|words1|, |words2|)`. Word order
/// does not matter, and either side being empty scores 0. This is meant to
/// catch speech-to-text stutter, not to be an edit distance.
pub fn similarity(a: &str, b: &str) -> f64 {
    let words_a: HashSet<String> = a.split_whitespace().map(|w| w.to_lowercase()).collect();
    let words_b: HashSet<String> = b.split_whitespace().map(|w| w.to_lowercase()).collect();

    if words_a.is_empty() || words_b.is_empty() {
        return 0.0;
    }

    let intersection = words_a.intersection(&words_b).count();
    intersection as f64 / words_a.len().max(words_b.len()) as f64
}
