//! Transcript de-duplication.
//!
//! Speech-to-text engines frequently emit stuttered repeats ("так так так
//! проблема проблема"). Cleanup works in two passes: within each sentence,
//! words whose surrounding phrases overlap prior content are dropped;
//! then whole sentences that mostly repeat an earlier sentence are dropped.

use std::collections::HashSet;

use super::similarity::similarity;

/// Phrases of up to this many words are tested against prior content.
const MAX_PHRASE_WORDS: usize = 5;

/// Overlap ratio above which a phrase or sentence counts as a repeat.
const REPEAT_THRESHOLD: f64 = 0.8;

/// Remove repeated phrases and sentences from a raw transcript.
///
/// Sentences are split on `.`, `!`, `?` with the terminator retained;
/// surviving sentences are re-joined with single spaces.
pub fn cleanup_transcript(text: &str) -> String {
    let mut cleaned_sentences: Vec<String> = Vec::new();
    let mut used_sentences: HashSet<String> = HashSet::new();

    for sentence in split_terminated_sentences(text) {
        let cleaned = clean_sentence(sentence.trim());
        if cleaned.is_empty() {
            continue;
        }

        let lowered = cleaned.to_lowercase();
        let is_duplicate = used_sentences
            .iter()
            .any(|used| similarity(&lowered, used) > REPEAT_THRESHOLD);
        if !is_duplicate {
            used_sentences.insert(lowered);
            cleaned_sentences.push(cleaned);
        }
    }

    cleaned_sentences.join(" ").trim().to_string()
}

/// Split into sentences, each carrying its run of terminator punctuation.
/// Text after the last terminator is not a sentence and is dropped.
fn split_terminated_sentences(text: &str) -> Vec<&str> {
    let mut sentences = Vec::new();
    let mut start = 0;
    let mut in_terminator = false;

    for (idx, ch) in text.char_indices() {
        let is_term = matches!(ch, '.' | '!' | '?');
        if in_terminator && !is_term {
            if !text[start..idx].trim().is_empty() {
                sentences.push(&text[start..idx]);
            }
            start = idx;
        }
        in_terminator = is_term;
    }
    if in_terminator && !text[start..].trim().is_empty() {
        sentences.push(&text[start..]);
    }
    sentences
}

/// Scan a sentence left to right, keeping the first word and dropping any
/// later word whose candidate phrases (1..=5 words starting there) overlap
/// an already-accepted phrase above the repeat threshold.
fn clean_sentence(sentence: &str) -> String {
    let words: Vec<&str> = sentence.split_whitespace().collect();
    if words.is_empty() {
        return String::new();
    }

    let mut result: Vec<&str> = vec![words[0]];
    let mut used_phrases: HashSet<String> = HashSet::new();
    used_phrases.insert(words[0].to_lowercase());

    for i in 1..words.len() {
        let mut should_add = true;

        for len in 1..=MAX_PHRASE_WORDS {
            if i + len > words.len() {
                break;
            }
            let phrase = words[i..i + len].join(" ").to_lowercase();
            if used_phrases
                .iter()
                .any(|used| similarity(&phrase, used) > REPEAT_THRESHOLD)
            {
                should_add = false;
                break;
            }
            used_phrases.insert(phrase);
        }

        if should_add {
            result.push(words[i]);
        }
    }

    result.join(" ")
}
