//! Sentence-aligned chunking of long transcripts.
//!
//! The analysis model has a practical input bound, so long transcripts are
//! split into segments that never break mid-sentence. Chunks joined with
//! the same separator used internally reproduce the input exactly.

/// Maximum characters per analysis chunk.
pub const MAX_CHUNK_CHARS: usize = 16_000;

/// Separator used between sentences inside a chunk and between chunks.
pub const CHUNK_JOIN: &str = " ";

/// Split a transcript into bounded, sentence-aligned chunks.
///
/// Greedy packing: sentences are appended to the current chunk until the
/// next one would push it past the bound. A single sentence longer than
/// the bound becomes its own oversized chunk rather than being split.
/// Any input at or under the bound yields exactly one chunk; empty input
/// yields none.
pub fn split_chunks(text: &str) -> Vec<String> {
    split_chunks_with_limit(text, MAX_CHUNK_CHARS)
}

pub(crate) fn split_chunks_with_limit(text: &str, max_chars: usize) -> Vec<String> {
    let mut chunks: Vec<String> = Vec::new();
    let mut current = String::new();

    for sentence in split_sentences(text) {
        if current.len() + sentence.len() > max_chars && !current.is_empty() {
            chunks.push(current);
            current = sentence.to_string();
        } else {
            if !current.is_empty() {
                current.push_str(CHUNK_JOIN);
            }
            current.push_str(sentence);
        }
    }

    if !current.is_empty() {
        chunks.push(current);
    }

    chunks
}

/// Split on whitespace that follows sentence-ending punctuation, keeping
/// the punctuation with its sentence. A trailing fragment without a
/// terminator still counts as a sentence.
fn split_sentences(text: &str) -> Vec<&str> {
    let text = text.trim();
    if text.is_empty() {
        return Vec::new();
    }

    let mut sentences = Vec::new();
    let mut start = 0;
    let mut after_terminator = false;
    let mut in_gap = false;

    for (idx, ch) in text.char_indices() {
        if ch.is_whitespace() {
            if after_terminator {
                in_gap = true;
            }
            continue;
        }
        if in_gap {
            sentences.push(text[start..idx].trim_end());
            start = idx;
            in_gap = false;
        }
        after_terminator = matches!(ch, '.' | '!' | '?');
    }
    sentences.push(text[start..].trim_end());
    sentences
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sentence(n: usize, len: usize) -> String {
        // A sentence of exactly `len` ASCII characters ending with a period.
        let word = format!("slovo{n} ");
        let mut s = word.repeat(len / word.len() + 1);
        s.truncate(len - 1);
        s.push('.');
        s
    }

    #[test]
    fn short_input_is_a_single_chunk() {
        let text = "Добрий день. Чим можу допомогти?";
        let chunks = split_chunks(text);
        assert_eq!(chunks, vec![text.to_string()]);
    }

    #[test]
    fn empty_input_yields_no_chunks() {
        assert!(split_chunks("").is_empty());
        assert!(split_chunks("   ").is_empty());
    }

    #[test]
    fn join_of_chunks_reproduces_input() {
        let text = format!("{} {} {}", sentence(1, 400), sentence(2, 400), sentence(3, 400));
        let chunks = split_chunks_with_limit(&text, 500);
        assert!(chunks.len() > 1);
        assert_eq!(chunks.join(CHUNK_JOIN), text);
    }

    #[test]
    fn no_chunk_exceeds_the_bound() {
        let text = (1..=8).map(|n| sentence(n, 300)).collect::<Vec<_>>().join(" ");
        for chunk in split_chunks_with_limit(&text, 700) {
            assert!(chunk.len() <= 700, "chunk of {} chars", chunk.len());
            assert!(!chunk.is_empty());
        }
    }

    #[test]
    fn chunks_end_at_sentence_boundaries() {
        let text = (1..=6).map(|n| sentence(n, 200)).collect::<Vec<_>>().join(" ");
        for chunk in split_chunks_with_limit(&text, 450) {
            assert!(chunk.ends_with('.'), "chunk {chunk:?} does not end a sentence");
        }
    }

    #[test]
    fn oversized_single_sentence_is_kept_whole() {
        let long = sentence(1, 900);
        let chunks = split_chunks_with_limit(&long, 100);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0], long);
    }

    #[test]
    fn trailing_fragment_without_terminator_is_kept() {
        let chunks = split_chunks("Перше речення. і хвіст без крапки");
        assert_eq!(chunks.len(), 1);
        assert!(chunks[0].ends_with("хвіст без крапки"));
    }

    #[test]
    fn sentence_split_keeps_terminators() {
        let s = split_sentences("Що?! Далі. кінець");
        assert_eq!(s, vec!["Що?!", "Далі.", "кінець"]);
    }
}
