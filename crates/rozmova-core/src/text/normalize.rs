//! Lexical normalization of cleaned transcripts.
//!
//! Call-center audio is Ukrainian with frequent Russian colloquialisms;
//! the speech-to-text engine transcribes them as heard. A fixed table maps
//! those word forms to their Ukrainian equivalents, matching whole words
//! case-insensitively while preserving the casing pattern of the match.
//! A punctuation/whitespace canonicalization pass follows. The whole pass
//! is idempotent: applying it twice yields the same output as once.

use once_cell::sync::Lazy;
use regex::{Captures, Regex, RegexBuilder};

/// Russian colloquialism → Ukrainian equivalent, whole words only.
static REPLACEMENTS: &[(&str, &str)] = &[
    ("да", "так"),
    ("нет", "ні"),
    ("щас", "зараз"),
    ("сейчас", "зараз"),
    ("пока", "поки"),
    ("спасибо", "дякую"),
    ("пожалуйста", "будь ласка"),
    ("конечно", "звичайно"),
    ("тоже", "також"),
    ("вообще", "взагалі"),
    ("короче", "коротше"),
    ("ладно", "гаразд"),
    ("хорошо", "добре"),
    ("всё", "все"),
    ("что", "що"),
    ("если", "якщо"),
    ("только", "тільки"),
];

static REPLACEMENT_PATTERNS: Lazy<Vec<(Regex, &'static str)>> = Lazy::new(|| {
    REPLACEMENTS
        .iter()
        .map(|(from, to)| {
            let re = RegexBuilder::new(&format!(r"\b{}\b", regex::escape(from)))
                .case_insensitive(true)
                .build()
                .expect("valid replacement pattern");
            (re, *to)
        })
        .collect()
});

static WHITESPACE_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());
static SPACE_BEFORE_PUNCT: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+([.,!?])").unwrap());
static QUOTE_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r#""+"#).unwrap());
static PUNCT_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"[.,!?]{2,}").unwrap());
static PUNCT_BEFORE_LETTER: Lazy<Regex> = Lazy::new(|| Regex::new(r"([.,!?])(\p{L})").unwrap());

/// Apply the substitution table and canonicalize punctuation/whitespace.
pub fn normalize_transcript(text: &str) -> String {
    let mut normalized = text.to_string();

    for (re, to) in REPLACEMENT_PATTERNS.iter() {
        normalized = re
            .replace_all(&normalized, |caps: &Captures| preserve_case(&caps[0], to))
            .into_owned();
    }

    let normalized = WHITESPACE_RUN.replace_all(&normalized, " ");
    let normalized = SPACE_BEFORE_PUNCT.replace_all(&normalized, "$1");
    let normalized = QUOTE_RUN.replace_all(&normalized, "\"");
    let normalized = PUNCT_RUN.replace_all(&normalized, |caps: &Captures| {
        collapse_repeated_marks(&caps[0])
    });
    let normalized = PUNCT_BEFORE_LETTER.replace_all(&normalized, "$1 $2");

    collapse_repeated_words(normalized.trim())
}

/// Re-shape `replacement` to follow the casing pattern of `original`:
/// all-lowercase, all-uppercase, or leading capital.
fn preserve_case(original: &str, replacement: &str) -> String {
    if original == original.to_lowercase() {
        return replacement.to_string();
    }
    if original == original.to_uppercase() {
        return replacement.to_uppercase();
    }
    let mut chars = original.chars();
    if chars.next().is_some_and(char::is_uppercase) {
        let mut repl = replacement.chars();
        return match repl.next() {
            Some(first) => first.to_uppercase().collect::<String>() + repl.as_str(),
            None => String::new(),
        };
    }
    replacement.to_string()
}

/// Collapse immediately repeated identical marks inside a punctuation run,
/// leaving mixed sequences like "?!" alone.
fn collapse_repeated_marks(run: &str) -> String {
    let mut out = String::with_capacity(run.len());
    let mut prev: Option<char> = None;
    for ch in run.chars() {
        if prev != Some(ch) {
            out.push(ch);
        }
        prev = Some(ch);
    }
    out
}

fn is_word_char(ch: char) -> bool {
    ch.is_alphanumeric() || matches!(ch, '-' | '\'' | '’')
}

/// Leading word-character run of a token and whatever trails it.
fn split_leading_word(token: &str) -> (&str, &str) {
    let end = token
        .char_indices()
        .find(|(_, ch)| !is_word_char(*ch))
        .map(|(idx, _)| idx)
        .unwrap_or(token.len());
    token.split_at(end)
}

/// Collapse immediately repeated whole words (case-insensitive) to one
/// occurrence. A trailing repeat that carries sentence punctuation keeps
/// the punctuation: "так так." becomes "так.".
fn collapse_repeated_words(text: &str) -> String {
    let mut out: Vec<String> = Vec::new();
    for token in text.split(' ') {
        if let Some(prev) = out.last() {
            let prev_is_bare = prev.chars().all(is_word_char) && !prev.is_empty();
            let (word, rest) = split_leading_word(token);
            let repeats = prev_is_bare
                && !word.is_empty()
                && word.to_lowercase() == prev.to_lowercase()
                && (rest.is_empty() || rest.starts_with(['.', ',', '!', '?']));
            if repeats {
                if !rest.is_empty() {
                    let kept = out.pop().unwrap_or_default();
                    out.push(format!("{kept}{rest}"));
                }
                continue;
            }
        }
        out.push(token.to_string());
    }
    out.join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn is_idempotent() {
        let samples = [
            "Да , конечно!!  Сейчас   всё зроблю ...",
            "добрий день. дякую за дзвінок",
            "Що?!   Не  може   бути,,",
            "так так так ладно",
            "\"\"лапки\"\" і ХОРОШО",
        ];
        for sample in samples {
            let once = normalize_transcript(sample);
            let twice = normalize_transcript(&once);
            assert_eq!(once, twice, "not idempotent for {sample:?}");
        }
    }

    #[test]
    fn replaces_whole_words_only() {
        assert_eq!(normalize_transcript("да"), "так");
        // "да" inside a longer word is left alone.
        assert_eq!(normalize_transcript("данные"), "данные");
    }

    #[test]
    fn preserves_casing_pattern() {
        assert_eq!(normalize_transcript("Да"), "Так");
        assert_eq!(normalize_transcript("ДА"), "ТАК");
        assert_eq!(normalize_transcript("Хорошо"), "Добре");
    }

    #[test]
    fn multi_word_replacement() {
        assert_eq!(normalize_transcript("Пожалуйста"), "Будь ласка");
    }

    #[test]
    fn collapses_whitespace_runs() {
        assert_eq!(normalize_transcript("добрий   день"), "добрий день");
    }

    #[test]
    fn removes_space_before_punctuation() {
        assert_eq!(normalize_transcript("добре , дякую !"), "добре, дякую!");
    }

    #[test]
    fn collapses_repeated_punctuation() {
        assert_eq!(normalize_transcript("невже!!!"), "невже!");
        // Mixed runs are not repeats.
        assert_eq!(normalize_transcript("невже?!"), "невже?!");
    }

    #[test]
    fn inserts_space_after_punctuation_before_letter() {
        assert_eq!(normalize_transcript("добре.дякую"), "добре. дякую");
    }

    #[test]
    fn collapses_repeated_words() {
        assert_eq!(normalize_transcript("так так так"), "так");
        assert_eq!(normalize_transcript("ну ну добре"), "ну добре");
        assert_eq!(normalize_transcript("так так."), "так.");
    }

    #[test]
    fn repeated_word_collapse_is_case_insensitive() {
        assert_eq!(normalize_transcript("Так так"), "Так");
    }

    #[test]
    fn replacement_then_collapse_compose() {
        // Both forms normalize to the same word, which then collapses.
        assert_eq!(normalize_transcript("да так"), "так");
    }

    #[test]
    fn punctuated_word_is_not_collapsed_into_previous_sentence() {
        assert_eq!(normalize_transcript("добре. добре слухаю"), "добре. добре слухаю");
    }
}
