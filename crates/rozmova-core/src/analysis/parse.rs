//! Heuristic parser for free-text analysis responses.
//!
//! The model is asked for labeled sections (problems, solutions, a 1-10
//! temperature with justification, a summary), but the reply is free text
//! and models drift. Parsing is best effort: sections are classified by
//! keyword in their first line, unrecognized sections are ignored, and a
//! missing or malformed temperature falls back to the neutral 5. The
//! parser never fails; worst case is empty lists and a defaulted score.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::job::Analysis;

static SECTION_SPLIT: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n\n+").unwrap());
static LIST_MARKER: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[\s\-*•\d.)]+").unwrap());
static FIRST_INTEGER: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d+").unwrap());
static SCORE_DENOMINATOR: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*/\s*\d+").unwrap());

/// Fallback conversational-warmth score when none can be extracted.
pub const DEFAULT_TEMPERATURE: u8 = 5;

/// Parser output: the structured analysis plus a marker telling "the
/// model said 5" apart from "no usable number was found".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedAnalysis {
    pub analysis: Analysis,
    pub temperature_defaulted: bool,
}

/// Parse a model reply into a structured analysis.
pub fn parse_analysis_response(text: &str) -> ParsedAnalysis {
    let mut problems: Vec<String> = Vec::new();
    let mut solutions: Vec<String> = Vec::new();
    let mut temperature = DEFAULT_TEMPERATURE;
    let mut temperature_found = false;
    let mut justification = String::new();
    let mut summary = String::new();

    for section in SECTION_SPLIT.split(text) {
        let mut lines = section.lines();
        let Some(first) = lines.next() else { continue };
        let header = first.trim().to_lowercase();

        if header.contains("проблем") {
            collect_list_items(lines, "проблем", &mut problems);
        } else if header.contains("рішен") {
            collect_list_items(lines, "рішен", &mut solutions);
        } else if header.contains("температур") {
            if let Some(found) = FIRST_INTEGER.find(section) {
                temperature = parse_score(found.as_str());
                temperature_found = true;
                justification = extract_justification(&section[found.end()..]);
            }
        } else if header.contains("короткий зміст") || header.contains("підсум") {
            summary = lines.collect::<Vec<_>>().join(" ").trim().to_string();
        }
    }

    if temperature_found && !justification.is_empty() {
        summary = format!(
            "{summary}\n\nОцінка температури розмови ({temperature}/10): {justification}"
        );
    }

    ParsedAnalysis {
        analysis: Analysis {
            problems,
            solutions,
            temperature,
            summary: summary.trim().to_string(),
        },
        temperature_defaulted: !temperature_found,
    }
}

/// Strip list markers and keep non-empty lines that are not just an echo
/// of the section header keyword.
fn collect_list_items<'a>(
    lines: impl Iterator<Item = &'a str>,
    header_keyword: &str,
    out: &mut Vec<String>,
) {
    for line in lines {
        let cleaned = LIST_MARKER.replace(line, "").trim().to_string();
        if !cleaned.is_empty() && !cleaned.to_lowercase().contains(header_keyword) {
            out.push(cleaned);
        }
    }
}

/// The score is known to be 1..=10; clamp stray values into range and
/// fall back to the default when the literal does not parse at all.
fn parse_score(literal: &str) -> u8 {
    literal
        .parse::<i64>()
        .map(|n| n.clamp(1, 10) as u8)
        .unwrap_or(DEFAULT_TEMPERATURE)
}

/// Everything after the score literal, minus a "/10" denominator and
/// leading punctuation, with line breaks flattened to spaces.
fn extract_justification(rest: &str) -> String {
    let rest = SCORE_DENOMINATOR.replace(rest, "");
    rest.trim_start_matches([',', ':', ';', '.', ' '])
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}
