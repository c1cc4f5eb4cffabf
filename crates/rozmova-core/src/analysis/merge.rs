//! Combining per-chunk analyses into one.

use std::collections::HashSet;

use crate::job::Analysis;

/// Merge an ordered list of chunk analyses.
///
/// Problems and solutions are unioned with exact duplicates removed,
/// first-seen order preserved. The temperature is the arithmetic mean
/// rounded to the nearest integer; summaries are joined with a blank
/// line. Returns `None` for an empty list — the caller skips the merge
/// entirely when no chunk produced a parseable result.
pub fn merge_analyses(results: &[Analysis]) -> Option<Analysis> {
    if results.is_empty() {
        return None;
    }

    let mut problems: Vec<String> = Vec::new();
    let mut solutions: Vec<String> = Vec::new();
    let mut seen_problems: HashSet<String> = HashSet::new();
    let mut seen_solutions: HashSet<String> = HashSet::new();

    for result in results {
        for problem in &result.problems {
            if seen_problems.insert(problem.clone()) {
                problems.push(problem.clone());
            }
        }
        for solution in &result.solutions {
            if seen_solutions.insert(solution.clone()) {
                solutions.push(solution.clone());
            }
        }
    }

    let temperature_sum: u32 = results.iter().map(|r| u32::from(r.temperature)).sum();
    let temperature = (temperature_sum as f64 / results.len() as f64).round() as u8;

    let summary = results
        .iter()
        .map(|r| r.summary.as_str())
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n");

    Some(Analysis {
        problems,
        solutions,
        temperature,
        summary,
    })
}
