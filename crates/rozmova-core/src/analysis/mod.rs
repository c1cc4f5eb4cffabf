//! Structured analysis of finished transcripts: prompt construction,
//! chunked endpoint calls, free-text response parsing and merging.

mod merge;
mod parse;
mod prompt;
mod runner;

pub use merge::merge_analyses;
pub use parse::{DEFAULT_TEMPERATURE, ParsedAnalysis, parse_analysis_response};
pub use prompt::{ANALYSIS_SYSTEM_PROMPT, build_analysis_prompt};
pub use runner::{AnalysisBackend, AnalysisReport, AnalysisRunner, HttpAnalysisBackend};
