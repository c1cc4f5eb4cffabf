//! Error taxonomy for the processing pipeline.
//!
//! Errors fall into two camps: fatal ones that abort a job immediately
//! (missing credentials, bad input) and transient ones that the retry
//! machinery is allowed to swallow up to the attempt cap (timeouts,
//! connection drops, non-2xx responses, malformed response bodies).

use thiserror::Error;

/// Everything that can go wrong while a job is being processed.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Missing credentials or endpoint. Not retried.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Bad input (wrong MIME kind, empty payload). Not retried.
    #[error("validation error: {0}")]
    Validation(String),

    /// A request exceeded its time bound. Retryable, and reported
    /// distinctly from a generic transport failure.
    #[error("request timed out after {0} seconds")]
    Timeout(u64),

    /// Network or connection failure. Retryable.
    #[error("transport failure: {0}")]
    Transport(String),

    /// The service answered with a non-2xx status. Retryable; carries
    /// the service-provided message when one could be extracted.
    #[error("service error: {0}")]
    Remote(String),

    /// A 2xx response whose body did not have the expected shape.
    /// Retryable: the next attempt may produce a well-formed one.
    #[error("unexpected response format: {0}")]
    Format(String),
}

impl PipelineError {
    /// Whether the retry machinery may attempt this call again.
    pub fn is_retryable(&self) -> bool {
        !matches!(
            self,
            PipelineError::Configuration(_) | PipelineError::Validation(_)
        )
    }

    /// Classify a reqwest error into the pipeline taxonomy.
    pub(crate) fn from_reqwest(err: reqwest::Error, timeout_secs: u64) -> Self {
        if err.is_timeout() {
            PipelineError::Timeout(timeout_secs)
        } else if err.is_connect() {
            PipelineError::Transport(format!("cannot connect to service: {err}"))
        } else {
            PipelineError::Transport(err.to_string())
        }
    }
}

/// Result type alias used throughout the pipeline.
pub type Result<T> = std::result::Result<T, PipelineError>;
