//! Chunked analysis orchestration, local-or-remote.
//!
//! A transcript is split into sentence-aligned chunks; each chunk is sent
//! sequentially to the configured endpoint, parsed, and the per-chunk
//! results merged. A chunk whose retries are exhausted is skipped and the
//! merged result marked partial; a fatal error aborts the run. A run with
//! no parseable chunk at all is an error, so the caller never attaches an
//! empty analysis.

use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use uuid::Uuid;

use crate::config::{ANALYSIS_DECODING_TEMPERATURE, AnalysisConfig, AnalysisTarget, HOSTED_CHAT_URL};
use crate::error::{PipelineError, Result};
use crate::http::get_http_client;
use crate::job::{Analysis, AnalysisSource, LogLevel};
use crate::retry::{RetryPolicy, call_with_retry};
use crate::store::JobStore;

use super::merge::merge_analyses;
use super::parse::parse_analysis_response;
use super::prompt::{ANALYSIS_SYSTEM_PROMPT, build_analysis_prompt};

/// Per-attempt bound on a hosted chat-completion call.
const HOSTED_ANALYSIS_TIMEOUT_SECS: u64 = 60;

/// Per-attempt bound on a self-hosted generation call, which may run on
/// modest hardware.
const LOCAL_ANALYSIS_TIMEOUT_SECS: u64 = 120;

/// Outcome of one analysis run over a whole transcript.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisReport {
    pub analysis: Analysis,
    /// True when at least one chunk was skipped after exhausting retries.
    pub partial: bool,
    pub source: AnalysisSource,
}

/// One model completion for one prompt.
#[async_trait]
pub trait AnalysisBackend: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String>;
}

#[derive(Deserialize)]
struct ChatMessage {
    content: String,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct GenerateResponse {
    response: String,
}

/// HTTP backend for a hosted chat-completion model or a self-hosted
/// generation endpoint.
pub struct HttpAnalysisBackend {
    target: AnalysisTarget,
}

impl HttpAnalysisBackend {
    pub fn new(target: AnalysisTarget) -> Self {
        Self { target }
    }

    async fn complete_hosted(&self, api_key: &str, model: &str, prompt: &str) -> Result<String> {
        let client = get_http_client()?;
        let body = serde_json::json!({
            "model": model,
            "messages": [
                { "role": "system", "content": ANALYSIS_SYSTEM_PROMPT },
                { "role": "user", "content": prompt },
            ],
            "temperature": ANALYSIS_DECODING_TEMPERATURE,
        });

        let response = client
            .post(HOSTED_CHAT_URL)
            .timeout(Duration::from_secs(HOSTED_ANALYSIS_TIMEOUT_SECS))
            .header("Authorization", format!("Bearer {api_key}"))
            .json(&body)
            .send()
            .await
            .map_err(|e| PipelineError::from_reqwest(e, HOSTED_ANALYSIS_TIMEOUT_SECS))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| PipelineError::Transport(format!("failed to read response: {e}")))?;
        if !status.is_success() {
            return Err(PipelineError::Remote(chat_error_message(
                status.as_u16(),
                &text,
            )));
        }

        let parsed: ChatResponse = serde_json::from_str(&text)
            .map_err(|_| PipelineError::Format(format!("invalid response format: {text}")))?;
        parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| PipelineError::Format("response contained no choices".into()))
    }

    async fn complete_local(&self, url: &str, model: &str, prompt: &str) -> Result<String> {
        let client = get_http_client()?;
        let body = serde_json::json!({
            "model": model,
            "prompt": prompt,
            "stream": false,
            "temperature": ANALYSIS_DECODING_TEMPERATURE,
        });

        let endpoint = format!("{}/api/generate", url.trim_end_matches('/'));
        let response = client
            .post(endpoint)
            .timeout(Duration::from_secs(LOCAL_ANALYSIS_TIMEOUT_SECS))
            .json(&body)
            .send()
            .await
            .map_err(|e| PipelineError::from_reqwest(e, LOCAL_ANALYSIS_TIMEOUT_SECS))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| PipelineError::Transport(format!("failed to read response: {e}")))?;
        if !status.is_success() {
            return Err(PipelineError::Remote(format!(
                "failed to get response from local model: {}",
                if text.trim().is_empty() {
                    format!("HTTP error, status: {}", status.as_u16())
                } else {
                    text.trim().to_string()
                }
            )));
        }

        let parsed: GenerateResponse = serde_json::from_str(&text)
            .map_err(|_| PipelineError::Format(format!("invalid response format: {text}")))?;
        Ok(parsed.response)
    }
}

/// Pull a structured error message out of a non-2xx chat response body.
fn chat_error_message(status: u16, body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
        if let Some(message) = value
            .get("error")
            .and_then(|e| e.get("message"))
            .and_then(|m| m.as_str())
        {
            return message.to_string();
        }
    }
    format!("HTTP error, status: {status}")
}

#[async_trait]
impl AnalysisBackend for HttpAnalysisBackend {
    async fn complete(&self, prompt: &str) -> Result<String> {
        match &self.target {
            AnalysisTarget::Hosted { api_key, model } => {
                self.complete_hosted(api_key, model, prompt).await
            }
            AnalysisTarget::Local { url, model } => self.complete_local(url, model, prompt).await,
        }
    }
}

/// Drives a chunked analysis run against some backend.
pub struct AnalysisRunner {
    backend: Box<dyn AnalysisBackend>,
    policy: RetryPolicy,
    source: AnalysisSource,
    chunk_limit: usize,
}

impl AnalysisRunner {
    /// Build a runner from configuration. Returns `Ok(None)` when analysis
    /// is disabled; an enabled configuration with no target is an error.
    pub fn from_config(config: &AnalysisConfig) -> Result<Option<Self>> {
        if !config.enabled {
            return Ok(None);
        }
        let target = config.target.clone().ok_or_else(|| {
            PipelineError::Configuration(
                "analysis is enabled but no API key or local endpoint is configured".into(),
            )
        })?;
        let source = match target {
            AnalysisTarget::Hosted { .. } => AnalysisSource::Remote,
            AnalysisTarget::Local { .. } => AnalysisSource::Local,
        };
        Ok(Some(Self {
            backend: Box::new(HttpAnalysisBackend::new(target)),
            policy: RetryPolicy::analysis(),
            source,
            chunk_limit: crate::text::MAX_CHUNK_CHARS,
        }))
    }

    pub fn with_backend(backend: Box<dyn AnalysisBackend>, source: AnalysisSource) -> Self {
        Self {
            backend,
            policy: RetryPolicy::analysis(),
            source,
            chunk_limit: crate::text::MAX_CHUNK_CHARS,
        }
    }

    /// Lower the chunk bound so multi-chunk runs can be exercised without
    /// multi-kilobyte fixtures.
    #[cfg(test)]
    pub(crate) fn with_chunk_limit(mut self, limit: usize) -> Self {
        self.chunk_limit = limit;
        self
    }

    pub fn source(&self) -> AnalysisSource {
        self.source
    }

    /// Analyze a transcript chunk by chunk and merge the results.
    ///
    /// Chunks are processed in order; each gets the full retry schedule.
    /// Fatal errors abort immediately. A chunk that exhausts its retries
    /// is announced with a warning and skipped, and the report is marked
    /// partial. If no chunk yields a result, the last error is returned.
    pub async fn run(
        &self,
        job_id: Uuid,
        transcript: &str,
        store: &dyn JobStore,
    ) -> Result<AnalysisReport> {
        let chunks = crate::text::split_chunks_with_limit(transcript, self.chunk_limit);
        if chunks.is_empty() {
            return Err(PipelineError::Validation(
                "nothing to analyze: transcript is empty".into(),
            ));
        }

        let total = chunks.len();
        let mut parsed: Vec<Analysis> = Vec::with_capacity(total);
        let mut partial = false;
        let mut last_err: Option<PipelineError> = None;

        for (index, chunk) in chunks.iter().enumerate() {
            store
                .append_log(
                    job_id,
                    LogLevel::Info,
                    &format!("Analyzing part {} of {}...", index + 1, total),
                )
                .await?;

            let prompt = build_analysis_prompt(chunk);
            let outcome =
                call_with_retry(&self.policy, |_| self.backend.complete(&prompt)).await;

            match outcome {
                Ok(reply) => {
                    let result = parse_analysis_response(&reply);
                    if result.temperature_defaulted {
                        tracing::debug!(%job_id, part = index + 1, "no temperature score in reply, using default");
                    }
                    parsed.push(result.analysis);
                }
                Err(err) if err.is_retryable() => {
                    tracing::warn!(%job_id, part = index + 1, error = %err, "analysis chunk failed");
                    store
                        .append_log(
                            job_id,
                            LogLevel::Warning,
                            &format!("Analysis of part {} of {} failed: {}", index + 1, total, err),
                        )
                        .await?;
                    partial = true;
                    last_err = Some(err);
                }
                Err(err) => return Err(err),
            }
        }

        let Some(analysis) = merge_analyses(&parsed) else {
            return Err(last_err.unwrap_or_else(|| {
                PipelineError::Format("analysis produced no parseable output".into())
            }));
        };

        Ok(AnalysisReport {
            analysis,
            partial,
            source: self.source,
        })
    }
}
