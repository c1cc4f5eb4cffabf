//! Retrying speech-to-text client.
//!
//! One attempt is a multipart upload to an OpenAI-compatible endpoint,
//! bounded by a 300-second timeout. Up to three attempts are made with
//! capped exponential backoff; each retry is announced with a warning in
//! the job's audit trail. Status/progress persistence is the caller's
//! responsibility, not this component's.

use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use uuid::Uuid;

use crate::config::{
    TRANSCRIPTION_DECODING_TEMPERATURE, TRANSCRIPTION_MODEL, TRANSCRIPTION_PROMPT,
    TranscriptionTarget,
};
use crate::error::{PipelineError, Result};
use crate::http::get_http_client;
use crate::job::LogLevel;
use crate::retry::RetryPolicy;
use crate::store::JobStore;

/// Per-attempt bound on a transcription request.
pub const TRANSCRIPTION_TIMEOUT_SECS: u64 = 300;

/// Audio payload and per-request parameters for one transcription.
#[derive(Debug, Clone)]
pub struct TranscriptionRequest {
    pub audio: Vec<u8>,
    /// Original filename, preserved in the multipart upload.
    pub filename: String,
    pub mime_type: String,
    pub language: String,
}

/// Response shape of an OpenAI-compatible transcription endpoint.
/// Anything else is a format error and the attempt is retried.
#[derive(Deserialize)]
struct TranscriptionResponse {
    text: String,
}

/// A single transcription attempt against some endpoint.
#[async_trait]
pub trait TranscriptionBackend: Send + Sync {
    async fn transcribe_once(&self, request: &TranscriptionRequest) -> Result<String>;
}

/// HTTP backend for hosted or self-hosted OpenAI-compatible endpoints.
pub struct HttpTranscriptionBackend {
    target: TranscriptionTarget,
}

impl HttpTranscriptionBackend {
    pub fn new(target: TranscriptionTarget) -> Self {
        Self { target }
    }
}

#[async_trait]
impl TranscriptionBackend for HttpTranscriptionBackend {
    async fn transcribe_once(&self, request: &TranscriptionRequest) -> Result<String> {
        let client = get_http_client()?;

        let file_part = reqwest::multipart::Part::bytes(request.audio.clone())
            .file_name(request.filename.clone())
            .mime_str(&request.mime_type)
            .map_err(|e| PipelineError::Validation(format!("bad MIME type: {e}")))?;

        let form = reqwest::multipart::Form::new()
            .text("model", TRANSCRIPTION_MODEL)
            .text("response_format", "json")
            .text("language", request.language.clone())
            .text("temperature", TRANSCRIPTION_DECODING_TEMPERATURE.to_string())
            .text("prompt", TRANSCRIPTION_PROMPT)
            .part("file", file_part);

        let mut req = client
            .post(self.target.endpoint())
            .timeout(Duration::from_secs(TRANSCRIPTION_TIMEOUT_SECS))
            .multipart(form);
        if let Some(key) = self.target.bearer() {
            req = req.header("Authorization", format!("Bearer {key}"));
        }

        let response = req
            .send()
            .await
            .map_err(|e| PipelineError::from_reqwest(e, TRANSCRIPTION_TIMEOUT_SECS))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PipelineError::Remote(extract_error_message(
                status.as_u16(),
                &body,
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| PipelineError::Transport(format!("failed to read response: {e}")))?;
        let parsed: TranscriptionResponse = serde_json::from_str(&body)
            .map_err(|_| PipelineError::Format(format!("invalid response format: {body}")))?;
        Ok(parsed.text)
    }
}

/// Pull a structured error message out of a non-2xx response body.
/// Falls back to the raw body, then to the bare status code.
fn extract_error_message(status: u16, body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
        if let Some(message) = value
            .get("error")
            .and_then(|e| e.get("message"))
            .and_then(|m| m.as_str())
        {
            return message.to_string();
        }
    }
    if body.trim().is_empty() {
        format!("HTTP error, status: {status}")
    } else {
        body.trim().to_string()
    }
}

/// Drives transcription attempts under the retry policy, announcing each
/// retry in the job's audit trail.
pub struct RetryingTranscriber {
    backend: Box<dyn TranscriptionBackend>,
    policy: RetryPolicy,
}

impl RetryingTranscriber {
    pub fn new(target: TranscriptionTarget) -> Self {
        Self::with_backend(Box::new(HttpTranscriptionBackend::new(target)))
    }

    pub fn with_backend(backend: Box<dyn TranscriptionBackend>) -> Self {
        Self {
            backend,
            policy: RetryPolicy::transcription(),
        }
    }

    /// Produce a raw transcript or surface the last attempt's error
    /// verbatim. The retry-announcement log is the only side effect.
    pub async fn transcribe(
        &self,
        job_id: Uuid,
        request: &TranscriptionRequest,
        store: &dyn JobStore,
    ) -> Result<String> {
        let mut last_err: Option<PipelineError> = None;

        for attempt in 0..self.policy.max_attempts {
            if attempt > 0 {
                store
                    .append_log(
                        job_id,
                        LogLevel::Warning,
                        &format!(
                            "Retrying transcription (attempt {} of {})",
                            attempt + 1,
                            self.policy.max_attempts
                        ),
                    )
                    .await?;
                tokio::time::sleep(self.policy.delay_for(attempt)).await;
            }

            match self.backend.transcribe_once(request).await {
                Ok(text) => return Ok(text),
                Err(err) if err.is_retryable() => {
                    tracing::warn!(%job_id, attempt, error = %err, "transcription attempt failed");
                    last_err = Some(err);
                }
                Err(err) => return Err(err),
            }
        }

        Err(last_err
            .unwrap_or_else(|| PipelineError::Transport("no transcription attempts made".into())))
    }
}
