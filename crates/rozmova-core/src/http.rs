//! Shared HTTP client.
//!
//! One lazily built client is reused across all outbound calls so
//! connection pooling works. Per-request timeouts are set at the call
//! sites since transcription and analysis carry different bounds.

use std::sync::OnceLock;

use crate::error::{PipelineError, Result};

static HTTP_CLIENT: OnceLock<reqwest::Client> = OnceLock::new();

/// Get the process-wide reqwest client, building it on first use.
pub fn get_http_client() -> Result<&'static reqwest::Client> {
    if let Some(client) = HTTP_CLIENT.get() {
        return Ok(client);
    }
    let client = reqwest::Client::builder()
        .build()
        .map_err(|e| PipelineError::Transport(format!("failed to build HTTP client: {e}")))?;
    Ok(HTTP_CLIENT.get_or_init(|| client))
}
