//! Pipeline configuration: endpoints, models and fixed request parameters.

use serde::{Deserialize, Serialize};

/// Hosted speech-to-text endpoint (OpenAI-compatible).
pub const HOSTED_TRANSCRIPTION_URL: &str = "https://api.openai.com/v1/audio/transcriptions";

/// Hosted chat-completion endpoint used for analysis.
pub const HOSTED_CHAT_URL: &str = "https://api.openai.com/v1/chat/completions";

/// Model identifier sent to the hosted transcription endpoint.
pub const TRANSCRIPTION_MODEL: &str = "whisper-1";

/// Default hosted analysis model.
pub const DEFAULT_ANALYSIS_MODEL: &str = "gpt-4o-mini";

/// Default model name for a self-hosted generation endpoint.
pub const DEFAULT_LOCAL_ANALYSIS_MODEL: &str = "mistral";

/// Target language for transcription and normalization.
pub const DEFAULT_LANGUAGE: &str = "uk";

/// Low decoding temperature for transcription requests.
pub const TRANSCRIPTION_DECODING_TEMPERATURE: f32 = 0.2;

/// Low decoding temperature for analysis requests, for consistent output.
pub const ANALYSIS_DECODING_TEMPERATURE: f32 = 0.3;

/// Domain hint passed with every transcription request.
pub const TRANSCRIPTION_PROMPT: &str =
    "Це розмова українською мовою, можливо з домішками російських слів.";

/// Where transcription requests go.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase", tag = "kind")]
pub enum TranscriptionTarget {
    /// Hosted endpoint authenticated with a bearer API key.
    Hosted { api_key: String },
    /// Self-hosted OpenAI-compatible endpoint; no authentication.
    SelfHosted { url: String },
}

impl TranscriptionTarget {
    /// Full endpoint URL for this target.
    pub fn endpoint(&self) -> String {
        match self {
            TranscriptionTarget::Hosted { .. } => HOSTED_TRANSCRIPTION_URL.to_string(),
            TranscriptionTarget::SelfHosted { url } => url.trim_end_matches('/').to_string(),
        }
    }

    /// Bearer token, when the target needs one.
    pub fn bearer(&self) -> Option<&str> {
        match self {
            TranscriptionTarget::Hosted { api_key } => Some(api_key),
            TranscriptionTarget::SelfHosted { .. } => None,
        }
    }
}

/// Where analysis requests go.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase", tag = "kind")]
pub enum AnalysisTarget {
    /// Hosted chat-completion model.
    Hosted { api_key: String, model: String },
    /// Self-hosted generation endpoint (e.g. an Ollama server URL).
    Local { url: String, model: String },
}

/// Analysis switch plus its endpoint, when one is configured.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct AnalysisConfig {
    pub enabled: bool,
    pub target: Option<AnalysisTarget>,
}

/// Everything one processing run needs to know.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    pub transcription: TranscriptionTarget,
    pub language: String,
    pub analysis: AnalysisConfig,
}

impl PipelineConfig {
    pub fn new(transcription: TranscriptionTarget) -> Self {
        Self {
            transcription,
            language: DEFAULT_LANGUAGE.to_string(),
            analysis: AnalysisConfig::default(),
        }
    }

    pub fn with_analysis(mut self, target: AnalysisTarget) -> Self {
        self.analysis = AnalysisConfig {
            enabled: true,
            target: Some(target),
        };
        self
    }
}
