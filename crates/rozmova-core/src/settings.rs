//! Persistent settings: TOML file with environment-variable fallback.
//!
//! The settings file lives at `~/.config/rozmova/settings.toml`. Missing
//! values fall back to environment variables (`OPENAI_API_KEY`,
//! `ROZMOVA_SERVER_URL`, `OLLAMA_URL`) so the CLI works without a file.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::config::{
    AnalysisConfig, AnalysisTarget, DEFAULT_ANALYSIS_MODEL, DEFAULT_LANGUAGE,
    DEFAULT_LOCAL_ANALYSIS_MODEL, PipelineConfig, TranscriptionTarget,
};
use crate::error::{PipelineError, Result};

/// Environment variable holding the hosted API key.
pub const API_KEY_ENV_VAR: &str = "OPENAI_API_KEY";

/// Environment variable holding a self-hosted transcription endpoint URL.
pub const SERVER_URL_ENV_VAR: &str = "ROZMOVA_SERVER_URL";

/// Environment variable holding a self-hosted generation endpoint URL.
pub const LOCAL_MODEL_URL_ENV_VAR: &str = "OLLAMA_URL";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AnalysisSettings {
    #[serde(default)]
    pub enabled: bool,
    /// Use the self-hosted generation endpoint instead of the hosted model.
    #[serde(default)]
    pub use_local: bool,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub local_url: Option<String>,
    #[serde(default)]
    pub local_model: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Settings {
    /// Hosted transcription API key.
    #[serde(default)]
    pub api_key: Option<String>,
    /// Self-hosted transcription endpoint; takes precedence when set.
    #[serde(default)]
    pub server_url: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub analysis: AnalysisSettings,
}

impl Settings {
    /// Load from the default location, falling back to defaults when the
    /// file is missing or unreadable.
    pub fn load() -> Self {
        Self::path()
            .and_then(|p| Self::load_from(&p).ok())
            .unwrap_or_default()
    }

    /// Load from an explicit path.
    pub fn load_from(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| PipelineError::Configuration(format!("cannot read settings: {e}")))?;
        toml::from_str(&raw)
            .map_err(|e| PipelineError::Configuration(format!("invalid settings file: {e}")))
    }

    /// Default settings file location.
    pub fn path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("rozmova").join("settings.toml"))
    }

    /// Resolve the transcription target, preferring a self-hosted URL.
    pub fn transcription_target(&self) -> Result<TranscriptionTarget> {
        if let Some(url) = self
            .server_url
            .clone()
            .or_else(|| std::env::var(SERVER_URL_ENV_VAR).ok())
        {
            return Ok(TranscriptionTarget::SelfHosted { url });
        }
        let api_key = self
            .api_key
            .clone()
            .or_else(|| std::env::var(API_KEY_ENV_VAR).ok())
            .ok_or_else(|| {
                PipelineError::Configuration(
                    "no API key or local server configured; set api_key in settings.toml \
                     or the OPENAI_API_KEY environment variable"
                        .into(),
                )
            })?;
        Ok(TranscriptionTarget::Hosted { api_key })
    }

    /// Resolve the analysis configuration. Enabled analysis without a
    /// usable endpoint is reported when the runner is built, not here.
    pub fn analysis_config(&self) -> AnalysisConfig {
        if !self.analysis.enabled {
            return AnalysisConfig::default();
        }
        let target = if self.analysis.use_local {
            self.analysis
                .local_url
                .clone()
                .or_else(|| std::env::var(LOCAL_MODEL_URL_ENV_VAR).ok())
                .map(|url| AnalysisTarget::Local {
                    url,
                    model: self
                        .analysis
                        .local_model
                        .clone()
                        .unwrap_or_else(|| DEFAULT_LOCAL_ANALYSIS_MODEL.to_string()),
                })
        } else {
            self.analysis
                .api_key
                .clone()
                .or_else(|| self.api_key.clone())
                .or_else(|| std::env::var(API_KEY_ENV_VAR).ok())
                .map(|api_key| AnalysisTarget::Hosted {
                    api_key,
                    model: self
                        .analysis
                        .model
                        .clone()
                        .unwrap_or_else(|| DEFAULT_ANALYSIS_MODEL.to_string()),
                })
        };
        AnalysisConfig {
            enabled: true,
            target,
        }
    }

    /// Build the full pipeline configuration.
    pub fn pipeline_config(&self) -> Result<PipelineConfig> {
        Ok(PipelineConfig {
            transcription: self.transcription_target()?,
            language: self
                .language
                .clone()
                .unwrap_or_else(|| DEFAULT_LANGUAGE.to_string()),
            analysis: self.analysis_config(),
        })
    }
}
