//! Job, analysis and audit-log records.
//!
//! A `Job` tracks one audio item through its whole lifecycle. The pipeline
//! owns the record while it is `pending` or `processing`; once it reaches a
//! terminal status the record belongs to the presentation/storage layer and
//! the pipeline only ever overwrites it again to attach a fresh analysis.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Lifecycle states of a job: `pending → processing → {completed, failed}`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    #[default]
    Pending,
    Processing,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Processing => "processing",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }

    /// `completed` and `failed` are terminal for a given job; a failed job
    /// is resubmitted as a new pending job, never restarted in place.
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }

    /// Legal transitions of the state machine.
    pub fn can_transition_to(&self, next: JobStatus) -> bool {
        match self {
            JobStatus::Pending => next == JobStatus::Processing || next == JobStatus::Failed,
            JobStatus::Processing => next.is_terminal(),
            JobStatus::Completed | JobStatus::Failed => false,
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which endpoint produced an attached analysis.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisSource {
    Remote,
    Local,
}

/// Structured extraction derived from a transcript.
///
/// `temperature` is the domain's 1–10 conversational-warmth score, not a
/// decoding temperature.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct Analysis {
    pub problems: Vec<String>,
    pub solutions: Vec<String>,
    pub temperature: u8,
    pub summary: String,
}

/// Severity of an audit-trail entry.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Info,
    Warning,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Info => "info",
            LogLevel::Warning => "warning",
            LogLevel::Error => "error",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Append-only audit record emitted at every significant transition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub job_id: Uuid,
    pub level: LogLevel,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

/// One audio item's transcription/analysis lifecycle record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: Uuid,
    pub name: String,
    pub size_bytes: u64,
    pub status: JobStatus,
    /// 0..=100, monotonically non-decreasing while `processing`.
    pub progress: u8,
    pub language: String,
    pub transcript: Option<String>,
    pub analysis: Option<Analysis>,
    pub analysis_source: Option<AnalysisSource>,
    pub error: Option<String>,
    pub processing_time_seconds: Option<f64>,
    pub created_at: DateTime<Utc>,
}

impl Job {
    /// Create a fresh pending job for an audio item.
    pub fn new(name: impl Into<String>, size_bytes: u64, language: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            size_bytes,
            status: JobStatus::Pending,
            progress: 0,
            language: language.into(),
            transcript: None,
            analysis: None,
            analysis_source: None,
            error: None,
            processing_time_seconds: None,
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_job_is_pending_with_zero_progress() {
        let job = Job::new("call-001.mp3", 2048, "uk");
        assert_eq!(job.status, JobStatus::Pending);
        assert_eq!(job.progress, 0);
        assert!(job.transcript.is_none());
        assert!(job.error.is_none());
    }

    #[test]
    fn terminal_states_admit_no_transitions() {
        assert!(!JobStatus::Completed.can_transition_to(JobStatus::Processing));
        assert!(!JobStatus::Failed.can_transition_to(JobStatus::Pending));
        assert!(JobStatus::Pending.can_transition_to(JobStatus::Processing));
        assert!(JobStatus::Processing.can_transition_to(JobStatus::Completed));
        assert!(JobStatus::Processing.can_transition_to(JobStatus::Failed));
    }

    #[test]
    fn status_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&JobStatus::Processing).unwrap(),
            "\"processing\""
        );
        assert_eq!(JobStatus::Failed.to_string(), "failed");
    }
}
