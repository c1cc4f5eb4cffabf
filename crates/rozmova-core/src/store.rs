//! Persistence collaborator for job status, transcripts and audit logs.
//!
//! The actual row store lives outside this crate (the dashboard's realtime
//! database); the pipeline only needs the narrow [`JobStore`] surface. The
//! store is assumed to be eventually consistent and occasionally
//! transiently unavailable, so every call goes through [`RetryingStore`]
//! (3 attempts, fixed 1-second delay). [`MemoryStore`] is a complete
//! in-process implementation used by the CLI and by tests.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Mutex;
use uuid::Uuid;

use crate::error::Result;
use crate::job::{Analysis, AnalysisSource, JobStatus, LogEntry, LogLevel};
use crate::retry::{RetryPolicy, call_with_retry};

/// Narrow persistence surface the pipeline writes through.
///
/// The pipeline is the sole writer of a job's `processing`-state fields
/// while it owns the job, so no read-back or conflict handling is needed.
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Overwrite status/progress/error of a job.
    async fn update_status(
        &self,
        job_id: Uuid,
        status: JobStatus,
        progress: Option<u8>,
        error: Option<String>,
    ) -> Result<()>;

    /// Mark a job completed with its final transcript. Sets progress to
    /// 100 and clears any previous error in the same write.
    async fn save_transcript(
        &self,
        job_id: Uuid,
        transcript: &str,
        language: &str,
        processing_time_seconds: f64,
    ) -> Result<()>;

    /// Attach (or replace) an analysis on a completed job.
    async fn save_analysis(
        &self,
        job_id: Uuid,
        analysis: &Analysis,
        source: AnalysisSource,
        partial: bool,
    ) -> Result<()>;

    /// Append one audit-trail entry. Entries are never mutated or deleted.
    async fn append_log(&self, job_id: Uuid, level: LogLevel, message: &str) -> Result<()>;
}

/// Wrapper that applies the fixed-delay store retry policy to every call.
pub struct RetryingStore<S> {
    inner: S,
    policy: RetryPolicy,
}

impl<S: JobStore> RetryingStore<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            policy: RetryPolicy::store(),
        }
    }

    pub fn with_policy(inner: S, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }

    /// Access the wrapped store, e.g. to read back test state.
    pub fn inner(&self) -> &S {
        &self.inner
    }
}

#[async_trait]
impl<S: JobStore> JobStore for RetryingStore<S> {
    async fn update_status(
        &self,
        job_id: Uuid,
        status: JobStatus,
        progress: Option<u8>,
        error: Option<String>,
    ) -> Result<()> {
        call_with_retry(&self.policy, |_| {
            let error = error.clone();
            async move { self.inner.update_status(job_id, status, progress, error).await }
        })
        .await
    }

    async fn save_transcript(
        &self,
        job_id: Uuid,
        transcript: &str,
        language: &str,
        processing_time_seconds: f64,
    ) -> Result<()> {
        call_with_retry(&self.policy, |_| async move {
            self.inner
                .save_transcript(job_id, transcript, language, processing_time_seconds)
                .await
        })
        .await
    }

    async fn save_analysis(
        &self,
        job_id: Uuid,
        analysis: &Analysis,
        source: AnalysisSource,
        partial: bool,
    ) -> Result<()> {
        call_with_retry(&self.policy, |_| async move {
            self.inner.save_analysis(job_id, analysis, source, partial).await
        })
        .await
    }

    async fn append_log(&self, job_id: Uuid, level: LogLevel, message: &str) -> Result<()> {
        call_with_retry(&self.policy, |_| async move {
            self.inner.append_log(job_id, level, message).await
        })
        .await
    }
}

/// One persisted status write, kept in order for inspection.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusUpdate {
    pub job_id: Uuid,
    pub status: JobStatus,
    pub progress: Option<u8>,
    pub error: Option<String>,
}

/// Materialized row for a single job.
#[derive(Debug, Clone, Default)]
pub struct JobRow {
    pub status: JobStatus,
    pub progress: u8,
    pub error: Option<String>,
    pub transcript: Option<String>,
    pub language: Option<String>,
    pub processing_time_seconds: Option<f64>,
    pub analysis: Option<Analysis>,
    pub analysis_source: Option<AnalysisSource>,
    pub analysis_partial: bool,
}

#[derive(Default)]
struct MemoryStoreInner {
    rows: HashMap<Uuid, JobRow>,
    updates: Vec<StatusUpdate>,
    logs: Vec<LogEntry>,
}

/// In-memory [`JobStore`] keeping the full write history.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<MemoryStoreInner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current row for a job, if any write has touched it.
    pub fn row(&self, job_id: Uuid) -> Option<JobRow> {
        self.inner.lock().unwrap().rows.get(&job_id).cloned()
    }

    /// All status writes, in the order they were persisted.
    pub fn updates(&self) -> Vec<StatusUpdate> {
        self.inner.lock().unwrap().updates.clone()
    }

    /// The audit trail, in append order.
    pub fn logs(&self) -> Vec<LogEntry> {
        self.inner.lock().unwrap().logs.clone()
    }

    /// Audit entries of one severity.
    pub fn logs_at(&self, level: LogLevel) -> Vec<LogEntry> {
        self.logs().into_iter().filter(|l| l.level == level).collect()
    }
}

#[async_trait]
impl JobStore for MemoryStore {
    async fn update_status(
        &self,
        job_id: Uuid,
        status: JobStatus,
        progress: Option<u8>,
        error: Option<String>,
    ) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        let row = inner.rows.entry(job_id).or_default();
        row.status = status;
        if let Some(p) = progress {
            row.progress = p;
        }
        row.error = error.clone();
        inner.updates.push(StatusUpdate {
            job_id,
            status,
            progress,
            error,
        });
        Ok(())
    }

    async fn save_transcript(
        &self,
        job_id: Uuid,
        transcript: &str,
        language: &str,
        processing_time_seconds: f64,
    ) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        let row = inner.rows.entry(job_id).or_default();
        row.status = JobStatus::Completed;
        row.progress = 100;
        row.error = None;
        row.transcript = Some(transcript.to_string());
        row.language = Some(language.to_string());
        row.processing_time_seconds = Some(processing_time_seconds);
        inner.updates.push(StatusUpdate {
            job_id,
            status: JobStatus::Completed,
            progress: Some(100),
            error: None,
        });
        Ok(())
    }

    async fn save_analysis(
        &self,
        job_id: Uuid,
        analysis: &Analysis,
        source: AnalysisSource,
        partial: bool,
    ) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        let row = inner.rows.entry(job_id).or_default();
        row.analysis = Some(analysis.clone());
        row.analysis_source = Some(source);
        row.analysis_partial = partial;
        Ok(())
    }

    async fn append_log(&self, job_id: Uuid, level: LogLevel, message: &str) -> Result<()> {
        self.inner.lock().unwrap().logs.push(LogEntry {
            job_id,
            level,
            message: message.to_string(),
            created_at: Utc::now(),
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PipelineError;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Store that fails a fixed number of times before succeeding.
    struct FlakyStore {
        failures_remaining: AtomicU32,
        delegate: MemoryStore,
    }

    impl FlakyStore {
        fn new(failures: u32) -> Self {
            Self {
                failures_remaining: AtomicU32::new(failures),
                delegate: MemoryStore::new(),
            }
        }

        fn trip(&self) -> Result<()> {
            let remaining = self.failures_remaining.load(Ordering::SeqCst);
            if remaining > 0 {
                self.failures_remaining.store(remaining - 1, Ordering::SeqCst);
                return Err(PipelineError::Transport("store unavailable".into()));
            }
            Ok(())
        }
    }

    #[async_trait]
    impl JobStore for FlakyStore {
        async fn update_status(
            &self,
            job_id: Uuid,
            status: JobStatus,
            progress: Option<u8>,
            error: Option<String>,
        ) -> Result<()> {
            self.trip()?;
            self.delegate.update_status(job_id, status, progress, error).await
        }

        async fn save_transcript(
            &self,
            job_id: Uuid,
            transcript: &str,
            language: &str,
            processing_time_seconds: f64,
        ) -> Result<()> {
            self.trip()?;
            self.delegate
                .save_transcript(job_id, transcript, language, processing_time_seconds)
                .await
        }

        async fn save_analysis(
            &self,
            job_id: Uuid,
            analysis: &Analysis,
            source: AnalysisSource,
            partial: bool,
        ) -> Result<()> {
            self.trip()?;
            self.delegate.save_analysis(job_id, analysis, source, partial).await
        }

        async fn append_log(&self, job_id: Uuid, level: LogLevel, message: &str) -> Result<()> {
            self.trip()?;
            self.delegate.append_log(job_id, level, message).await
        }
    }

    #[tokio::test]
    async fn memory_store_records_update_history() {
        let store = MemoryStore::new();
        let id = Uuid::new_v4();
        store
            .update_status(id, JobStatus::Processing, Some(0), None)
            .await
            .unwrap();
        store
            .update_status(id, JobStatus::Processing, Some(25), None)
            .await
            .unwrap();
        store.save_transcript(id, "привіт.", "uk", 1.5).await.unwrap();

        let updates = store.updates();
        assert_eq!(updates.len(), 3);
        assert_eq!(updates[0].progress, Some(0));
        assert_eq!(updates[1].progress, Some(25));
        assert_eq!(updates[2].status, JobStatus::Completed);

        let row = store.row(id).unwrap();
        assert_eq!(row.transcript.as_deref(), Some("привіт."));
        assert_eq!(row.progress, 100);
        assert!(row.error.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn retrying_store_rides_out_transient_failures() {
        let store = RetryingStore::new(FlakyStore::new(2));
        let id = Uuid::new_v4();
        store
            .append_log(id, LogLevel::Info, "Starting transcription")
            .await
            .unwrap();
        assert_eq!(store.inner().delegate.logs().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn retrying_store_gives_up_after_three_attempts() {
        let store = RetryingStore::new(FlakyStore::new(3));
        let id = Uuid::new_v4();
        let err = store
            .append_log(id, LogLevel::Info, "never lands")
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::Transport(_)));
        assert!(store.inner().delegate.logs().is_empty());
    }
}
