//! Job orchestration: the state machine driving one audio item from
//! `pending` to `completed` or `failed`.
//!
//! Progress checkpoints (0, 25, 75, 100) and every significant transition
//! are persisted immediately through the retrying store, so a dashboard
//! watching the rows sees the same stages the original operators did.
//! Analysis runs after the transcript is already persisted; its failure is
//! recorded in the audit trail but never reverts a completed job.

use std::time::Instant;

use crate::analysis::AnalysisRunner;
use crate::config::PipelineConfig;
use crate::error::{PipelineError, Result};
use crate::job::{Job, JobStatus, LogLevel};
use crate::store::{JobStore, RetryingStore};
use crate::text::{cleanup_transcript, normalize_transcript};
use crate::transcription::{RetryingTranscriber, TranscriptionRequest};

/// Raw audio bytes plus the metadata the upload needs.
#[derive(Debug, Clone)]
pub struct AudioSource {
    pub data: Vec<u8>,
    pub filename: String,
    pub mime_type: String,
}

/// One configured processing pipeline. Holds no per-job state, so a single
/// instance can process any number of jobs sequentially.
pub struct Pipeline<S: JobStore> {
    store: RetryingStore<S>,
    transcriber: RetryingTranscriber,
    analysis: Option<AnalysisRunner>,
    language: String,
}

impl<S: JobStore> Pipeline<S> {
    pub fn new(config: PipelineConfig, store: S) -> Result<Self> {
        let analysis = AnalysisRunner::from_config(&config.analysis)?;
        Ok(Self {
            store: RetryingStore::new(store),
            transcriber: RetryingTranscriber::new(config.transcription),
            analysis,
            language: config.language,
        })
    }

    #[cfg(test)]
    fn with_components(
        store: S,
        transcriber: RetryingTranscriber,
        analysis: Option<AnalysisRunner>,
        language: &str,
    ) -> Self {
        Self {
            store: RetryingStore::new(store),
            transcriber,
            analysis,
            language: language.to_string(),
        }
    }

    /// The wrapped store, e.g. to read back results after a run.
    pub fn store(&self) -> &S {
        self.store.inner()
    }

    /// Drive one job through transcription and (optionally) analysis.
    ///
    /// On success the job is `completed` with its final transcript; an
    /// analysis failure is logged but leaves the job completed. On an
    /// unrecoverable transcription error the job is `failed` with progress
    /// reset to 0, exactly one error-level audit entry, and the error is
    /// returned to the caller.
    pub async fn process_job(&self, job: &mut Job, audio: AudioSource) -> Result<()> {
        if job.status != JobStatus::Pending {
            return Err(PipelineError::Validation(format!(
                "job {} is {}, only pending jobs can be processed",
                job.id, job.status
            )));
        }

        let transcript = match self.transcribe_stage(job, audio).await {
            Ok(text) => text,
            Err(err) => {
                let message = err.to_string();
                self.mark_failed(job, &message).await;
                return Err(err);
            }
        };

        if self.analysis.is_some() {
            self.analysis_stage(job, &transcript).await;
        }

        Ok(())
    }

    async fn transcribe_stage(&self, job: &mut Job, audio: AudioSource) -> Result<String> {
        if audio.data.is_empty() {
            return Err(PipelineError::Validation("missing file data".into()));
        }
        if !audio.mime_type.starts_with("audio/") {
            return Err(PipelineError::Validation(format!(
                "invalid file type: {}",
                audio.mime_type
            )));
        }

        let started = Instant::now();

        self.advance(job, 0).await?;
        self.store
            .append_log(
                job.id,
                LogLevel::Info,
                &format!("Starting transcription for {}", job.name),
            )
            .await?;

        self.advance(job, 25).await?;
        self.store
            .append_log(
                job.id,
                LogLevel::Info,
                &format!("Uploading file {} to transcription service...", job.name),
            )
            .await?;

        let request = TranscriptionRequest {
            audio: audio.data,
            filename: audio.filename,
            mime_type: audio.mime_type,
            language: self.language.clone(),
        };
        let raw = self
            .transcriber
            .transcribe(job.id, &request, &self.store)
            .await?;

        self.advance(job, 75).await?;

        let transcript = normalize_transcript(&cleanup_transcript(&raw));
        let processing_time = started.elapsed().as_secs_f64();

        self.store
            .save_transcript(job.id, &transcript, &self.language, processing_time)
            .await?;
        self.store
            .append_log(job.id, LogLevel::Info, "Transcription completed successfully")
            .await?;

        job.status = JobStatus::Completed;
        job.progress = 100;
        job.transcript = Some(transcript.clone());
        job.error = None;
        job.processing_time_seconds = Some(processing_time);

        Ok(transcript)
    }

    /// Run analysis over a finished transcript. Failures are demoted to an
    /// error-level audit entry; the job stays completed either way.
    async fn analysis_stage(&self, job: &mut Job, transcript: &str) {
        if let Err(err) = self.run_analysis_inner(job, transcript).await {
            tracing::error!(job_id = %job.id, error = %err, "analysis failed");
            if let Err(log_err) = self
                .store
                .append_log(job.id, LogLevel::Error, &format!("Analysis failed: {err}"))
                .await
            {
                tracing::error!(job_id = %job.id, error = %log_err, "failed to record analysis failure");
            }
        }
    }

    /// Re-analyze an already-completed job, replacing any prior analysis.
    /// Unlike the automatic pass after transcription, errors are returned
    /// to the caller.
    pub async fn run_analysis(&self, job: &mut Job) -> Result<()> {
        if self.analysis.is_none() {
            return Err(PipelineError::Configuration(
                "analysis is not configured".into(),
            ));
        }
        let transcript = job.transcript.clone().ok_or_else(|| {
            PipelineError::Validation(format!("job {} has no transcript to analyze", job.id))
        })?;
        self.run_analysis_inner(job, &transcript).await
    }

    async fn run_analysis_inner(&self, job: &mut Job, transcript: &str) -> Result<()> {
        let Some(runner) = &self.analysis else {
            return Ok(());
        };

        self.store
            .append_log(job.id, LogLevel::Info, "Starting automatic analysis...")
            .await?;

        let report = runner.run(job.id, transcript, &self.store).await?;
        self.store
            .save_analysis(job.id, &report.analysis, report.source, report.partial)
            .await?;
        self.store
            .append_log(job.id, LogLevel::Info, "Analysis completed successfully")
            .await?;

        job.analysis = Some(report.analysis);
        job.analysis_source = Some(report.source);
        Ok(())
    }

    async fn advance(&self, job: &mut Job, progress: u8) -> Result<()> {
        self.store
            .update_status(job.id, JobStatus::Processing, Some(progress), None)
            .await?;
        job.status = JobStatus::Processing;
        job.progress = progress;
        Ok(())
    }

    /// Terminal failure write: status, reset progress, human-readable cause,
    /// one error-level audit entry. Store failures here are logged and
    /// swallowed so the original error still reaches the caller.
    async fn mark_failed(&self, job: &mut Job, message: &str) {
        job.status = JobStatus::Failed;
        job.progress = 0;
        job.error = Some(message.to_string());

        if let Err(err) = self
            .store
            .update_status(job.id, JobStatus::Failed, Some(0), Some(message.to_string()))
            .await
        {
            tracing::error!(job_id = %job.id, error = %err, "failed to persist failed status");
        }
        if let Err(err) = self.store.append_log(job.id, LogLevel::Error, message).await {
            tracing::error!(job_id = %job.id, error = %err, "failed to persist failure log");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::AnalysisBackend;
    use crate::job::AnalysisSource;
    use crate::store::MemoryStore;
    use crate::transcription::TranscriptionBackend;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    struct ScriptedTranscription {
        outcomes: Mutex<VecDeque<Result<String>>>,
    }

    impl ScriptedTranscription {
        fn new(outcomes: Vec<Result<String>>) -> Self {
            Self {
                outcomes: Mutex::new(outcomes.into()),
            }
        }
    }

    #[async_trait]
    impl TranscriptionBackend for ScriptedTranscription {
        async fn transcribe_once(&self, _request: &TranscriptionRequest) -> Result<String> {
            self.outcomes
                .lock()
                .unwrap()
                .pop_front()
                .expect("scripted transcription exhausted")
        }
    }

    struct ScriptedAnalysis {
        replies: Mutex<VecDeque<Result<String>>>,
    }

    impl ScriptedAnalysis {
        fn new(replies: Vec<Result<String>>) -> Self {
            Self {
                replies: Mutex::new(replies.into()),
            }
        }
    }

    #[async_trait]
    impl AnalysisBackend for ScriptedAnalysis {
        async fn complete(&self, _prompt: &str) -> Result<String> {
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .expect("scripted analysis exhausted")
        }
    }

    fn audio() -> AudioSource {
        AudioSource {
            data: vec![0u8; 64],
            filename: "call-001.mp3".into(),
            mime_type: "audio/mpeg".into(),
        }
    }

    fn pipeline(
        transcription: Vec<Result<String>>,
        analysis: Option<Vec<Result<String>>>,
    ) -> Pipeline<MemoryStore> {
        let transcriber = RetryingTranscriber::with_backend(Box::new(ScriptedTranscription::new(
            transcription,
        )));
        let runner = analysis.map(|replies| {
            AnalysisRunner::with_backend(
                Box::new(ScriptedAnalysis::new(replies)),
                AnalysisSource::Remote,
            )
        });
        Pipeline::with_components(MemoryStore::new(), transcriber, runner, "uk")
    }

    fn analysis_reply() -> String {
        "ПРОБЛЕМИ:\n1. Не прийшов рахунок\n\nРІШЕННЯ:\n1. Надіслати повторно\n\n\
         ТЕМПЕРАТУРА РОЗМОВИ: 7/10\nДоброзичлива розмова.\n\n\
         КОРОТКИЙ ЗМІСТ:\nКлієнт запитав про рахунок."
            .to_string()
    }

    #[tokio::test]
    async fn successful_run_walks_the_progress_checkpoints() {
        let pipeline = pipeline(
            vec![Ok("Да, добрий день. Да, добрий день. Як справи?".into())],
            None,
        );
        let mut job = Job::new("call-001.mp3", 64, "uk");

        pipeline.process_job(&mut job, audio()).await.unwrap();

        let updates = pipeline.store().updates();
        let stages: Vec<(JobStatus, Option<u8>)> =
            updates.iter().map(|u| (u.status, u.progress)).collect();
        assert_eq!(
            stages,
            vec![
                (JobStatus::Processing, Some(0)),
                (JobStatus::Processing, Some(25)),
                (JobStatus::Processing, Some(75)),
                (JobStatus::Completed, Some(100)),
            ]
        );

        // duplicate sentence dropped, russian filler normalized
        let row = pipeline.store().row(job.id).unwrap();
        assert_eq!(
            row.transcript.as_deref(),
            Some("Так, добрий день. Як справи?")
        );
        assert_eq!(row.language.as_deref(), Some("uk"));
        assert!(row.processing_time_seconds.is_some());

        assert_eq!(job.status, JobStatus::Completed);
        assert_eq!(job.progress, 100);
        assert!(job.error.is_none());

        let messages: Vec<String> = pipeline
            .store()
            .logs()
            .into_iter()
            .map(|l| l.message)
            .collect();
        assert_eq!(
            messages,
            vec![
                "Starting transcription for call-001.mp3",
                "Uploading file call-001.mp3 to transcription service...",
                "Transcription completed successfully",
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn exhausted_transcription_marks_job_failed() {
        let pipeline = pipeline(
            vec![
                Err(PipelineError::Remote("HTTP 500".into())),
                Err(PipelineError::Remote("HTTP 502".into())),
                Err(PipelineError::Timeout(300)),
            ],
            None,
        );
        let mut job = Job::new("call-002.mp3", 64, "uk");

        let err = pipeline.process_job(&mut job, audio()).await.unwrap_err();
        assert!(matches!(err, PipelineError::Timeout(_)));

        assert_eq!(job.status, JobStatus::Failed);
        assert_eq!(job.progress, 0);
        assert_eq!(job.error.as_deref(), Some(err.to_string().as_str()));

        let last = pipeline.store().updates().last().cloned().unwrap();
        assert_eq!(last.status, JobStatus::Failed);
        assert_eq!(last.progress, Some(0));
        assert!(last.error.is_some());

        assert_eq!(pipeline.store().logs_at(LogLevel::Warning).len(), 2);
        let errors = pipeline.store().logs_at(LogLevel::Error);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].message, err.to_string());
    }

    #[tokio::test]
    async fn non_audio_upload_fails_before_any_attempt() {
        let pipeline = pipeline(vec![], None);
        let mut job = Job::new("notes.pdf", 64, "uk");
        let source = AudioSource {
            data: vec![0u8; 8],
            filename: "notes.pdf".into(),
            mime_type: "application/pdf".into(),
        };

        let err = pipeline.process_job(&mut job, source).await.unwrap_err();
        assert!(matches!(err, PipelineError::Validation(_)));
        assert_eq!(job.status, JobStatus::Failed);

        // only the terminal failure write, no progress checkpoints
        let updates = pipeline.store().updates();
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].status, JobStatus::Failed);
    }

    #[tokio::test]
    async fn non_pending_job_is_rejected_without_writes() {
        let pipeline = pipeline(vec![], None);
        let mut job = Job::new("call-003.mp3", 64, "uk");
        job.status = JobStatus::Completed;

        let err = pipeline.process_job(&mut job, audio()).await.unwrap_err();
        assert!(matches!(err, PipelineError::Validation(_)));
        assert!(pipeline.store().updates().is_empty());
        assert!(pipeline.store().logs().is_empty());
    }

    #[tokio::test]
    async fn analysis_result_is_attached_after_completion() {
        let pipeline = pipeline(
            vec![Ok("Добрий день. Рахунок не прийшов.".into())],
            Some(vec![Ok(analysis_reply())]),
        );
        let mut job = Job::new("call-004.mp3", 64, "uk");

        pipeline.process_job(&mut job, audio()).await.unwrap();

        let row = pipeline.store().row(job.id).unwrap();
        assert_eq!(row.status, JobStatus::Completed);
        let analysis = row.analysis.unwrap();
        assert_eq!(analysis.temperature, 7);
        assert_eq!(analysis.problems, vec!["Не прийшов рахунок"]);
        assert_eq!(row.analysis_source, Some(AnalysisSource::Remote));
        assert!(!row.analysis_partial);

        assert_eq!(job.analysis.as_ref().unwrap().temperature, 7);
        assert_eq!(job.analysis_source, Some(AnalysisSource::Remote));

        let messages: Vec<String> = pipeline
            .store()
            .logs()
            .iter()
            .map(|l| l.message.clone())
            .collect();
        assert!(messages.contains(&"Starting automatic analysis...".to_string()));
        assert!(messages.contains(&"Analyzing part 1 of 1...".to_string()));
        assert!(messages.contains(&"Analysis completed successfully".to_string()));
    }

    #[tokio::test(start_paused = true)]
    async fn analysis_failure_leaves_job_completed() {
        let pipeline = pipeline(
            vec![Ok("Добрий день. Рахунок не прийшов.".into())],
            Some(vec![
                Err(PipelineError::Remote("HTTP 500".into())),
                Err(PipelineError::Remote("HTTP 500".into())),
                Err(PipelineError::Remote("HTTP 500".into())),
            ]),
        );
        let mut job = Job::new("call-005.mp3", 64, "uk");

        // process_job itself succeeds
        pipeline.process_job(&mut job, audio()).await.unwrap();

        assert_eq!(job.status, JobStatus::Completed);
        let row = pipeline.store().row(job.id).unwrap();
        assert_eq!(row.status, JobStatus::Completed);
        assert!(row.analysis.is_none());
        assert!(job.analysis.is_none());

        let errors = pipeline.store().logs_at(LogLevel::Error);
        assert_eq!(errors.len(), 1);
        assert!(errors[0].message.starts_with("Analysis failed:"));
    }

    #[tokio::test]
    async fn run_analysis_reanalyzes_a_completed_job() {
        let pipeline = pipeline(vec![], Some(vec![Ok(analysis_reply())]));
        let mut job = Job::new("call-006.mp3", 64, "uk");
        job.status = JobStatus::Completed;
        job.transcript = Some("Добрий день. Рахунок не прийшов.".into());

        pipeline.run_analysis(&mut job).await.unwrap();
        assert_eq!(job.analysis.as_ref().unwrap().temperature, 7);

        let row = pipeline.store().row(job.id).unwrap();
        assert!(row.analysis.is_some());
    }

    #[tokio::test]
    async fn run_analysis_without_transcript_is_an_error() {
        let pipeline = pipeline(vec![], Some(vec![]));
        let mut job = Job::new("call-007.mp3", 64, "uk");

        let err = pipeline.run_analysis(&mut job).await.unwrap_err();
        assert!(matches!(err, PipelineError::Validation(_)));
    }

    #[tokio::test]
    async fn run_analysis_requires_configuration() {
        let pipeline = pipeline(vec![], None);
        let mut job = Job::new("call-008.mp3", 64, "uk");
        job.transcript = Some("Текст.".into());

        let err = pipeline.run_analysis(&mut job).await.unwrap_err();
        assert!(matches!(err, PipelineError::Configuration(_)));
    }
}
