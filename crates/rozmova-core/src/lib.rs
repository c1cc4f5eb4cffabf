pub mod analysis;
pub mod config;
pub mod error;
pub mod http;
pub mod job;
pub mod pipeline;
pub mod retry;
pub mod settings;
pub mod store;
pub mod sync;
pub mod text;
pub mod transcription;

pub use analysis::{AnalysisReport, AnalysisRunner, merge_analyses, parse_analysis_response};
pub use config::{AnalysisConfig, AnalysisTarget, PipelineConfig, TranscriptionTarget};
pub use error::{PipelineError, Result};
pub use job::{Analysis, AnalysisSource, Job, JobStatus, LogEntry, LogLevel};
pub use pipeline::{AudioSource, Pipeline};
pub use retry::{RetryPolicy, call_with_retry};
pub use settings::Settings;
pub use store::{JobStore, MemoryStore, RetryingStore};
pub use sync::SyncGate;
pub use text::{cleanup_transcript, normalize_transcript, split_chunks};
