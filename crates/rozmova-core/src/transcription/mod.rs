//! Speech-to-text call orchestration.

mod transcriber;

pub use transcriber::{
    HttpTranscriptionBackend, RetryingTranscriber, TRANSCRIPTION_TIMEOUT_SECS,
    TranscriptionBackend, TranscriptionRequest,
};
