//! Transcript post-processing: de-duplication, lexical normalization and
//! chunking for analysis.

mod chunk;
mod cleanup;
mod normalize;
mod similarity;

pub use chunk::{CHUNK_JOIN, MAX_CHUNK_CHARS, split_chunks};
pub(crate) use chunk::split_chunks_with_limit;
pub use cleanup::cleanup_transcript;
pub use normalize::normalize_transcript;
pub use similarity::similarity;
