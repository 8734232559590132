//! Forced alignment of transcripts against audio
//!
//! [`ForcedAligner`] produces per-unit timestamps; [`segment_by_sentence`]
//! regroups those units into sentence spans.

pub mod segment;
pub mod tokenization;
pub mod types;
pub mod viterbi;
pub mod wav2vec2;

use thiserror::Error;

use crate::audio::{AudioError, MonoAudio};
use crate::language::Language;

pub use segment::{segment_by_sentence, split_sentences};
pub use types::{AlignedItem, SentenceSpan};
pub use wav2vec2::Wav2Vec2Aligner;

/// Forced alignment errors
#[derive(Debug, Error)]
pub enum AlignmentError {
    /// Filesystem failure
    #[error("I/O error while {context}: {source}")]
    Io {
        /// What was being done
        context: &'static str,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Malformed vocabulary file
    #[error("JSON parse error while {context}: {source}")]
    Json {
        /// What was being parsed
        context: &'static str,
        /// Underlying error
        #[source]
        source: serde_json::Error,
    },

    /// Inference runtime failure
    #[error("{context}: {message}")]
    Runtime {
        /// Pipeline stage
        context: &'static str,
        /// Runtime message
        message: String,
    },

    /// Input the model cannot align
    #[error("invalid input: {message}")]
    InvalidInput {
        /// Reason
        message: String,
    },

    /// Audio conversion failure
    #[error(transparent)]
    Audio(#[from] AudioError),
}

impl AlignmentError {
    pub(crate) const fn io(context: &'static str, source: std::io::Error) -> Self {
        Self::Io { context, source }
    }

    pub(crate) const fn json(context: &'static str, source: serde_json::Error) -> Self {
        Self::Json { context, source }
    }

    pub(crate) fn runtime(context: &'static str, err: impl std::fmt::Display) -> Self {
        Self::Runtime {
            context,
            message: err.to_string(),
        }
    }

    pub(crate) fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }
}

/// Trait for forced alignment backends (allows mocking in tests)
#[cfg_attr(test, mockall::automock)]
pub trait ForcedAligner: Send + Sync {
    /// Time-stamps each unit of `text` within `audio`
    ///
    /// Items come back in transcript order with non-decreasing times.
    ///
    /// # Errors
    /// Returns error if the audio cannot be prepared or inference fails
    fn align(
        &self,
        audio: &MonoAudio,
        text: &str,
        language: Language,
    ) -> Result<Vec<AlignedItem>, AlignmentError>;
}
