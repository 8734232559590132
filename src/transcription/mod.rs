/// Whisper model inference engine
pub mod engine;

pub use engine::{
    EngineOptions, SpeechTranscriber, TranscriptionEngine, TranscriptionError, TranscriptionResult,
};
