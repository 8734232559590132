use anyhow::Context;
use std::path::Path;
use std::sync::{Arc, Mutex};
use thiserror::Error;
use whisper_rs::{FullParams, SamplingStrategy, WhisperContext, WhisperContextParameters};

use crate::audio::{AudioError, MonoAudio, MODEL_SAMPLE_RATE};
use crate::language::Language;
use crate::models::Device;

/// Transcribed text and the language it was recognized in
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscriptionResult {
    /// Recognized text, trimmed
    pub text: String,
    /// Detected (or declared) language, as a menu label when known, else the ISO code
    pub language: String,
}

/// Single inference entry point of a loaded speech recognition model
///
/// Nodes hold an `Arc<dyn SpeechTranscriber>` so tests can substitute
/// `MockSpeechTranscriber` (via `mockall`).
#[cfg_attr(test, mockall::automock)]
pub trait SpeechTranscriber: Send + Sync {
    /// Transcribe mono audio; `None` lets the model detect the language
    ///
    /// # Errors
    /// Returns error if inference fails
    fn transcribe(
        &self,
        audio: &MonoAudio,
        language: Option<Language>,
    ) -> Result<TranscriptionResult, TranscriptionError>;
}

/// Errors that can occur during transcription
#[derive(Debug, Error)]
pub enum TranscriptionError {
    /// Failed to load Whisper model
    #[error("failed to load whisper model from {path}: {source}")]
    ModelLoad {
        /// Path to model file
        path: String,
        /// Underlying error
        source: anyhow::Error,
    },

    /// Failed to create Whisper inference state
    #[error("failed to create whisper state")]
    StateCreation,

    /// Input audio could not be prepared
    #[error("invalid audio input: {0}")]
    Audio(#[from] AudioError),

    /// Transcription inference failed
    #[error("failed to transcribe audio")]
    Transcription(#[from] anyhow::Error),
}

/// Decoding limits fixed at load time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineOptions {
    /// CPU threads for inference
    pub threads: usize,
    /// Beam width, 1 means greedy
    pub beam_size: usize,
    /// Max generated tokens per segment
    pub max_new_tokens: usize,
    /// Device the context is created on
    pub device: Device,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            threads: 4,
            beam_size: 1,
            max_new_tokens: 512,
            device: Device::Cpu,
        }
    }
}

/// Whisper transcription engine
pub struct TranscriptionEngine {
    /// Whisper context (thread-safe)
    ctx: Arc<Mutex<WhisperContext>>,
    /// Number of CPU threads for inference
    threads: i32,
    /// Beam search width
    beam_size: i32,
    /// Token budget per segment
    max_new_tokens: i32,
}

impl TranscriptionEngine {
    /// Determines sampling strategy based on beam size (pure, testable)
    const fn get_sampling_strategy(beam_size: i32) -> SamplingStrategy {
        if beam_size > 1 {
            SamplingStrategy::BeamSearch {
                beam_size,
                patience: -1.0,
            }
        } else {
            SamplingStrategy::Greedy { best_of: 1 }
        }
    }

    /// Creates a new `TranscriptionEngine` by loading the model from the given path
    ///
    /// # Errors
    /// Returns error if model file doesn't exist, is invalid, or if an option is zero
    /// or exceeds `i32::MAX`
    pub fn new(model_path: &Path, options: EngineOptions) -> Result<Self, TranscriptionError> {
        let load_err = |msg: String| TranscriptionError::ModelLoad {
            path: model_path.display().to_string(),
            source: anyhow::anyhow!(msg),
        };

        if options.threads == 0 {
            return Err(load_err("threads must be > 0".to_owned()));
        }
        if options.beam_size == 0 {
            return Err(load_err("beam_size must be > 0".to_owned()));
        }
        if options.max_new_tokens == 0 {
            return Err(load_err("max_new_tokens must be > 0".to_owned()));
        }

        // whisper-rs takes i32 for all of these
        let threads = i32::try_from(options.threads)
            .map_err(|_| load_err(format!("threads value too large (max: {})", i32::MAX)))?;
        let beam_size = i32::try_from(options.beam_size)
            .map_err(|_| load_err(format!("beam_size value too large (max: {})", i32::MAX)))?;
        let max_new_tokens = i32::try_from(options.max_new_tokens).map_err(|_| {
            load_err(format!("max_new_tokens value too large (max: {})", i32::MAX))
        })?;

        let device = options.device.effective();

        tracing::info!(
            path = %model_path.display(),
            threads = threads,
            beam_size = beam_size,
            max_new_tokens = max_new_tokens,
            device = %device,
            "loading whisper model"
        );

        let path_str = model_path
            .to_str()
            .ok_or_else(|| load_err("model path contains invalid UTF-8".to_owned()))?;

        let mut params = WhisperContextParameters::default();
        params.use_gpu = device.is_gpu();
        if let Device::Cuda(index) = device {
            params.gpu_device = i32::try_from(index)
                .map_err(|_| load_err(format!("cuda device index too large: {index}")))?;
        }

        let ctx = WhisperContext::new_with_params(path_str, params)
            .map_err(|e| load_err(format!("{e:?}")))?;

        tracing::info!("whisper model loaded successfully");

        Ok(Self {
            ctx: Arc::new(Mutex::new(ctx)),
            threads,
            beam_size,
            max_new_tokens,
        })
    }

    /// Transcribes 16kHz mono samples, auto-detecting the language when none is given
    ///
    /// # Errors
    /// Returns error if Whisper inference fails or mutex is poisoned
    fn transcribe_impl(
        &self,
        audio_data: &[f32],
        language: Option<Language>,
    ) -> Result<TranscriptionResult, TranscriptionError> {
        let _span = tracing::debug_span!("transcription", samples = audio_data.len()).entered();
        tracing::debug!(language = ?language, "starting transcription");

        let mut state = self
            .ctx
            .lock()
            .map_err(|e| anyhow::anyhow!("mutex poisoned: {e}"))?
            .create_state()
            .map_err(|_| TranscriptionError::StateCreation)?;

        let declared = language.and_then(Language::code);

        let strategy = Self::get_sampling_strategy(self.beam_size);
        let mut params = FullParams::new(strategy);
        params.set_n_threads(self.threads);
        params.set_max_tokens(self.max_new_tokens);
        params.set_print_special(false);
        params.set_print_progress(false);
        params.set_print_realtime(false);
        params.set_print_timestamps(false);
        params.set_language(Some(declared.unwrap_or("auto")));
        params.set_translate(false);

        let start = std::time::Instant::now();
        state
            .full(params, audio_data)
            .context("whisper inference failed")?;
        let inference_duration = start.elapsed();

        let mut text = String::new();
        for segment in state.as_iter() {
            text.push_str(&segment.to_string());
        }
        let text = text.trim().to_owned();

        let language = match language.filter(|lang| *lang != Language::Auto) {
            Some(lang) => lang.name().to_owned(),
            None => {
                let lang_id = state.full_lang_id_from_state();
                let code = whisper_rs::get_lang_str(lang_id).unwrap_or("unknown");
                Language::from_code(code).map_or_else(|| code.to_owned(), |l| l.name().to_owned())
            }
        };

        tracing::info!(
            segments = state.full_n_segments(),
            text_len = text.len(),
            language = %language,
            inference_ms = inference_duration.as_millis(),
            "transcription completed"
        );

        Ok(TranscriptionResult { text, language })
    }
}

impl SpeechTranscriber for TranscriptionEngine {
    fn transcribe(
        &self,
        audio: &MonoAudio,
        language: Option<Language>,
    ) -> Result<TranscriptionResult, TranscriptionError> {
        let samples = audio.resampled(MODEL_SAMPLE_RATE)?;
        self.transcribe_impl(&samples, language)
    }
}

// SAFETY: TranscriptionEngine is thread-safe because:
// 1. WhisperContext is wrapped in Arc<Mutex<>>, ensuring exclusive access
// 2. All methods require acquiring the mutex lock before accessing the context
// 3. No shared mutable state exists outside the mutex
#[allow(unsafe_code)]
unsafe impl Send for TranscriptionEngine {}
#[allow(unsafe_code)]
unsafe impl Sync for TranscriptionEngine {}

#[cfg(test)]
#[allow(clippy::print_stderr)] // Test diagnostics
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn get_test_model_path() -> Option<PathBuf> {
        let path = std::env::var("SPEECH_NODES_TEST_WHISPER").ok().map(PathBuf::from)?;
        path.exists().then_some(path)
    }

    fn options(threads: usize, beam_size: usize) -> EngineOptions {
        EngineOptions {
            threads,
            beam_size,
            ..EngineOptions::default()
        }
    }

    #[test]
    fn test_model_load_nonexistent_path() {
        let nonexistent_path = Path::new("/tmp/nonexistent_model.bin");
        let result = TranscriptionEngine::new(nonexistent_path, EngineOptions::default());

        assert!(matches!(result, Err(TranscriptionError::ModelLoad { .. })));
        if let Err(TranscriptionError::ModelLoad { path, .. }) = result {
            assert!(path.contains("nonexistent_model.bin"));
        }
    }

    #[test]
    fn test_new_with_zero_threads() {
        let result = TranscriptionEngine::new(Path::new("/tmp/dummy.bin"), options(0, 5));
        assert!(matches!(result, Err(TranscriptionError::ModelLoad { .. })));
        if let Err(TranscriptionError::ModelLoad { source, .. }) = result {
            assert!(source.to_string().contains("threads must be > 0"));
        }
    }

    #[test]
    fn test_new_with_zero_beam_size() {
        let result = TranscriptionEngine::new(Path::new("/tmp/dummy.bin"), options(4, 0));
        assert!(matches!(result, Err(TranscriptionError::ModelLoad { .. })));
        if let Err(TranscriptionError::ModelLoad { source, .. }) = result {
            assert!(source.to_string().contains("beam_size must be > 0"));
        }
    }

    #[test]
    fn test_new_with_zero_token_budget() {
        let opts = EngineOptions {
            max_new_tokens: 0,
            ..EngineOptions::default()
        };
        let result = TranscriptionEngine::new(Path::new("/tmp/dummy.bin"), opts);
        assert!(matches!(result, Err(TranscriptionError::ModelLoad { .. })));
        if let Err(TranscriptionError::ModelLoad { source, .. }) = result {
            assert!(source.to_string().contains("max_new_tokens must be > 0"));
        }
    }

    #[test]
    fn test_thread_count_overflow() {
        #[cfg(target_pointer_width = "64")]
        {
            let path = Path::new("/tmp/dummy.bin");
            let result = TranscriptionEngine::new(path, options((i32::MAX as usize) + 1, 5));
            assert!(matches!(result, Err(TranscriptionError::ModelLoad { .. })));
            if let Err(TranscriptionError::ModelLoad { source, .. }) = result {
                assert!(source.to_string().contains("threads value too large"));
            }
        }
    }

    #[test]
    fn test_get_sampling_strategy_greedy() {
        let strategy = TranscriptionEngine::get_sampling_strategy(1);
        assert!(matches!(strategy, SamplingStrategy::Greedy { best_of: 1 }));
    }

    #[test]
    fn test_get_sampling_strategy_beam_search() {
        for beam in [2, 5, 10] {
            let strategy = TranscriptionEngine::get_sampling_strategy(beam);
            assert!(
                matches!(
                    strategy,
                    SamplingStrategy::BeamSearch { beam_size, patience }
                        if beam_size == beam && patience < 0.0
                ),
                "Expected BeamSearch with beam_size={beam}"
            );
        }
    }

    #[test]
    fn test_engine_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<TranscriptionEngine>();
    }

    #[test]
    #[ignore = "requires actual model file"]
    fn test_transcribe_silence_detects_some_language() {
        let Some(model_path) = get_test_model_path() else {
            eprintln!("Skipping test: set SPEECH_NODES_TEST_WHISPER to a ggml model");
            return;
        };

        let engine = TranscriptionEngine::new(&model_path, EngineOptions::default()).unwrap();
        let audio = MonoAudio {
            samples: vec![0.0; 48_000],
            sample_rate: 48_000,
        };

        let result = engine.transcribe(&audio, None).unwrap();
        assert!(result.text.len() < 50);
        assert!(!result.language.is_empty());
    }

    #[test]
    #[ignore = "requires actual model file"]
    fn test_declared_language_is_reported() {
        let Some(model_path) = get_test_model_path() else {
            eprintln!("Skipping test: set SPEECH_NODES_TEST_WHISPER to a ggml model");
            return;
        };

        let engine = TranscriptionEngine::new(&model_path, EngineOptions::default()).unwrap();
        let audio = MonoAudio {
            samples: vec![0.0; 16_000],
            sample_rate: 16_000,
        };

        let result = engine.transcribe(&audio, Some(Language::German)).unwrap();
        assert_eq!(result.language, "German");
    }
}
