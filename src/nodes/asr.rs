use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::info;

use crate::audio::AudioBuffer;
use crate::config::Config;
use crate::language::Language;
use crate::models::AsrModel;
use crate::transcription::{EngineOptions, SpeechTranscriber, TranscriptionEngine};

/// Outputs of the transcribe node
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscribeOutput {
    /// Recognized text
    pub text: String,
    /// Detected (or declared) language label
    pub language: String,
}

/// Loads a speech recognition model, downloading it on first use
///
/// # Errors
/// Returns error if the model is not offered at the configured precision, the
/// download fails, or the weights cannot be loaded
pub fn load_asr_model(config: &Config, model: AsrModel) -> Result<Arc<dyn SpeechTranscriber>> {
    let precision = config.models.precision;
    let spec = model.spec(precision)?;
    let store = config.model_store()?;
    let dir = store
        .provision(&spec)
        .with_context(|| format!("failed to provision {model}"))?;

    let weights = spec
        .files
        .first()
        .map(|file| dir.join(file))
        .context("model spec lists no weights file")?;

    let options = EngineOptions {
        threads: config.transcription.threads,
        beam_size: config.transcription.beam_size,
        max_new_tokens: config.transcription.max_new_tokens,
        device: config.models.device,
    };
    let engine = TranscriptionEngine::new(&weights, options)?;

    info!(model = %model, precision = %precision, "speech recognition model ready");

    Ok(Arc::new(engine))
}

/// Transcribes an audio buffer
///
/// `Language::Auto` lets the model detect the language.
///
/// # Errors
/// Returns error if the audio cannot be reduced to mono or inference fails
pub fn transcribe(
    model: &dyn SpeechTranscriber,
    audio: &AudioBuffer,
    language: Language,
) -> Result<TranscribeOutput> {
    let mono = audio.to_mono()?;
    let hint = (language != Language::Auto).then_some(language);

    let result = model.transcribe(&mono, hint)?;
    let text = result.text.trim().to_owned();

    info!(language = %result.language, "detected language");
    info!(text = %text, "transcription");

    Ok(TranscribeOutput {
        text,
        language: result.language,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transcription::engine::MockSpeechTranscriber;
    use crate::transcription::{TranscriptionError, TranscriptionResult};
    use mockall::predicate::eq;
    use ndarray::{Array, IxDyn};

    fn stereo_buffer() -> AudioBuffer {
        let samples = vec![0.2, 0.2, 0.2, 0.2, 0.4, 0.4, 0.4, 0.4];
        let data = Array::from_shape_vec(IxDyn(&[1, 2, 4]), samples).unwrap();
        AudioBuffer::new(data, 16_000)
    }

    #[test]
    fn test_auto_language_passes_no_hint() {
        let mut mock = MockSpeechTranscriber::new();
        mock.expect_transcribe()
            .withf(|audio, language| audio.samples.len() == 4 && language.is_none())
            .times(1)
            .returning(|_, _| {
                Ok(TranscriptionResult {
                    text: "  hello world ".to_owned(),
                    language: "English".to_owned(),
                })
            });

        let out = transcribe(&mock, &stereo_buffer(), Language::Auto).unwrap();

        assert_eq!(out.text, "hello world");
        assert_eq!(out.language, "English");
    }

    #[test]
    fn test_declared_language_is_forwarded() {
        let mut mock = MockSpeechTranscriber::new();
        mock.expect_transcribe()
            .with(mockall::predicate::always(), eq(Some(Language::Japanese)))
            .times(1)
            .returning(|_, _| {
                Ok(TranscriptionResult {
                    text: "こんにちは".to_owned(),
                    language: "Japanese".to_owned(),
                })
            });

        let out = transcribe(&mock, &stereo_buffer(), Language::Japanese).unwrap();

        assert_eq!(out.language, "Japanese");
    }

    #[test]
    fn test_channels_are_averaged_before_inference() {
        let mut mock = MockSpeechTranscriber::new();
        mock.expect_transcribe()
            .withf(|audio, _| audio.samples.iter().all(|s| (s - 0.3).abs() < 1e-6))
            .returning(|_, _| {
                Ok(TranscriptionResult {
                    text: String::new(),
                    language: "English".to_owned(),
                })
            });

        assert!(transcribe(&mock, &stereo_buffer(), Language::Auto).is_ok());
    }

    #[test]
    fn test_inference_error_propagates() {
        let mut mock = MockSpeechTranscriber::new();
        mock.expect_transcribe()
            .returning(|_, _| Err(TranscriptionError::StateCreation));

        let err = transcribe(&mock, &stereo_buffer(), Language::Auto).unwrap_err();

        assert!(err.to_string().contains("failed to create whisper state"));
    }

    #[test]
    fn test_bad_rank_never_reaches_model() {
        let mut mock = MockSpeechTranscriber::new();
        mock.expect_transcribe().times(0);
        let data = Array::from_shape_vec(IxDyn(&[1, 1, 1, 2]), vec![0.0, 0.0]).unwrap();

        let result = transcribe(&mock, &AudioBuffer::new(data, 16_000), Language::Auto);

        assert!(result.is_err());
    }

    #[test]
    fn test_float32_precision_is_rejected_before_download() {
        let mut config = Config::default();
        config.models.precision = crate::models::Precision::Float32;
        config.models.root = "/nonexistent/models".to_owned();

        let result = load_asr_model(&config, AsrModel::WhisperBase);

        assert!(result.is_err());
    }
}
