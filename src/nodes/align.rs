use anyhow::{bail, Context, Result};
use std::sync::Arc;
use tracing::info;

use crate::alignment::{segment_by_sentence, ForcedAligner, SentenceSpan, Wav2Vec2Aligner};
use crate::audio::AudioBuffer;
use crate::config::Config;
use crate::language::{Language, ALIGNMENT_LANGUAGES};
use crate::models::registry::ALIGNER_VOCAB_FILE;
use crate::models::AlignerModel;

/// Outputs of the forced align node
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AlignOutput {
    /// One `text\tstart\tend` line per row
    pub timestamps: String,
    /// Row texts, one per line
    pub text_list: String,
    /// Row start times, one per line
    pub start_times: String,
    /// Row end times, one per line
    pub end_times: String,
}

impl AlignOutput {
    /// Renders rows with times to three decimals
    #[must_use]
    pub fn from_rows(rows: &[SentenceSpan]) -> Self {
        let join = |field: &dyn Fn(&SentenceSpan) -> String| {
            rows.iter().map(field).collect::<Vec<_>>().join("\n")
        };

        Self {
            timestamps: join(&|r| format!("{}\t{:.3}\t{:.3}", r.text, r.start_time, r.end_time)),
            text_list: join(&|r| r.text.clone()),
            start_times: join(&|r| format!("{:.3}", r.start_time)),
            end_times: join(&|r| format!("{:.3}", r.end_time)),
        }
    }
}

/// Loads a forced aligner, downloading it on first use
///
/// # Errors
/// Returns error if the download fails or the model cannot be loaded
pub fn load_aligner(config: &Config, model: AlignerModel) -> Result<Arc<dyn ForcedAligner>> {
    let precision = config.models.precision;
    let spec = model.spec(precision)?;
    let store = config.model_store()?;
    let dir = store
        .provision(&spec)
        .with_context(|| format!("failed to provision {model}"))?;

    let aligner = Wav2Vec2Aligner::new(
        &dir.join(model.onnx_file(precision)),
        &dir.join(ALIGNER_VOCAB_FILE),
        config.models.device,
    )?;

    info!(model = %model, precision = %precision, "forced aligner ready");

    Ok(Arc::new(aligner))
}

/// Aligns `text` against an audio buffer
///
/// With `by_sentence` the aligned units are regrouped into sentence spans,
/// otherwise every unit is its own row.
///
/// # Errors
/// Returns error if the language is not supported for alignment, the audio
/// cannot be reduced to mono, or alignment fails
pub fn align(
    aligner: &dyn ForcedAligner,
    audio: &AudioBuffer,
    text: &str,
    language: Language,
    by_sentence: bool,
) -> Result<AlignOutput> {
    if !ALIGNMENT_LANGUAGES.contains(&language) {
        bail!("{language} is not supported for forced alignment");
    }

    let mono = audio.to_mono()?;
    let items = aligner.align(&mono, text, language)?;

    let rows: Vec<SentenceSpan> = if by_sentence {
        segment_by_sentence(text, &items)
    } else {
        items.into_iter().map(SentenceSpan::from).collect()
    };

    info!(segments = rows.len(), by_sentence = by_sentence, "forced alignment completed");

    Ok(AlignOutput::from_rows(&rows))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alignment::{AlignedItem, AlignmentError, MockForcedAligner};
    use ndarray::{Array, IxDyn};

    fn mono_buffer() -> AudioBuffer {
        let data = Array::from_shape_vec(IxDyn(&[8]), vec![0.0; 8]).unwrap();
        AudioBuffer::new(data, 16_000)
    }

    fn example_items() -> Vec<AlignedItem> {
        vec![
            AlignedItem::new("hello", 0.0, 0.5),
            AlignedItem::new(" ", 0.5, 0.6),
            AlignedItem::new("world", 0.6, 1.0),
            AlignedItem::new(".", 1.0, 1.0),
            AlignedItem::new(" ", 1.0, 1.0),
            AlignedItem::new("bye", 1.0, 1.3),
        ]
    }

    fn mock_returning(items: Vec<AlignedItem>) -> MockForcedAligner {
        let mut mock = MockForcedAligner::new();
        mock.expect_align()
            .times(1)
            .returning(move |_, _, _| Ok(items.clone()));
        mock
    }

    #[test]
    fn test_sentence_rows() {
        let mock = mock_returning(example_items());

        let out =
            align(&mock, &mono_buffer(), "hello world. bye", Language::English, true).unwrap();

        assert_eq!(
            out.timestamps,
            "hello\t0.000\t0.500\nworld\t0.600\t1.000\nbye\t1.000\t1.300"
        );
        assert_eq!(out.text_list, "hello\nworld\nbye");
        assert_eq!(out.start_times, "0.000\n0.600\n1.000");
        assert_eq!(out.end_times, "0.500\n1.000\n1.300");
    }

    #[test]
    fn test_item_rows_without_segmentation() {
        let mock = mock_returning(vec![
            AlignedItem::new("hi", 0.0, 0.25),
            AlignedItem::new("there", 0.25, 0.5),
        ]);

        let out = align(&mock, &mono_buffer(), "hi there.", Language::English, false).unwrap();

        assert_eq!(out.timestamps, "hi\t0.000\t0.250\nthere\t0.250\t0.500");
        assert_eq!(out.text_list, "hi\nthere");
    }

    #[test]
    fn test_no_items_yield_empty_strings() {
        let mock = mock_returning(Vec::new());

        let out = align(&mock, &mono_buffer(), "hello", Language::English, true).unwrap();

        assert_eq!(out, AlignOutput::default());
    }

    #[test]
    fn test_arguments_reach_aligner() {
        let mut mock = MockForcedAligner::new();
        mock.expect_align()
            .withf(|audio, text, language| {
                audio.samples.len() == 8 && text == "good day" && *language == Language::English
            })
            .times(1)
            .returning(|_, _, _| Ok(Vec::new()));

        assert!(align(&mock, &mono_buffer(), "good day", Language::English, true).is_ok());
    }

    #[test]
    fn test_language_without_aligner_is_rejected() {
        let mut mock = MockForcedAligner::new();
        mock.expect_align().times(0);

        let err =
            align(&mock, &mono_buffer(), "你好，世界。", Language::Chinese, true).unwrap_err();

        assert!(err.to_string().contains("Chinese is not supported"));
    }

    #[test]
    fn test_auto_language_is_rejected() {
        let mut mock = MockForcedAligner::new();
        mock.expect_align().times(0);

        let err = align(&mock, &mono_buffer(), "hi", Language::Auto, true).unwrap_err();

        assert!(err.to_string().contains("not supported for forced alignment"));
    }

    #[test]
    fn test_aligner_error_propagates() {
        let mut mock = MockForcedAligner::new();
        mock.expect_align()
            .returning(|_, _, _| Err(AlignmentError::invalid_input("audio too short")));

        let err = align(&mock, &mono_buffer(), "hi", Language::English, true).unwrap_err();

        assert!(err.to_string().contains("audio too short"));
    }

    #[test]
    fn test_rounding_to_three_decimals() {
        let out = AlignOutput::from_rows(&[SentenceSpan {
            text: "a".to_owned(),
            start_time: 1.234_56,
            end_time: 2.0,
        }]);
        assert_eq!(out.timestamps, "a\t1.235\t2.000");
    }
}
