use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::Mutex;

use tracing::{debug, info, warn};

use super::tokenization::{build_token_sequence, split_units, TokenSequence};
use super::types::AlignedItem;
use super::viterbi::{forced_align, log_softmax_rows};
use super::{AlignmentError, ForcedAligner};
use crate::audio::{MonoAudio, MODEL_SAMPLE_RATE};
use crate::language::Language;
use crate::models::Device;

const BLANK_TOKEN: &str = "<pad>";
const WORD_SEPARATOR: char = '|';

/// Character vocabulary of a CTC head
#[derive(Debug, Clone)]
pub struct Vocabulary {
    chars: HashMap<char, usize>,
    blank_id: usize,
    word_sep_id: Option<usize>,
    size: usize,
}

impl Vocabulary {
    /// Parses a `vocab.json` token-to-id map
    ///
    /// Multi-character tokens other than the pad token are ignored.
    ///
    /// # Errors
    /// Returns error if the JSON is malformed
    pub fn from_json(json: &str) -> Result<Self, AlignmentError> {
        let raw: HashMap<String, usize> =
            serde_json::from_str(json).map_err(|e| AlignmentError::json("parsing vocab.json", e))?;

        let blank_id = raw.get(BLANK_TOKEN).copied().unwrap_or(0);
        let size = raw.values().copied().max().map_or(0, |max| max + 1);
        let mut chars = HashMap::new();
        for (token, id) in &raw {
            let mut it = token.chars();
            if let (Some(c), None) = (it.next(), it.next()) {
                chars.insert(c, *id);
            }
        }
        let word_sep_id = chars.remove(&WORD_SEPARATOR);

        Ok(Self {
            chars,
            blank_id,
            word_sep_id,
            size,
        })
    }

    /// Loads `vocab.json` from disk
    ///
    /// # Errors
    /// Returns error if the file cannot be read or parsed
    pub fn load(path: &Path) -> Result<Self, AlignmentError> {
        let json =
            fs::read_to_string(path).map_err(|e| AlignmentError::io("reading vocab.json", e))?;
        Self::from_json(&json)
    }

    /// Token sequence for `text`
    #[must_use]
    pub fn encode(&self, text: &str, language: Language) -> TokenSequence {
        // Unspaced scripts carry no word boundaries for the separator to mark
        let separator = if language.is_unspaced() {
            None
        } else {
            self.word_sep_id
        };
        build_token_sequence(text, language, &self.chars, self.blank_id, separator)
    }

    /// Token sequence for `text`, failing when none of it can be spelled
    ///
    /// A transcript with no word characters at all yields an empty sequence.
    /// One whose units are all outside the vocabulary (another script) is an
    /// error; partially covered transcripts drop the uncovered units.
    ///
    /// # Errors
    /// Returns `InvalidInput` if the transcript has units but none is alignable
    pub fn encode_checked(
        &self,
        text: &str,
        language: Language,
    ) -> Result<TokenSequence, AlignmentError> {
        let candidates = split_units(text, language).len();
        let sequence = self.encode(text, language);

        if candidates > 0 && sequence.units.is_empty() {
            return Err(AlignmentError::invalid_input(format!(
                "no {language} unit of the transcript is spelled by the aligner vocabulary"
            )));
        }
        if sequence.units.len() < candidates {
            warn!(
                dropped = candidates - sequence.units.len(),
                units = candidates,
                "transcript units outside the aligner vocabulary were skipped"
            );
        }

        Ok(sequence)
    }

    /// Checks that every vocabulary id indexes into a logits row of `width`
    ///
    /// # Errors
    /// Returns `Runtime` if the vocabulary is larger than the model output
    pub fn check_logits_width(&self, width: usize) -> Result<(), AlignmentError> {
        if self.size > width {
            return Err(AlignmentError::runtime(
                "onnx extract logits",
                format!(
                    "vocab.json has {} ids but the model emits {width} logits per frame",
                    self.size
                ),
            ));
        }
        Ok(())
    }

    /// Id of the CTC blank
    #[must_use]
    pub const fn blank_id(&self) -> usize {
        self.blank_id
    }
}

/// wav2vec2 CTC aligner running an ONNX export through ONNX Runtime
pub struct Wav2Vec2Aligner {
    session: Mutex<ort::session::Session>,
    vocab: Vocabulary,
}

impl Wav2Vec2Aligner {
    /// Loads the ONNX model and its vocabulary
    ///
    /// # Errors
    /// Returns error if the vocabulary or model cannot be loaded, or the
    /// execution provider for `device` is unavailable
    pub fn new(
        model_path: &Path,
        vocab_path: &Path,
        device: Device,
    ) -> Result<Self, AlignmentError> {
        let vocab = Vocabulary::load(vocab_path)?;
        let device = device.effective();

        let session = ort::session::Session::builder()
            .map_err(|e| AlignmentError::runtime("onnx session builder", e))?
            .with_execution_providers(execution_providers(device))
            .map_err(|e| AlignmentError::runtime("onnx execution providers", e))?
            .commit_from_file(model_path)
            .map_err(|e| AlignmentError::runtime("onnx model load", e))?;

        info!(
            model_path = %model_path.display(),
            device = %device,
            vocab_size = vocab.size,
            "wav2vec2 aligner loaded"
        );

        Ok(Self {
            session: Mutex::new(session),
            vocab,
        })
    }

    /// Frame log-probabilities for 16 kHz audio
    fn log_probs(&self, samples: &[f32]) -> Result<Vec<Vec<f32>>, AlignmentError> {
        let normalized = normalize(samples);
        let shape = [1usize, normalized.len()];
        let input = ort::value::TensorRef::from_array_view((shape, normalized.as_slice()))
            .map_err(|e| AlignmentError::runtime("onnx input tensor", e))?;

        let mut session = self
            .session
            .lock()
            .map_err(|_| AlignmentError::runtime("onnx session lock", "session mutex poisoned"))?;
        let outputs = session
            .run(ort::inputs![input])
            .map_err(|e| AlignmentError::runtime("onnx forward pass", e))?;
        if outputs.len() == 0 {
            return Err(AlignmentError::runtime(
                "onnx forward pass",
                "model produced no outputs",
            ));
        }

        let (shape, logits) = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(|e| AlignmentError::runtime("onnx extract logits", e))?;
        let width = shape
            .last()
            .and_then(|&v| usize::try_from(v).ok())
            .ok_or_else(|| {
                AlignmentError::runtime("onnx extract logits", "logits have no vocabulary axis")
            })?;
        self.vocab.check_logits_width(width)?;

        Ok(log_softmax_rows(logits, width))
    }
}

impl ForcedAligner for Wav2Vec2Aligner {
    fn align(
        &self,
        audio: &MonoAudio,
        text: &str,
        language: Language,
    ) -> Result<Vec<AlignedItem>, AlignmentError> {
        let samples = audio.resampled(MODEL_SAMPLE_RATE)?;
        let sequence = self.vocab.encode_checked(text, language)?;

        if sequence.units.is_empty() {
            debug!("transcript has no word characters");
            return Ok(Vec::new());
        }
        if samples.is_empty() {
            return Err(AlignmentError::invalid_input("audio is empty"));
        }

        let log_probs = self.log_probs(&samples)?;
        let blank_id = self.vocab.blank_id();
        let needed = sequence.min_frames(blank_id);
        if log_probs.len() < needed {
            return Err(AlignmentError::invalid_input(format!(
                "audio too short: {} frames for {} labels",
                log_probs.len(),
                needed
            )));
        }

        #[allow(clippy::cast_precision_loss)]
        let frame_secs =
            samples.len() as f64 / log_probs.len() as f64 / f64::from(MODEL_SAMPLE_RATE);
        let path = forced_align(&log_probs, &sequence.tokens);
        let items = group_path(&path, &sequence, frame_secs);

        debug!(
            frames = log_probs.len(),
            units = sequence.units.len(),
            items = items.len(),
            "alignment completed"
        );

        Ok(items)
    }
}

/// Collapses a state path into one timed item per transcript unit
///
/// A unit spans from the first frame of its first label to the end of the
/// last frame of its last label.
#[must_use]
pub fn group_path(
    path: &[(usize, usize)],
    sequence: &TokenSequence,
    frame_secs: f64,
) -> Vec<AlignedItem> {
    let mut bounds: Vec<Option<(usize, usize)>> = vec![None; sequence.units.len()];
    for &(state, frame) in path {
        let Some(Some(unit)) = sequence.unit_of_state.get(state) else {
            continue;
        };
        let slot = &mut bounds[*unit];
        *slot = Some(slot.map_or((frame, frame), |(first, _)| (first, frame)));
    }

    #[allow(clippy::cast_precision_loss)]
    let to_secs = |frame: usize| frame as f64 * frame_secs;

    sequence
        .units
        .iter()
        .zip(bounds)
        .filter_map(|(text, span)| {
            span.map(|(first, last)| {
                AlignedItem::new(text.clone(), to_secs(first), to_secs(last + 1))
            })
        })
        .collect()
}

/// Zero-mean, unit-variance normalization applied by the wav2vec2 feature extractor
fn normalize(samples: &[f32]) -> Vec<f32> {
    if samples.is_empty() {
        return Vec::new();
    }
    #[allow(clippy::cast_precision_loss)]
    let n = samples.len() as f64;
    let mean = samples.iter().map(|&s| f64::from(s)).sum::<f64>() / n;
    let variance = samples.iter().map(|&s| (f64::from(s) - mean).powi(2)).sum::<f64>() / n;
    let scale = 1.0 / (variance + 1e-7).sqrt();
    #[allow(clippy::cast_possible_truncation)]
    samples
        .iter()
        .map(|&s| ((f64::from(s) - mean) * scale) as f32)
        .collect()
}

fn execution_providers(device: Device) -> Vec<ort::ep::ExecutionProviderDispatch> {
    match device {
        #[cfg(feature = "cuda")]
        Device::Cuda(index) => vec![
            ort::ep::CUDA::default()
                .with_device_id(i32::try_from(index).unwrap_or_default())
                .build()
                .error_on_failure(),
            ort::ep::CPU::default().build(),
        ],
        _ => vec![ort::ep::CPU::default().build()],
    }
}
