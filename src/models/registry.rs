use std::fmt;
use std::str::FromStr;

use thiserror::Error;

use super::device::Precision;
use crate::language::Language;

/// Hub repository hosting the whisper.cpp GGML checkpoints
const WHISPER_CPP_REPO: &str = "ggerganov/whisper.cpp";

/// Vocabulary shipped next to every wav2vec2 CTC export
pub const ALIGNER_VOCAB_FILE: &str = "vocab.json";

/// Registry lookup errors
#[derive(Debug, Error)]
pub enum RegistryError {
    /// Name is not in the registry
    #[error("unknown model '{name}', expected one of: {expected}")]
    UnknownModel {
        /// Requested name
        name: String,
        /// Comma-separated list of valid names
        expected: String,
    },

    /// Model does not publish weights at this precision
    #[error("model '{model}' is not published at {precision} precision")]
    UnsupportedPrecision {
        /// Model name
        model: &'static str,
        /// Requested precision
        precision: Precision,
    },
}

/// A resolved download plan: where the weights live and which files to fetch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelSpec {
    /// Symbolic model name, also the cache directory name
    pub name: &'static str,
    /// Hub repository id (`owner/name`)
    pub repo_id: &'static str,
    /// Repository-relative files the backend needs
    pub files: Vec<&'static str>,
}

/// Speech recognition checkpoints offered by the ASR loader node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AsrModel {
    /// whisper large-v3 turbo
    #[default]
    WhisperLargeV3Turbo,
    /// whisper large-v3
    WhisperLargeV3,
    /// whisper small (multilingual)
    WhisperSmall,
    /// whisper base (multilingual)
    WhisperBase,
}

impl AsrModel {
    /// Every registered ASR model, in menu order
    pub const ALL: &'static [Self] = &[
        Self::WhisperLargeV3Turbo,
        Self::WhisperLargeV3,
        Self::WhisperSmall,
        Self::WhisperBase,
    ];

    /// Symbolic name
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::WhisperLargeV3Turbo => "whisper-large-v3-turbo",
            Self::WhisperLargeV3 => "whisper-large-v3",
            Self::WhisperSmall => "whisper-small",
            Self::WhisperBase => "whisper-base",
        }
    }

    /// GGML weight file for the requested precision
    ///
    /// GGML checkpoints are published as f16 plus quantized variants; there is no f32 build.
    #[must_use]
    pub const fn weights_file(self, precision: Precision) -> Option<&'static str> {
        match (self, precision) {
            (_, Precision::Float32) | (Self::WhisperLargeV3, Precision::Int8) => None,
            (Self::WhisperLargeV3Turbo, Precision::Float16) => Some("ggml-large-v3-turbo.bin"),
            (Self::WhisperLargeV3Turbo, Precision::Int8) => Some("ggml-large-v3-turbo-q8_0.bin"),
            (Self::WhisperLargeV3, Precision::Float16) => Some("ggml-large-v3.bin"),
            (Self::WhisperSmall, Precision::Float16) => Some("ggml-small.bin"),
            (Self::WhisperSmall, Precision::Int8) => Some("ggml-small-q8_0.bin"),
            (Self::WhisperBase, Precision::Float16) => Some("ggml-base.bin"),
            (Self::WhisperBase, Precision::Int8) => Some("ggml-base-q8_0.bin"),
        }
    }

    /// Download plan for this model
    ///
    /// # Errors
    /// Returns error if the model is not published at `precision`
    pub fn spec(self, precision: Precision) -> Result<ModelSpec, RegistryError> {
        let weights =
            self.weights_file(precision)
                .ok_or(RegistryError::UnsupportedPrecision {
                    model: self.name(),
                    precision,
                })?;
        Ok(ModelSpec {
            name: self.name(),
            repo_id: WHISPER_CPP_REPO,
            files: vec![weights],
        })
    }
}

/// Forced-alignment checkpoints offered by the aligner loader node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AlignerModel {
    /// wav2vec2 base fine-tuned on 960h LibriSpeech, ONNX export
    #[default]
    Wav2Vec2Base960h,
}

impl AlignerModel {
    /// Every registered aligner model, in menu order
    pub const ALL: &'static [Self] = &[Self::Wav2Vec2Base960h];

    /// Symbolic name
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Wav2Vec2Base960h => "wav2vec2-base-960h",
        }
    }

    const fn repo_id(self) -> &'static str {
        match self {
            Self::Wav2Vec2Base960h => "Xenova/wav2vec2-base-960h",
        }
    }

    /// Languages the model's character vocabulary can spell
    #[must_use]
    pub const fn languages(self) -> &'static [Language] {
        match self {
            // Uppercase A-Z plus apostrophe
            Self::Wav2Vec2Base960h => &[Language::English],
        }
    }

    /// ONNX graph for the requested precision
    #[must_use]
    pub const fn onnx_file(self, precision: Precision) -> &'static str {
        match precision {
            Precision::Float32 => "onnx/model.onnx",
            Precision::Float16 => "onnx/model_fp16.onnx",
            Precision::Int8 => "onnx/model_quantized.onnx",
        }
    }

    /// Download plan for this model
    ///
    /// # Errors
    /// Never fails today; the signature matches [`AsrModel::spec`]
    #[allow(clippy::unnecessary_wraps)] // Consistent API with AsrModel::spec
    pub fn spec(self, precision: Precision) -> Result<ModelSpec, RegistryError> {
        Ok(ModelSpec {
            name: self.name(),
            repo_id: self.repo_id(),
            files: vec![self.onnx_file(precision), ALIGNER_VOCAB_FILE],
        })
    }
}

fn unknown(name: &str, all: impl Iterator<Item = &'static str>) -> RegistryError {
    RegistryError::UnknownModel {
        name: name.to_owned(),
        expected: all.collect::<Vec<_>>().join(", "),
    }
}

impl FromStr for AsrModel {
    type Err = RegistryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|m| m.name() == s)
            .ok_or_else(|| unknown(s, Self::ALL.iter().map(|m| m.name())))
    }
}

impl FromStr for AlignerModel {
    type Err = RegistryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|m| m.name() == s)
            .ok_or_else(|| unknown(s, Self::ALL.iter().map(|m| m.name())))
    }
}

impl fmt::Display for AsrModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl fmt::Display for AlignerModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_asr_names_parse_back() {
        for model in AsrModel::ALL {
            assert_eq!(model.name().parse::<AsrModel>().unwrap(), *model);
        }
    }

    #[test]
    fn test_unknown_model_lists_choices() {
        let err = "whisper-huge".parse::<AsrModel>().unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("whisper-huge"));
        assert!(msg.contains("whisper-large-v3-turbo"));
    }

    #[test]
    fn test_asr_spec_default_precision() {
        let spec = AsrModel::default().spec(Precision::Float16).unwrap();
        assert_eq!(spec.name, "whisper-large-v3-turbo");
        assert_eq!(spec.repo_id, "ggerganov/whisper.cpp");
        assert_eq!(spec.files, vec!["ggml-large-v3-turbo.bin"]);
    }

    #[test]
    fn test_asr_quantized_variant() {
        let spec = AsrModel::WhisperSmall.spec(Precision::Int8).unwrap();
        assert_eq!(spec.files, vec!["ggml-small-q8_0.bin"]);
    }

    #[test]
    fn test_asr_float32_not_published() {
        let err = AsrModel::WhisperBase.spec(Precision::Float32).unwrap_err();
        assert!(matches!(
            err,
            RegistryError::UnsupportedPrecision {
                model: "whisper-base",
                precision: Precision::Float32
            }
        ));
    }

    #[test]
    fn test_aligner_spec_includes_vocab() {
        let spec = AlignerModel::default().spec(Precision::Float32).unwrap();
        assert_eq!(spec.name, "wav2vec2-base-960h");
        assert_eq!(spec.files, vec!["onnx/model.onnx", "vocab.json"]);
    }

    #[test]
    fn test_alignment_menu_matches_registered_aligners() {
        for language in crate::language::ALIGNMENT_LANGUAGES {
            assert!(AlignerModel::ALL.iter().any(|m| m.languages().contains(language)));
        }
        for model in AlignerModel::ALL {
            for language in model.languages() {
                assert!(crate::language::ALIGNMENT_LANGUAGES.contains(language));
            }
        }
    }

    #[test]
    fn test_aligner_names_parse_back() {
        for model in AlignerModel::ALL {
            assert_eq!(model.name().parse::<AlignerModel>().unwrap(), *model);
        }
        assert!("mms-300m".parse::<AlignerModel>().is_err());
    }
}
