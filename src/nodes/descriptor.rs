use serde::Serialize;
use serde_json::{json, Value};

use crate::language::{Language, ALIGNMENT_LANGUAGES, TRANSCRIPTION_LANGUAGES};
use crate::models::{AlignerModel, AsrModel};

/// Menu category every node is listed under
pub const CATEGORY: &str = "audio/speech";

/// Type of a node input or output slot
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ParamKind {
    /// Loaded speech recognition model handle
    AsrModel,
    /// Loaded forced aligner handle
    Aligner,
    /// Waveform plus sample rate
    Audio,
    /// One of a fixed set of labels
    Choice {
        /// Allowed labels, in menu order
        options: Vec<&'static str>,
    },
    /// Free text
    String {
        /// Rendered as a multi-line text box
        multiline: bool,
    },
    /// Toggle
    Boolean,
}

/// One declared input of a node
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParamSpec {
    /// Parameter name
    pub name: &'static str,
    /// Slot type
    pub kind: ParamKind,
    /// Value used when the graph leaves the input unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    /// Whether the graph must wire this input
    pub required: bool,
}

impl ParamSpec {
    fn required(name: &'static str, kind: ParamKind) -> Self {
        Self {
            name,
            kind,
            default: None,
            required: true,
        }
    }

    fn with_default(name: &'static str, kind: ParamKind, default: Value, required: bool) -> Self {
        Self {
            name,
            kind,
            default: Some(default),
            required,
        }
    }
}

/// One declared output of a node
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutputSpec {
    /// Output name
    pub name: &'static str,
    /// Slot type
    pub kind: ParamKind,
}

/// Static contract of a node: identity, inputs and outputs
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeDescriptor {
    /// Registry key
    pub name: &'static str,
    /// Label shown in menus
    pub display_name: &'static str,
    /// Menu category
    pub category: &'static str,
    /// Declared inputs, in slot order
    pub inputs: Vec<ParamSpec>,
    /// Declared outputs, in slot order
    pub outputs: Vec<OutputSpec>,
}

impl NodeDescriptor {
    /// Looks up a declared input by name
    #[must_use]
    pub fn input(&self, name: &str) -> Option<&ParamSpec> {
        self.inputs.iter().find(|p| p.name == name)
    }

    /// Declared output names, in slot order
    #[must_use]
    pub fn output_names(&self) -> Vec<&'static str> {
        self.outputs.iter().map(|o| o.name).collect()
    }
}

fn language_choice(languages: &[Language]) -> ParamKind {
    ParamKind::Choice {
        options: languages.iter().map(|l| l.name()).collect(),
    }
}

fn text_output(name: &'static str) -> OutputSpec {
    OutputSpec {
        name,
        kind: ParamKind::String { multiline: true },
    }
}

/// Speech recognition model loader
#[must_use]
pub fn asr_loader() -> NodeDescriptor {
    NodeDescriptor {
        name: "SpeechAsrLoader",
        display_name: "Speech ASR Model Loader",
        category: CATEGORY,
        inputs: vec![ParamSpec::with_default(
            "model_name",
            ParamKind::Choice {
                options: AsrModel::ALL.iter().map(|m| m.name()).collect(),
            },
            json!(AsrModel::default().name()),
            true,
        )],
        outputs: vec![OutputSpec {
            name: "model",
            kind: ParamKind::AsrModel,
        }],
    }
}

/// Transcription node
#[must_use]
pub fn asr_transcribe() -> NodeDescriptor {
    NodeDescriptor {
        name: "SpeechAsrTranscribe",
        display_name: "Speech ASR Transcribe",
        category: CATEGORY,
        inputs: vec![
            ParamSpec::required("model", ParamKind::AsrModel),
            ParamSpec::required("audio", ParamKind::Audio),
            ParamSpec::with_default(
                "language",
                language_choice(TRANSCRIPTION_LANGUAGES),
                json!(Language::Auto.name()),
                false,
            ),
        ],
        outputs: vec![text_output("text"), text_output("language")],
    }
}

/// Forced aligner loader
#[must_use]
pub fn aligner_loader() -> NodeDescriptor {
    NodeDescriptor {
        name: "SpeechForcedAlignerLoader",
        display_name: "Speech Forced Aligner Loader",
        category: CATEGORY,
        inputs: vec![ParamSpec::with_default(
            "model_name",
            ParamKind::Choice {
                options: AlignerModel::ALL.iter().map(|m| m.name()).collect(),
            },
            json!(AlignerModel::default().name()),
            true,
        )],
        outputs: vec![OutputSpec {
            name: "aligner",
            kind: ParamKind::Aligner,
        }],
    }
}

/// Forced alignment node
#[must_use]
pub fn forced_align() -> NodeDescriptor {
    NodeDescriptor {
        name: "SpeechForcedAlign",
        display_name: "Speech Forced Align",
        category: CATEGORY,
        inputs: vec![
            ParamSpec::required("aligner", ParamKind::Aligner),
            ParamSpec::required("audio", ParamKind::Audio),
            ParamSpec::with_default("text", ParamKind::String { multiline: true }, json!(""), true),
            ParamSpec::with_default(
                "language",
                language_choice(ALIGNMENT_LANGUAGES),
                json!(Language::English.name()),
                true,
            ),
            ParamSpec::with_default("segment_by_sentence", ParamKind::Boolean, json!(true), true),
        ],
        outputs: vec![
            text_output("timestamps"),
            text_output("text_list"),
            text_output("start_times"),
            text_output("end_times"),
        ],
    }
}

/// Descriptors of every node, in registration order
#[must_use]
pub fn registry() -> Vec<NodeDescriptor> {
    vec![asr_loader(), asr_transcribe(), aligner_loader(), forced_align()]
}
