//! Graph nodes: static descriptors plus one execute function per node
//!
//! | Node                        | Execute                  |
//! |-----------------------------|--------------------------|
//! | `SpeechAsrLoader`           | [`load_asr_model`]       |
//! | `SpeechAsrTranscribe`       | [`transcribe`]           |
//! | `SpeechForcedAlignerLoader` | [`load_aligner`]         |
//! | `SpeechForcedAlign`         | [`align`]                |

pub mod align;
pub mod asr;
pub mod descriptor;

pub use align::{align, load_aligner, AlignOutput};
pub use asr::{load_asr_model, transcribe, TranscribeOutput};
pub use descriptor::{registry, NodeDescriptor, OutputSpec, ParamKind, ParamSpec};
