/// Waveform tensors, mono reduction and resampling
pub mod buffer;

pub use buffer::{AudioBuffer, AudioError, MonoAudio, SampleData, MODEL_SAMPLE_RATE};
