//! Speech Nodes - graph nodes for speech recognition and forced alignment
//!
//! Two loader nodes fetch and cache checkpoints from a model hub and bind
//! them to a device; two processing nodes run transcription or alignment and
//! flatten the results into strings for downstream nodes.

/// Forced alignment and sentence segmentation
pub mod alignment;
/// Audio buffers and channel/rate normalization
pub mod audio;
/// Configuration management
pub mod config;
/// Supported languages
pub mod language;
/// Model registry, hub download and cache
pub mod models;
/// Node descriptors and execute functions
pub mod nodes;
/// Logging setup
pub mod telemetry;
/// Whisper transcription engine
pub mod transcription;
