use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::models::{Device, Hub, ModelStore, Precision};

/// Top-level configuration, read from `~/.speech-nodes.toml`
#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    /// Model cache and placement
    #[serde(default)]
    pub models: ModelsConfig,
    /// Model hub connection
    #[serde(default)]
    pub hub: HubConfig,
    /// Decoding limits for the transcription model
    #[serde(default)]
    pub transcription: TranscriptionConfig,
    /// Log output
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

/// Where checkpoints are cached and how they are instantiated
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ModelsConfig {
    /// Host models root, `~` is expanded
    pub root: String,
    /// Accelerator the models are bound to
    pub device: Device,
    /// Weight precision to download and load
    pub precision: Precision,
}

impl Default for ModelsConfig {
    fn default() -> Self {
        Self {
            root: "~/.speech-nodes/models".to_owned(),
            device: Device::default(),
            precision: Precision::default(),
        }
    }
}

/// Remote model hub settings
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct HubConfig {
    /// Hub base URL (`HF_ENDPOINT` takes precedence)
    pub endpoint: String,
    /// Revision to resolve files against
    pub revision: String,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            endpoint: crate::models::download::DEFAULT_ENDPOINT.to_owned(),
            revision: "main".to_owned(),
        }
    }
}

/// Fixed batching/decoding limits applied when the ASR model is loaded
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct TranscriptionConfig {
    /// CPU threads used for inference
    pub threads: usize,
    /// Beam width, 1 means greedy decoding
    pub beam_size: usize,
    /// Upper bound on generated tokens per segment
    pub max_new_tokens: usize,
}

impl Default for TranscriptionConfig {
    fn default() -> Self {
        Self {
            threads: 4,
            beam_size: 1,
            max_new_tokens: 512,
        }
    }
}

/// Log destination
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct TelemetryConfig {
    /// Append logs to `log_path` instead of stderr
    pub enabled: bool,
    /// Log file path, `~` is expanded
    pub log_path: String,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            log_path: "~/.speech-nodes/speech-nodes.log".to_owned(),
        }
    }
}

const DEFAULT_CONFIG: &str = r#"[models]
root = "~/.speech-nodes/models"
device = "cuda:0"
precision = "float16"

[hub]
endpoint = "https://huggingface.co"
revision = "main"

[transcription]
threads = 4
beam_size = 1
max_new_tokens = 512

[telemetry]
enabled = false
log_path = "~/.speech-nodes/speech-nodes.log"
"#;

impl Config {
    /// Load config from ~/.speech-nodes.toml, creating it with defaults if absent
    ///
    /// # Errors
    /// Returns error if HOME is unset or the file cannot be read or parsed
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if !config_path.exists() {
            Self::create_default(&config_path).context("failed to create default config")?;
        }

        Self::load_from(&config_path)
    }

    /// Load config from an explicit path
    ///
    /// # Errors
    /// Returns error if the file cannot be read or parsed
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;

        toml::from_str(&contents).context("failed to parse config TOML")
    }

    fn config_path() -> Result<PathBuf> {
        let home = std::env::var("HOME").context("HOME environment variable not set")?;
        Ok(PathBuf::from(home).join(".speech-nodes.toml"))
    }

    fn create_default(path: &Path) -> Result<()> {
        fs::write(path, DEFAULT_CONFIG).context("failed to write default config")?;
        Ok(())
    }

    /// Model cache rooted at the configured models directory
    ///
    /// # Errors
    /// Returns error if the root uses `~` and HOME is unset
    pub fn model_store(&self) -> Result<ModelStore> {
        let root = Self::expand_path(&self.models.root)?;
        let hub = Hub::new(&self.hub.endpoint, &self.hub.revision);
        Ok(ModelStore::new(&root, hub))
    }

    /// Expand ~ in paths to home directory
    ///
    /// # Errors
    /// Returns error if the path starts with `~/` and HOME is unset
    pub fn expand_path(path: &str) -> Result<PathBuf> {
        if let Some(stripped) = path.strip_prefix("~/") {
            let home = std::env::var("HOME").context("HOME environment variable not set")?;
            Ok(PathBuf::from(home).join(stripped))
        } else {
            Ok(PathBuf::from(path))
        }
    }
}
