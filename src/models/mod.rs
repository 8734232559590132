/// Accelerator device and numeric precision
pub mod device;
/// Hub snapshot download and cache checks
pub mod download;
/// Symbolic model names and their hub files
pub mod registry;

use anyhow::Result;
use std::path::{Path, PathBuf};

pub use device::{Device, Precision};
pub use download::{ensure_model_downloaded, Hub};
pub use registry::{AlignerModel, AsrModel, ModelSpec};

/// Folder under the host models root that holds this crate's checkpoints
pub const MODELS_SUBDIR: &str = "speech-nodes";

/// Local model cache, one directory per model name
#[derive(Debug, Clone)]
pub struct ModelStore {
    root: PathBuf,
    hub: Hub,
}

impl ModelStore {
    /// Creates a store rooted at `<models_root>/speech-nodes`
    #[must_use]
    pub fn new(models_root: &Path, hub: Hub) -> Self {
        Self {
            root: models_root.join(MODELS_SUBDIR),
            hub,
        }
    }

    /// Cache directory for a model name
    #[must_use]
    pub fn model_dir(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    /// Makes sure the model's files are on disk, returns its directory
    ///
    /// # Errors
    /// Returns error if a download is needed and fails
    pub fn provision(&self, spec: &ModelSpec) -> Result<PathBuf> {
        let dir = self.model_dir(spec.name);
        ensure_model_downloaded(spec, &dir, &self.hub)?;
        Ok(dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_model_dir_layout() {
        let store = ModelStore::new(Path::new("/models"), Hub::default());
        assert_eq!(
            store.model_dir("whisper-small"),
            PathBuf::from("/models/speech-nodes/whisper-small")
        );
    }

    #[test]
    fn test_provision_uses_local_copy() {
        let tmp = TempDir::new().unwrap();
        let store = ModelStore::new(
            tmp.path(),
            Hub {
                endpoint: "http://127.0.0.1:9".to_owned(),
                ..Hub::default()
            },
        );
        let spec = AsrModel::WhisperBase.spec(Precision::Float16).unwrap();
        let dir = store.model_dir(spec.name);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("ggml-base.bin"), b"weights").unwrap();

        assert_eq!(store.provision(&spec).unwrap(), dir);
    }
}
