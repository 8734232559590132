use anyhow::{Context, Result};
use std::fs;
use std::io::Write;
use std::path::Path;

use super::registry::ModelSpec;

/// Public model hub endpoint
pub const DEFAULT_ENDPOINT: &str = "https://huggingface.co";

/// Connection settings for the model hub
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hub {
    /// Base URL, without trailing slash
    pub endpoint: String,
    /// Branch, tag or commit to resolve files against
    pub revision: String,
    /// Bearer token for gated or private repositories
    pub token: Option<String>,
}

impl Default for Hub {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_owned(),
            revision: "main".to_owned(),
            token: None,
        }
    }
}

impl Hub {
    /// Creates hub settings, letting `HF_ENDPOINT` and `HF_TOKEN` override
    #[must_use]
    pub fn new(endpoint: &str, revision: &str) -> Self {
        let endpoint = std::env::var("HF_ENDPOINT").unwrap_or_else(|_| endpoint.to_owned());
        Self {
            endpoint: endpoint.trim_end_matches('/').to_owned(),
            revision: revision.to_owned(),
            token: std::env::var("HF_TOKEN").ok().filter(|t| !t.is_empty()),
        }
    }

    /// URL of a single repository file
    #[must_use]
    pub fn file_url(&self, repo_id: &str, path: &str) -> String {
        format!(
            "{}/{}/resolve/{}/{}",
            self.endpoint, repo_id, self.revision, path
        )
    }

    fn get(&self, url: &str) -> Result<reqwest::blocking::Response> {
        let client = reqwest::blocking::Client::builder()
            .timeout(None::<std::time::Duration>)
            .build()
            .context("failed to build http client")?;

        let mut request = client.get(url);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .with_context(|| format!("failed to request {url}"))?;

        if !response.status().is_success() {
            anyhow::bail!("download failed with status {}: {}", response.status(), url);
        }
        Ok(response)
    }
}

/// Whether a model directory exists and holds at least one entry
#[must_use]
pub fn is_populated(model_dir: &Path) -> bool {
    fs::read_dir(model_dir)
        .map(|mut entries| entries.next().is_some())
        .unwrap_or(false)
}

/// Ensures the model snapshot is present, returns true if anything was downloaded
///
/// A populated directory is used as-is unless a file the backend needs is missing,
/// in which case only the missing files are fetched.
///
/// # Errors
/// Returns error if the directory cannot be created or a download fails
pub fn ensure_model_downloaded(spec: &ModelSpec, model_dir: &Path, hub: &Hub) -> Result<bool> {
    let populated = is_populated(model_dir);
    let missing: Vec<&str> = spec
        .files
        .iter()
        .copied()
        .filter(|file| !model_dir.join(file).exists())
        .collect();

    if populated && missing.is_empty() {
        tracing::info!(
            model = spec.name,
            path = %model_dir.display(),
            "using local model"
        );
        return Ok(false);
    }

    tracing::info!(
        model = spec.name,
        repo = spec.repo_id,
        path = %model_dir.display(),
        missing = missing.len(),
        "model not found, starting download"
    );

    fs::create_dir_all(model_dir).context("failed to create model directory")?;
    snapshot_download(spec.repo_id, &missing, model_dir, hub)?;

    tracing::info!(
        model = spec.name,
        path = %model_dir.display(),
        "model downloaded"
    );

    Ok(true)
}

/// Mirrors repository files into `local_dir`, keeping their relative paths
///
/// # Errors
/// Returns error if any file download fails
pub fn snapshot_download(
    repo_id: &str,
    files: &[&str],
    local_dir: &Path,
    hub: &Hub,
) -> Result<()> {
    for &file in files {
        let url = hub.file_url(repo_id, file);
        download_file(hub, &url, &local_dir.join(file))?;
    }
    Ok(())
}

fn download_file(hub: &Hub, url: &str, dest: &Path) -> Result<()> {
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent).context("failed to create model directory")?;
    }

    tracing::info!(url = %url, "downloading model file");

    // Download to temporary file first for atomic operation
    let file_name = dest
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let temp_path = dest.with_file_name(format!("{file_name}.part"));

    let result = write_response(hub, url, &temp_path).and_then(|size| {
        fs::rename(&temp_path, dest).with_context(|| {
            format!(
                "failed to rename {} to {}",
                temp_path.display(),
                dest.display()
            )
        })?;
        Ok(size)
    });

    match result {
        Ok(size) => {
            tracing::info!(path = %dest.display(), size = size, "model file downloaded");
            Ok(())
        }
        Err(e) => {
            let _ = fs::remove_file(&temp_path);
            Err(e)
        }
    }
}

fn write_response(hub: &Hub, url: &str, temp_path: &Path) -> Result<u64> {
    let mut response = hub.get(url)?;

    let mut file = fs::File::create(temp_path)
        .with_context(|| format!("failed to create temp file at {}", temp_path.display()))?;

    let size = std::io::copy(&mut response, &mut file)
        .with_context(|| format!("failed to write model data from {url}"))?;
    file.flush().context("failed to flush model file")?;

    Ok(size)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn offline_hub() -> Hub {
        Hub {
            endpoint: "http://127.0.0.1:9".to_owned(),
            revision: "main".to_owned(),
            token: None,
        }
    }

    fn spec(files: Vec<&'static str>) -> ModelSpec {
        ModelSpec {
            name: "test-model",
            repo_id: "owner/test-model",
            files,
        }
    }

    #[test]
    fn test_file_url() {
        let hub = Hub::default();
        assert_eq!(
            hub.file_url("Xenova/wav2vec2-base-960h", "onnx/model.onnx"),
            "https://huggingface.co/Xenova/wav2vec2-base-960h/resolve/main/onnx/model.onnx"
        );
    }

    #[test]
    fn test_is_populated() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("model");
        assert!(!is_populated(&dir));

        fs::create_dir_all(&dir).unwrap();
        assert!(!is_populated(&dir));

        fs::write(dir.join("weights.bin"), b"data").unwrap();
        assert!(is_populated(&dir));
    }

    #[test]
    fn test_ensure_model_downloaded_existing_files() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("test-model");
        fs::create_dir_all(dir.join("onnx")).unwrap();
        fs::write(dir.join("onnx/model.onnx"), b"dummy").unwrap();
        fs::write(dir.join("vocab.json"), b"{}").unwrap();

        let downloaded = ensure_model_downloaded(
            &spec(vec!["onnx/model.onnx", "vocab.json"]),
            &dir,
            &offline_hub(),
        )
        .unwrap();

        // Should return false because everything already existed
        assert!(!downloaded);
    }

    #[test]
    fn test_snapshot_download_without_files_is_a_no_op() {
        let tmp = TempDir::new().unwrap();
        assert!(snapshot_download("owner/repo", &[], tmp.path(), &offline_hub()).is_ok());
        assert!(!is_populated(tmp.path()));
    }

    #[test]
    fn test_ensure_model_downloaded_populated_without_file_list() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("test-model");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("anything.bin"), b"dummy").unwrap();

        let downloaded = ensure_model_downloaded(&spec(vec![]), &dir, &offline_hub()).unwrap();
        assert!(!downloaded);
    }

    #[test]
    fn test_ensure_model_downloaded_fetches_missing_file() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("test-model");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("vocab.json"), b"{}").unwrap();

        // Populated, but the weights are missing: a download is attempted and fails offline
        let result = ensure_model_downloaded(
            &spec(vec!["ggml-small-q8_0.bin", "vocab.json"]),
            &dir,
            &offline_hub(),
        );
        assert!(result.is_err());
        assert!(!dir.join("ggml-small-q8_0.bin").exists());
    }

    #[test]
    fn test_ensure_model_creates_directory() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("nested").join("test-model");

        let _ = ensure_model_downloaded(&spec(vec!["weights.bin"]), &dir, &offline_hub());

        assert!(dir.exists());
    }

    #[test]
    fn test_download_failure_leaves_no_partial_file() {
        let tmp = TempDir::new().unwrap();
        let dest = tmp.path().join("onnx").join("model.onnx");
        let hub = offline_hub();

        let result = download_file(&hub, &hub.file_url("owner/repo", "onnx/model.onnx"), &dest);

        assert!(result.is_err());
        assert!(!dest.exists());
        assert!(!dest.with_file_name("model.onnx.part").exists());
    }

    #[test]
    #[ignore = "requires network access"]
    fn test_snapshot_download_integration() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("wav2vec2-base-960h");

        let downloaded = ensure_model_downloaded(
            &spec(vec!["vocab.json"]).with_repo("Xenova/wav2vec2-base-960h"),
            &dir,
            &Hub::default(),
        )
        .unwrap();

        assert!(downloaded);
        assert!(fs::metadata(dir.join("vocab.json")).unwrap().len() > 0);
    }

    impl ModelSpec {
        fn with_repo(mut self, repo_id: &'static str) -> Self {
            self.repo_id = repo_id;
            self
        }
    }
}
