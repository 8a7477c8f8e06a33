//! Download-if-missing cache of named models
//!
//! Maps a model name from the static source table to `<model_dir>/<name>.pth`.
//! The file is fetched from the remote store on first use and reused on
//! every later request. Nothing is ever evicted or refreshed.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, info, instrument};

use crate::error::VoiceCloneError;
use crate::ports::ModelDownloader;

/// Extension of cached model checkpoints
pub const MODEL_EXTENSION: &str = "pth";

/// Filesystem cache of named models
pub struct ModelCache {
    model_dir: PathBuf,
    sources: BTreeMap<String, String>,
    downloader: Arc<dyn ModelDownloader>,
    // One lock per model name so concurrent first requests download once
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl std::fmt::Debug for ModelCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelCache")
            .field("model_dir", &self.model_dir)
            .field("sources", &self.sources)
            .finish_non_exhaustive()
    }
}

impl ModelCache {
    pub fn new(
        model_dir: impl Into<PathBuf>,
        sources: BTreeMap<String, String>,
        downloader: Arc<dyn ModelDownloader>,
    ) -> Self {
        Self {
            model_dir: model_dir.into(),
            sources,
            downloader,
            locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn model_dir(&self) -> &Path {
        &self.model_dir
    }

    /// Known model names, sorted
    pub fn names(&self) -> Vec<String> {
        self.sources.keys().cloned().collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.sources.contains_key(name)
    }

    /// Local path a model is cached at
    pub fn cached_path(&self, name: &str) -> PathBuf {
        self.model_dir.join(format!("{name}.{MODEL_EXTENSION}"))
    }

    /// Resolve a model name to a local file, downloading it if needed
    ///
    /// # Errors
    ///
    /// Returns `VoiceCloneError::UnknownModel` for names outside the source
    /// table (no download is attempted), or the downloader's error.
    #[instrument(skip(self))]
    pub async fn resolve(&self, name: &str) -> Result<PathBuf, VoiceCloneError> {
        let file_id = self
            .sources
            .get(name)
            .ok_or_else(|| VoiceCloneError::UnknownModel(name.to_string()))?;

        let path = self.cached_path(name);
        if tokio::fs::try_exists(&path).await? {
            debug!(path = %path.display(), "Model cache hit");
            return Ok(path);
        }

        let lock = self.lock_for(name).await;
        let _guard = lock.lock().await;

        // Another request may have finished the download while we waited
        if tokio::fs::try_exists(&path).await? {
            debug!(path = %path.display(), "Model downloaded by concurrent request");
            return Ok(path);
        }

        tokio::fs::create_dir_all(&self.model_dir).await?;
        info!(file_id = %file_id, path = %path.display(), "Downloading model");
        self.downloader.download(file_id, &path).await?;

        if !tokio::fs::try_exists(&path).await? {
            return Err(VoiceCloneError::DownloadFailed(format!(
                "Downloader reported success but {} is missing",
                path.display()
            )));
        }

        info!(path = %path.display(), "Model cached");
        Ok(path)
    }

    async fn lock_for(&self, name: &str) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().await;
        Arc::clone(locks.entry(name.to_string()).or_default())
    }
}
