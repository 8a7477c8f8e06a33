//! Application state shared across handlers

use std::sync::Arc;

use infrastructure::{AppConfig, UploadStore};
use voice_conversion::{
    InferenceParams, ModelCache, ModelDownloader, ParamsUpdate, VoiceConversionEngine,
};

/// Shared application state
///
/// Built once at startup; handlers only read from it.
#[derive(Clone)]
pub struct AppState {
    /// Voice conversion engine every session is created on
    pub engine: Arc<dyn VoiceConversionEngine>,
    /// Named-model download cache
    pub model_cache: Arc<ModelCache>,
    /// Upload directory for staged files
    pub uploads: Arc<UploadStore>,
    /// Parameters a fresh session starts with
    pub session_defaults: InferenceParams,
    /// Fixed overrides applied before every conversion
    pub clone_overrides: ParamsUpdate,
    /// Maximum accepted request body in bytes
    pub max_upload_bytes: usize,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("engine", &self.engine.name())
            .field("model_cache", &self.model_cache)
            .field("uploads", &self.uploads)
            .field("session_defaults", &self.session_defaults)
            .field("clone_overrides", &self.clone_overrides)
            .field("max_upload_bytes", &self.max_upload_bytes)
            .finish()
    }
}

impl AppState {
    /// Assemble state from configuration and the two external collaborators
    pub fn from_config(
        config: &AppConfig,
        engine: Arc<dyn VoiceConversionEngine>,
        downloader: Arc<dyn ModelDownloader>,
    ) -> Self {
        let vc = &config.voice_conversion;
        Self {
            engine,
            model_cache: Arc::new(ModelCache::new(
                config.storage.model_dir.clone(),
                vc.models.sources.clone(),
                downloader,
            )),
            uploads: Arc::new(UploadStore::new(config.storage.upload_dir.clone())),
            session_defaults: vc.defaults.clone(),
            clone_overrides: vc.clone.clone(),
            max_upload_bytes: config.server.max_upload_bytes,
        }
    }
}
