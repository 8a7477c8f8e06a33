//! Port definitions for voice conversion
//!
//! Defines the traits (ports) that engine and model-store adapters must implement.

use std::path::Path;

use async_trait::async_trait;

use crate::error::VoiceCloneError;
use crate::types::{ModelInfo, VcOutput, VcSingleRequest};

/// Port for voice conversion engines
///
/// Exposes the engine's model loading and its low-level single-file
/// conversion primitive. Parameter handling lives in
/// [`crate::InferenceSession`], which drives `vc_single` with an explicit
/// argument set.
#[async_trait]
pub trait VoiceConversionEngine: Send + Sync {
    /// Load a model checkpoint
    ///
    /// # Returns
    ///
    /// Returns the model metadata: registry name, associated index artifact
    /// and the model's target sample rate.
    ///
    /// # Errors
    ///
    /// Returns `VoiceCloneError::InvalidModel` if the checkpoint is missing
    /// or unusable.
    async fn load_model(&self, model_path: &Path) -> Result<ModelInfo, VoiceCloneError>;

    /// Convert one audio file with a loaded model
    ///
    /// # Errors
    ///
    /// Returns `VoiceCloneError` if the engine fails to produce audio.
    async fn vc_single(
        &self,
        model: &ModelInfo,
        request: &VcSingleRequest,
    ) -> Result<VcOutput, VoiceCloneError>;

    /// Check if the engine can be run
    async fn is_available(&self) -> bool;

    /// Human-readable engine name
    fn name(&self) -> &str;
}

/// Port for remote model stores
#[async_trait]
pub trait ModelDownloader: Send + Sync {
    /// Download the file identified by `file_id` to `destination`
    ///
    /// Implementations must not leave a partial file at `destination` on failure.
    ///
    /// # Errors
    ///
    /// Returns `VoiceCloneError::DownloadFailed` or `ConnectionFailed`.
    async fn download(&self, file_id: &str, destination: &Path) -> Result<(), VoiceCloneError>;
}
