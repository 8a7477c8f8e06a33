//! Voice conversion errors

use thiserror::Error;

/// Errors that can occur while acquiring models or converting audio
#[derive(Debug, Error)]
pub enum VoiceCloneError {
    /// The session has no model loaded
    #[error("Model not loaded.")]
    ModelNotLoaded,

    /// Model name is not present in the source table
    #[error("Unknown model: {0}")]
    UnknownModel(String),

    /// Model file is missing or unusable
    #[error("Invalid model: {0}")]
    InvalidModel(String),

    /// Inference parameter out of range
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Failed to reach the model store
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Remote model download failed
    #[error("Download failed: {0}")]
    DownloadFailed(String),

    /// The engine ran but did not produce a result
    #[error("Inference failed: {0}")]
    InferenceFailed(String),

    /// Writing or reading WAV data failed
    #[error("Audio processing failed: {0}")]
    AudioProcessing(String),

    /// Engine not installed or not runnable
    #[error("Engine not available: {0}")]
    NotAvailable(String),

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Filesystem error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<reqwest::Error> for VoiceCloneError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_connect() {
            Self::ConnectionFailed(err.to_string())
        } else {
            Self::DownloadFailed(err.to_string())
        }
    }
}

impl From<hound::Error> for VoiceCloneError {
    fn from(err: hound::Error) -> Self {
        match err {
            hound::Error::IoError(e) => Self::Io(e),
            other => Self::AudioProcessing(other.to_string()),
        }
    }
}
