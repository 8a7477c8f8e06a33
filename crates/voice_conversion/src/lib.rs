//! Voice conversion - engine abstraction, sessions and model acquisition
//!
//! Provides:
//! - `VoiceConversionEngine` - load a model and run the single-file conversion primitive
//! - `ModelDownloader` - fetch a model checkpoint from a remote store
//! - `InferenceSession` - per-request adapter that drives the engine with a fixed parameter set
//! - `ModelCache` - download-if-missing cache of named models
//!
//! # Architecture
//!
//! This crate follows the ports & adapters pattern:
//! - `ports` module defines the traits (ports)
//! - `providers` module contains concrete implementations (adapters)
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use voice_conversion::{InferenceSession, ParamsUpdate, RvcCliEngine, VoiceConversionConfig};
//!
//! let config = VoiceConversionConfig::default();
//! let engine = Arc::new(RvcCliEngine::new(config.engine.clone())?);
//!
//! let mut session = InferenceSession::with_model(engine, config.defaults.clone(), model_path).await?;
//! session.set_params(&ParamsUpdate::default().f0_up_key(0).index_rate(0.75))?;
//! session.convert_file(input_path, output_path).await?;
//! ```

pub mod config;
pub mod error;
pub mod model_cache;
pub mod ports;
pub mod providers;
pub mod session;
pub mod types;

pub use config::{ModelStoreConfig, RvcEngineConfig, VoiceConversionConfig};
pub use error::VoiceCloneError;
pub use model_cache::ModelCache;
pub use ports::{ModelDownloader, VoiceConversionEngine};
pub use providers::{GoogleDriveDownloader, RvcCliEngine};
pub use session::InferenceSession;
pub use types::{
    ConversionReport, F0Method, InferenceParams, ModelInfo, ParamsUpdate, VcOutput,
    VcSingleRequest,
};
