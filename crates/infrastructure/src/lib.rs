//! Infrastructure layer - configuration, filesystem staging and logging
//!
//! Wires the voice conversion service to its environment: loads `AppConfig`,
//! manages the upload directory and installs the tracing subscriber.

pub mod config;
pub mod staging;
pub mod telemetry;

pub use config::{AppConfig, ServerConfig, StorageConfig};
pub use staging::{StagedKind, StagingError, UploadStore, ensure_dir};
pub use telemetry::{LogFormat, TelemetryError, init_logging};
