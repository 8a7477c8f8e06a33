//! Engine and model-store implementations
//!
//! Contains concrete implementations of the `VoiceConversionEngine` and
//! `ModelDownloader` traits.

pub mod google_drive;
pub mod rvc_cli;

pub use google_drive::GoogleDriveDownloader;
pub use rvc_cli::RvcCliEngine;
