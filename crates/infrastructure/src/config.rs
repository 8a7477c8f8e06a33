//! Application configuration

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use voice_conversion::VoiceConversionConfig;

/// Prefix of environment variable overrides, e.g. `VOICECLONE__SERVER__PORT`
pub const ENV_PREFIX: &str = "VOICECLONE";

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Upload and model directories
    #[serde(default)]
    pub storage: StorageConfig,

    /// Engine, parameters and model sources
    #[serde(default)]
    pub voice_conversion: VoiceConversionConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to bind to
    #[serde(default = "default_port")]
    pub port: u16,

    /// Maximum request body size in bytes (audio plus uploaded model)
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,

    /// Graceful shutdown timeout in seconds
    #[serde(default)]
    pub shutdown_timeout_secs: Option<u64>,

    /// Log format: "json" for structured JSON logs, "text" for human-readable
    #[serde(default = "default_log_format")]
    pub log_format: String,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

const fn default_port() -> u16 {
    10000
}

const fn default_max_upload_bytes() -> usize {
    512 * 1024 * 1024
}

fn default_log_format() -> String {
    "text".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            max_upload_bytes: default_max_upload_bytes(),
            shutdown_timeout_secs: Some(30),
            log_format: default_log_format(),
        }
    }
}

impl ServerConfig {
    /// Socket address string to bind
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Filesystem locations, relative to the working directory unless absolute
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Staged inputs, uploaded models and conversion outputs
    #[serde(default = "default_upload_dir")]
    pub upload_dir: PathBuf,

    /// Cache of named models
    #[serde(default = "default_model_dir")]
    pub model_dir: PathBuf,
}

fn default_upload_dir() -> PathBuf {
    PathBuf::from("cloned_audio_files")
}

fn default_model_dir() -> PathBuf {
    PathBuf::from("models")
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            upload_dir: default_upload_dir(),
            model_dir: default_model_dir(),
        }
    }
}

impl AppConfig {
    /// Load configuration from defaults, an optional `config` file and the environment
    pub fn load() -> Result<Self, config::ConfigError> {
        Self::load_from("config")
    }

    /// Load configuration using `file` as the optional config file base name
    pub fn load_from(file: &str) -> Result<Self, config::ConfigError> {
        let builder = config::Config::builder()
            // Load from file if exists
            .add_source(config::File::with_name(file).required(false))
            // Override with environment variables (e.g., VOICECLONE__SERVER__PORT)
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            );

        let config = builder.build()?;
        config.try_deserialize()
    }

    /// Validate the configuration
    ///
    /// # Errors
    ///
    /// Returns an error describing the first invalid setting.
    pub fn validate(&self) -> Result<(), String> {
        if self.server.port == 0 {
            return Err("Server port must be greater than 0".to_string());
        }
        if self.server.max_upload_bytes == 0 {
            return Err("max_upload_bytes must be greater than 0".to_string());
        }
        if !matches!(self.server.log_format.as_str(), "text" | "json") {
            return Err(format!(
                "Invalid log format: {}. Use 'text' or 'json'",
                self.server.log_format
            ));
        }
        if self.storage.upload_dir.as_os_str().is_empty() {
            return Err("upload_dir must not be empty".to_string());
        }
        if self.storage.model_dir.as_os_str().is_empty() {
            return Err("model_dir must not be empty".to_string());
        }
        self.voice_conversion.validate()
    }
}
