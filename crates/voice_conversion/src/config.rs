//! Configuration for voice conversion

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::types::{InferenceParams, ParamsUpdate};

/// Configuration for the voice conversion stack
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoiceConversionConfig {
    /// Engine invocation settings
    #[serde(default)]
    pub engine: RvcEngineConfig,

    /// Engine parameter defaults every session starts from
    #[serde(default)]
    pub defaults: InferenceParams,

    /// Overrides applied to every `/clone` session before inference
    #[serde(default = "default_clone_overrides")]
    pub clone: ParamsUpdate,

    /// Named model sources
    #[serde(default)]
    pub models: ModelStoreConfig,
}

/// Settings for the RVC command-line engine
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RvcEngineConfig {
    /// Program to run
    #[serde(default = "default_executable")]
    pub executable: PathBuf,

    /// Arguments placed before the conversion options
    #[serde(default = "default_args")]
    pub args: Vec<String>,

    /// Torch device passed to the engine
    #[serde(default = "default_device")]
    pub device: String,

    /// Sample rate assumed when the model file name carries no rate hint
    #[serde(default = "default_target_sample_rate")]
    pub default_target_sample_rate: u32,
}

/// Remote model store and the static name -> file id table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelStoreConfig {
    /// Base URL of the file host
    #[serde(default = "default_download_base_url")]
    pub download_base_url: String,

    /// Model name -> public file identifier
    #[serde(default)]
    pub sources: BTreeMap<String, String>,
}

fn default_clone_overrides() -> ParamsUpdate {
    ParamsUpdate::default().f0_up_key(0).index_rate(0.75)
}

fn default_executable() -> PathBuf {
    PathBuf::from("python")
}

fn default_args() -> Vec<String> {
    vec!["-m".to_string(), "rvc_python".to_string(), "cli".to_string()]
}

fn default_device() -> String {
    "cpu:0".to_string()
}

const fn default_target_sample_rate() -> u32 {
    40_000
}

fn default_download_base_url() -> String {
    "https://drive.google.com".to_string()
}

impl Default for VoiceConversionConfig {
    fn default() -> Self {
        Self {
            engine: RvcEngineConfig::default(),
            defaults: InferenceParams::default(),
            clone: default_clone_overrides(),
            models: ModelStoreConfig::default(),
        }
    }
}

impl Default for RvcEngineConfig {
    fn default() -> Self {
        Self {
            executable: default_executable(),
            args: default_args(),
            device: default_device(),
            default_target_sample_rate: default_target_sample_rate(),
        }
    }
}

impl Default for ModelStoreConfig {
    fn default() -> Self {
        Self {
            download_base_url: default_download_base_url(),
            sources: BTreeMap::new(),
        }
    }
}

impl VoiceConversionConfig {
    /// Parameters every `/clone` session runs with
    pub fn clone_params(&self) -> InferenceParams {
        let mut params = self.defaults.clone();
        params.apply(&self.clone);
        params
    }

    /// Validate the configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn validate(&self) -> Result<(), String> {
        if self.engine.executable.as_os_str().is_empty() {
            return Err("Engine executable must not be empty".to_string());
        }

        if self.engine.default_target_sample_rate == 0 {
            return Err("Default target sample rate must be greater than 0".to_string());
        }

        self.defaults.validate().map_err(|e| e.to_string())?;
        self.clone_params().validate().map_err(|e| e.to_string())?;

        for (name, file_id) in &self.models.sources {
            validate_model_name(name)?;
            if file_id.trim().is_empty() {
                return Err(format!("Model '{name}' has an empty file id"));
            }
        }

        Ok(())
    }
}

/// Model names become file names in the model directory
pub fn validate_model_name(name: &str) -> Result<(), String> {
    if name.is_empty() || name == "." || name == ".." {
        return Err(format!("Invalid model name: '{name}'"));
    }
    if name.contains(['/', '\\']) || name.contains('\0') {
        return Err(format!("Model name must not contain path separators: '{name}'"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_expected_values() {
        let config = VoiceConversionConfig::default();

        assert_eq!(config.engine.executable, PathBuf::from("python"));
        assert_eq!(config.engine.args, vec!["-m", "rvc_python", "cli"]);
        assert_eq!(config.engine.device, "cpu:0");
        assert_eq!(config.engine.default_target_sample_rate, 40_000);
        assert_eq!(config.models.download_base_url, "https://drive.google.com");
        assert!(config.models.sources.is_empty());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn clone_params_apply_fixed_overrides() {
        let params = VoiceConversionConfig::default().clone_params();
        assert_eq!(params.f0_up_key, 0);
        assert!((params.index_rate - 0.75).abs() < f32::EPSILON);
        assert_eq!(params.filter_radius, 3);
    }

    #[test]
    fn deserializes_sources_from_toml() {
        let toml_str = r#"
            [engine]
            executable = "/opt/rvc/bin/python"
            device = "cuda:0"

            [models.sources]
            alice = "1AbCdEf"
            bob = "2GhIjKl"
        "#;

        let config: VoiceConversionConfig = toml::from_str(toml_str).unwrap();

        assert_eq!(config.engine.executable, PathBuf::from("/opt/rvc/bin/python"));
        assert_eq!(config.engine.device, "cuda:0");
        assert_eq!(config.engine.args, vec!["-m", "rvc_python", "cli"]);
        assert_eq!(config.models.sources.len(), 2);
        assert_eq!(config.models.sources["alice"], "1AbCdEf");
        assert!((config.clone_params().index_rate - 0.75).abs() < f32::EPSILON);
    }

    #[test]
    fn validate_rejects_path_like_model_names() {
        let mut config = VoiceConversionConfig::default();
        config
            .models
            .sources
            .insert("../escape".to_string(), "id".to_string());
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_empty_file_id() {
        let mut config = VoiceConversionConfig::default();
        config
            .models
            .sources
            .insert("alice".to_string(), "  ".to_string());
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_bad_clone_overrides() {
        let mut config = VoiceConversionConfig::default();
        config.clone.index_rate = Some(3.0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn model_name_rules() {
        assert!(validate_model_name("alice").is_ok());
        assert!(validate_model_name("alice_v2.final").is_ok());
        assert!(validate_model_name("").is_err());
        assert!(validate_model_name("..").is_err());
        assert!(validate_model_name("a/b").is_err());
        assert!(validate_model_name("a\\b").is_err());
    }
}
