//! RVC command-line voice conversion engine
//!
//! Implements `VoiceConversionEngine` by running the `rvc_python` CLI.
//!
//! # Prerequisites
//!
//! ```bash
//! python -m venv .venv && . .venv/bin/activate
//! pip install rvc-python
//! ```
//!
//! The engine is invoked once per conversion with every voice conversion
//! option spelled out on the command line, so the CLI's own defaults never
//! apply. Output is written to a temporary WAV and read back as samples
//! together with the rate the checkpoint rendered at.

use std::path::Path;
use std::process::Stdio;

use async_trait::async_trait;
use tempfile::NamedTempFile;
use tokio::process::Command;
use tracing::{debug, error, instrument, warn};

use crate::config::RvcEngineConfig;
use crate::error::VoiceCloneError;
use crate::ports::VoiceConversionEngine;
use crate::types::{MIN_RESAMPLE_RATE, ModelInfo, VcOutput, VcSingleRequest};

/// Extension of the feature index stored next to a model
pub const INDEX_EXTENSION: &str = "index";

/// Engine backed by the `rvc_python` CLI
#[derive(Debug, Clone)]
pub struct RvcCliEngine {
    config: RvcEngineConfig,
}

impl RvcCliEngine {
    /// Create a new CLI engine
    ///
    /// # Errors
    ///
    /// Returns `VoiceCloneError::Configuration` if the executable is empty.
    pub fn new(config: RvcEngineConfig) -> Result<Self, VoiceCloneError> {
        if config.executable.as_os_str().is_empty() {
            return Err(VoiceCloneError::Configuration(
                "Engine executable must not be empty".to_string(),
            ));
        }
        Ok(Self { config })
    }

    fn executable(&self) -> &Path {
        &self.config.executable
    }

    /// Full argument list for one conversion
    fn conversion_args(
        &self,
        model: &ModelInfo,
        request: &VcSingleRequest,
        output_path: &Path,
    ) -> Vec<String> {
        let mut args = self.config.args.clone();
        let mut push = |flag: &str, value: String| {
            args.push(flag.to_string());
            args.push(value);
        };

        push("--input", request.input_audio_path.display().to_string());
        push("--output", output_path.display().to_string());
        push("--model", model.path.display().to_string());
        push("--pitch", request.f0_up_key.to_string());
        push("--method", request.f0_method.to_string());
        push(
            "--index",
            request
                .file_index
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_default(),
        );
        push("--index_rate", request.index_rate.to_string());
        push("--filter_radius", request.filter_radius.to_string());
        push("--resample_sr", request.resample_sr.to_string());
        push("--rms_mix_rate", request.rms_mix_rate.to_string());
        push("--protect", request.protect.to_string());
        push("--device", self.config.device.clone());
        args
    }

    /// Inputs the CLI has no flag for
    fn reject_unsupported(request: &VcSingleRequest) -> Result<(), VoiceCloneError> {
        if request.sid != 0 {
            return Err(VoiceCloneError::InvalidParameter(format!(
                "Speaker id {} is not supported by the CLI engine",
                request.sid
            )));
        }
        if request.f0_file.is_some() || request.file_index2.is_some() {
            return Err(VoiceCloneError::InvalidParameter(
                "f0 files and secondary indexes are not supported by the CLI engine".to_string(),
            ));
        }
        Ok(())
    }

    /// Rate assumed before the first conversion reveals the real one
    fn target_sample_rate_for(&self, model_path: &Path) -> u32 {
        model_path
            .file_stem()
            .and_then(|s| s.to_str())
            .and_then(sample_rate_hint)
            .unwrap_or(self.config.default_target_sample_rate)
    }
}

/// Parse a `32k`/`40k`/`48k` token out of a model file stem
fn sample_rate_hint(stem: &str) -> Option<u32> {
    stem.to_lowercase()
        .split(|c: char| !c.is_ascii_alphanumeric())
        .find_map(|token| match token {
            "32k" => Some(32_000),
            "40k" => Some(40_000),
            "48k" => Some(48_000),
            _ => None,
        })
}

/// Read a WAV file into mono 16-bit samples
fn read_waveform(path: &Path) -> Result<(u32, Vec<i16>), VoiceCloneError> {
    let mut reader = hound::WavReader::open(path)?;
    let spec = reader.spec();
    let channels = usize::from(spec.channels.max(1));

    let samples: Vec<i16> = match spec.sample_format {
        hound::SampleFormat::Int if spec.bits_per_sample == 16 => {
            reader.samples::<i16>().collect::<Result<_, _>>()?
        },
        hound::SampleFormat::Int => {
            let shift = u32::from(spec.bits_per_sample.saturating_sub(16));
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| (v >> shift) as i16))
                .collect::<Result<_, _>>()?
        },
        hound::SampleFormat::Float => reader
            .samples::<f32>()
            .map(|s| s.map(|v| (v.clamp(-1.0, 1.0) * f32::from(i16::MAX)) as i16))
            .collect::<Result<_, _>>()?,
    };

    let mono = if channels == 1 {
        samples
    } else {
        samples.into_iter().step_by(channels).collect()
    };

    Ok((spec.sample_rate, mono))
}

#[async_trait]
impl VoiceConversionEngine for RvcCliEngine {
    #[instrument(skip(self))]
    async fn load_model(&self, model_path: &Path) -> Result<ModelInfo, VoiceCloneError> {
        if !tokio::fs::try_exists(model_path).await? {
            return Err(VoiceCloneError::InvalidModel(format!(
                "Model file not found: {}",
                model_path.display()
            )));
        }

        let name = model_path
            .file_stem()
            .and_then(|s| s.to_str())
            .ok_or_else(|| {
                VoiceCloneError::InvalidModel(format!(
                    "Model path has no file name: {}",
                    model_path.display()
                ))
            })?
            .to_string();

        let index_path = model_path.with_extension(INDEX_EXTENSION);
        let index = if tokio::fs::try_exists(&index_path).await? {
            Some(index_path)
        } else {
            None
        };

        Ok(ModelInfo {
            name,
            path: model_path.to_path_buf(),
            index,
            target_sample_rate: self.target_sample_rate_for(model_path),
        })
    }

    #[instrument(skip(self, model, request), fields(model = %model.name, input = %request.input_audio_path.display()))]
    async fn vc_single(
        &self,
        model: &ModelInfo,
        request: &VcSingleRequest,
    ) -> Result<VcOutput, VoiceCloneError> {
        Self::reject_unsupported(request)?;

        let output_file = NamedTempFile::with_suffix(".wav").map_err(|e| {
            VoiceCloneError::InferenceFailed(format!("Failed to create temp file: {e}"))
        })?;

        let mut cmd = Command::new(self.executable());
        cmd.args(self.conversion_args(model, request, output_file.path()))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        debug!("Running rvc: {:?}", cmd);

        let output = cmd.output().await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                VoiceCloneError::NotAvailable(format!(
                    "Engine not found at '{}'",
                    self.executable().display()
                ))
            } else {
                VoiceCloneError::InferenceFailed(format!("Failed to run engine: {e}"))
            }
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            error!("RVC failed: {}", stderr);
            return Err(VoiceCloneError::InferenceFailed(format!(
                "Engine exited with status {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        let path = output_file.path().to_path_buf();
        let (sample_rate, waveform) = tokio::task::spawn_blocking(move || read_waveform(&path))
            .await
            .map_err(|e| VoiceCloneError::AudioProcessing(format!("WAV reader task failed: {e}")))??;

        // Only an explicit resample fixes the rate; otherwise the checkpoint decides
        if request.resample_sr >= MIN_RESAMPLE_RATE && sample_rate != request.resample_sr {
            warn!(
                sample_rate,
                expected = request.resample_sr,
                "Engine ignored requested resample rate"
            );
            return Err(VoiceCloneError::InferenceFailed(format!(
                "Engine wrote {sample_rate} Hz audio, expected {} Hz",
                request.resample_sr
            )));
        }
        if sample_rate != model.target_sample_rate && request.resample_sr < MIN_RESAMPLE_RATE {
            debug!(
                sample_rate,
                assumed = model.target_sample_rate,
                "Checkpoint rate differs from file name hint"
            );
        }

        Ok(VcOutput::Rendered {
            info: String::from_utf8_lossy(&output.stdout).trim().to_string(),
            waveform,
            sample_rate,
        })
    }

    async fn is_available(&self) -> bool {
        Command::new(self.executable())
            .args(&self.config.args)
            .arg("--help")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
            .map(|s| s.success())
            .unwrap_or(false)
    }

    fn name(&self) -> &str {
        "rvc-cli"
    }
}
