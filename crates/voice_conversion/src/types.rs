//! Core types for voice conversion

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::VoiceCloneError;

/// Lowest resample rate the engine honours; anything below keeps the model rate
pub const MIN_RESAMPLE_RATE: u32 = 16_000;

/// Pitch-extraction method
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum F0Method {
    /// WORLD harvest
    #[default]
    Harvest,
    /// Parselmouth
    Pm,
    /// CREPE neural pitch tracker
    Crepe,
    /// RMVPE
    Rmvpe,
}

impl F0Method {
    /// Name understood by the engine
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Harvest => "harvest",
            Self::Pm => "pm",
            Self::Crepe => "crepe",
            Self::Rmvpe => "rmvpe",
        }
    }
}

impl fmt::Display for F0Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for F0Method {
    type Err = VoiceCloneError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "harvest" => Ok(Self::Harvest),
            "pm" => Ok(Self::Pm),
            "crepe" => Ok(Self::Crepe),
            "rmvpe" => Ok(Self::Rmvpe),
            other => Err(VoiceCloneError::InvalidParameter(format!(
                "Unknown f0 method: {other}"
            ))),
        }
    }
}

/// Voice conversion parameters held by an inference session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InferenceParams {
    /// Semitone offset applied to the extracted pitch contour
    pub f0_up_key: i32,
    /// Pitch-extraction method
    pub f0_method: F0Method,
    /// Weight of the feature index on the converted timbre (0.0 - 1.0)
    pub index_rate: f32,
    /// Median filter radius applied to the pitch contour
    pub filter_radius: u32,
    /// Output resample rate; values below 16000 keep the model rate
    pub resample_sr: u32,
    /// Blend between input and output loudness envelopes (0.0 - 1.0)
    pub rms_mix_rate: f32,
    /// Protection of unvoiced consonants and breaths (0.0 - 0.5)
    pub protect: f32,
}

impl Default for InferenceParams {
    fn default() -> Self {
        Self {
            f0_up_key: 0,
            f0_method: F0Method::Harvest,
            index_rate: 0.5,
            filter_radius: 3,
            resample_sr: 0,
            rms_mix_rate: 1.0,
            protect: 0.33,
        }
    }
}

impl InferenceParams {
    /// Validate parameter ranges
    pub fn validate(&self) -> Result<(), VoiceCloneError> {
        if !(0.0..=1.0).contains(&self.index_rate) {
            return Err(VoiceCloneError::InvalidParameter(format!(
                "index_rate must be between 0.0 and 1.0, got {}",
                self.index_rate
            )));
        }
        if !(0.0..=1.0).contains(&self.rms_mix_rate) {
            return Err(VoiceCloneError::InvalidParameter(format!(
                "rms_mix_rate must be between 0.0 and 1.0, got {}",
                self.rms_mix_rate
            )));
        }
        if !(0.0..=0.5).contains(&self.protect) {
            return Err(VoiceCloneError::InvalidParameter(format!(
                "protect must be between 0.0 and 0.5, got {}",
                self.protect
            )));
        }
        if !(-48..=48).contains(&self.f0_up_key) {
            return Err(VoiceCloneError::InvalidParameter(format!(
                "f0_up_key must be between -48 and 48, got {}",
                self.f0_up_key
            )));
        }
        Ok(())
    }

    /// Apply a partial update, leaving unset fields untouched
    pub fn apply(&mut self, update: &ParamsUpdate) {
        if let Some(v) = update.f0_up_key {
            self.f0_up_key = v;
        }
        if let Some(v) = update.f0_method {
            self.f0_method = v;
        }
        if let Some(v) = update.index_rate {
            self.index_rate = v;
        }
        if let Some(v) = update.filter_radius {
            self.filter_radius = v;
        }
        if let Some(v) = update.resample_sr {
            self.resample_sr = v;
        }
        if let Some(v) = update.rms_mix_rate {
            self.rms_mix_rate = v;
        }
        if let Some(v) = update.protect {
            self.protect = v;
        }
    }
}

/// Partial parameter update for [`crate::InferenceSession::set_params`]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParamsUpdate {
    pub f0_up_key: Option<i32>,
    pub f0_method: Option<F0Method>,
    pub index_rate: Option<f32>,
    pub filter_radius: Option<u32>,
    pub resample_sr: Option<u32>,
    pub rms_mix_rate: Option<f32>,
    pub protect: Option<f32>,
}

impl ParamsUpdate {
    #[must_use]
    pub const fn f0_up_key(mut self, value: i32) -> Self {
        self.f0_up_key = Some(value);
        self
    }

    #[must_use]
    pub const fn index_rate(mut self, value: f32) -> Self {
        self.index_rate = Some(value);
        self
    }

    #[must_use]
    pub const fn f0_method(mut self, value: F0Method) -> Self {
        self.f0_method = Some(value);
        self
    }
}

/// Metadata about a model loaded by the engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelInfo {
    /// Registry key of the model
    pub name: String,
    /// Path of the model checkpoint
    pub path: PathBuf,
    /// Feature index artifact associated with the model, if any
    pub index: Option<PathBuf>,
    /// Native output sample rate of the model
    pub target_sample_rate: u32,
}

impl ModelInfo {
    /// Sample rate of the audio the engine produces for the given resample rate
    pub const fn output_sample_rate(&self, resample_sr: u32) -> u32 {
        if resample_sr >= MIN_RESAMPLE_RATE {
            resample_sr
        } else {
            self.target_sample_rate
        }
    }
}

/// Arguments of the engine's single-file conversion primitive
///
/// `file_index`, `f0_file` and `file_index2` use `None` where the engine
/// expects an empty path.
#[derive(Debug, Clone, PartialEq)]
pub struct VcSingleRequest {
    pub sid: u32,
    pub input_audio_path: PathBuf,
    pub f0_up_key: i32,
    pub f0_method: F0Method,
    pub file_index: Option<PathBuf>,
    pub index_rate: f32,
    pub filter_radius: u32,
    pub resample_sr: u32,
    pub rms_mix_rate: f32,
    pub protect: f32,
    pub f0_file: Option<PathBuf>,
    pub file_index2: Option<PathBuf>,
}

impl VcSingleRequest {
    /// Build the request for speaker 0 from session parameters
    pub fn from_params(
        input_audio_path: &Path,
        file_index: Option<PathBuf>,
        params: &InferenceParams,
    ) -> Self {
        Self {
            sid: 0,
            input_audio_path: input_audio_path.to_path_buf(),
            f0_up_key: params.f0_up_key,
            f0_method: params.f0_method,
            file_index,
            index_rate: params.index_rate,
            filter_radius: params.filter_radius,
            resample_sr: params.resample_sr,
            rms_mix_rate: params.rms_mix_rate,
            protect: params.protect,
            f0_file: None,
            file_index2: None,
        }
    }
}

/// Result of the conversion primitive
///
/// Engines either hand back the bare waveform or pair it with an
/// informational message. Engines that can observe the rate they rendered
/// at report it; otherwise the model's target rate applies.
#[derive(Debug, Clone, PartialEq)]
pub enum VcOutput {
    /// 16-bit mono PCM samples
    Waveform(Vec<i16>),
    /// Samples plus engine-reported info
    Annotated { info: String, waveform: Vec<i16> },
    /// Samples, info and the sample rate they were rendered at
    Rendered {
        info: String,
        waveform: Vec<i16>,
        sample_rate: u32,
    },
}

impl VcOutput {
    /// Extract the waveform regardless of shape
    pub fn into_waveform(self) -> Vec<i16> {
        self.into_parts().0
    }

    /// Split into the waveform and the reported sample rate, if any
    pub fn into_parts(self) -> (Vec<i16>, Option<u32>) {
        match self {
            Self::Waveform(waveform) | Self::Annotated { waveform, .. } => (waveform, None),
            Self::Rendered {
                waveform,
                sample_rate,
                ..
            } => (waveform, Some(sample_rate)),
        }
    }
}

/// Summary of a completed file conversion
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionReport {
    pub output_path: PathBuf,
    pub sample_rate: u32,
    pub samples: usize,
}

impl ConversionReport {
    /// Duration of the written audio in milliseconds
    pub fn duration_ms(&self) -> u64 {
        if self.sample_rate == 0 {
            return 0;
        }
        (self.samples as u64 * 1000) / u64::from(self.sample_rate)
    }
}
