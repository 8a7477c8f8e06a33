//! Per-request inference session
//!
//! An `InferenceSession` owns the loaded-model registry and the conversion
//! parameters for one request. Its [`InferenceSession::convert_file`] adapter
//! drives the engine's `vc_single` primitive with an explicit argument set and
//! writes the result as a WAV file.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use hound::{SampleFormat, WavSpec, WavWriter};
use tracing::{debug, info, instrument};

use crate::error::VoiceCloneError;
use crate::ports::VoiceConversionEngine;
use crate::types::{ConversionReport, InferenceParams, ModelInfo, ParamsUpdate, VcSingleRequest};

/// Voice conversion session bound to a model
pub struct InferenceSession {
    engine: Arc<dyn VoiceConversionEngine>,
    params: InferenceParams,
    models: HashMap<String, ModelInfo>,
    current_model: Option<String>,
}

impl std::fmt::Debug for InferenceSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InferenceSession")
            .field("engine", &self.engine.name())
            .field("params", &self.params)
            .field("models", &self.models)
            .field("current_model", &self.current_model)
            .finish()
    }
}

impl InferenceSession {
    /// Create a session with no model loaded
    pub fn new(engine: Arc<dyn VoiceConversionEngine>, params: InferenceParams) -> Self {
        Self {
            engine,
            params,
            models: HashMap::new(),
            current_model: None,
        }
    }

    /// Create a session and load `model_path` as the current model
    pub async fn with_model(
        engine: Arc<dyn VoiceConversionEngine>,
        params: InferenceParams,
        model_path: &Path,
    ) -> Result<Self, VoiceCloneError> {
        let mut session = Self::new(engine, params);
        session.load_model(model_path).await?;
        Ok(session)
    }

    /// Load a model and make it current
    #[instrument(skip(self), fields(engine = self.engine.name()))]
    pub async fn load_model(&mut self, model_path: &Path) -> Result<&ModelInfo, VoiceCloneError> {
        let info = self.engine.load_model(model_path).await?;
        debug!(
            model = %info.name,
            index = ?info.index,
            target_sample_rate = info.target_sample_rate,
            "Model loaded"
        );
        let name = info.name.clone();
        self.models.insert(name.clone(), info);
        self.current_model = Some(name.clone());
        self.models
            .get(&name)
            .ok_or(VoiceCloneError::ModelNotLoaded)
    }

    /// Update conversion parameters
    ///
    /// The update is rejected as a whole if the result is out of range.
    pub fn set_params(&mut self, update: &ParamsUpdate) -> Result<(), VoiceCloneError> {
        let mut next = self.params.clone();
        next.apply(update);
        next.validate()?;
        self.params = next;
        Ok(())
    }

    pub const fn params(&self) -> &InferenceParams {
        &self.params
    }

    /// Name of the current model
    pub fn current_model(&self) -> Option<&str> {
        self.current_model.as_deref()
    }

    /// Loaded-model registry
    pub const fn models(&self) -> &HashMap<String, ModelInfo> {
        &self.models
    }

    fn current(&self) -> Result<&ModelInfo, VoiceCloneError> {
        self.current_model
            .as_ref()
            .and_then(|name| self.models.get(name))
            .ok_or(VoiceCloneError::ModelNotLoaded)
    }

    /// Sample rate the session writes output at
    pub fn target_sample_rate(&self) -> Result<u32, VoiceCloneError> {
        Ok(self.current()?.output_sample_rate(self.params.resample_sr))
    }

    /// Convert `input_path` with the current model and write a WAV to `output_path`
    ///
    /// # Errors
    ///
    /// Returns `VoiceCloneError::ModelNotLoaded` if no model is loaded, or the
    /// engine's error if conversion fails.
    #[instrument(skip(self), fields(model = ?self.current_model))]
    pub async fn convert_file(
        &self,
        input_path: &Path,
        output_path: &Path,
    ) -> Result<ConversionReport, VoiceCloneError> {
        let model = self.current()?;
        let request = VcSingleRequest::from_params(input_path, model.index.clone(), &self.params);

        let output = self.engine.vc_single(model, &request).await?;
        let (waveform, rendered_rate) = output.into_parts();
        if waveform.is_empty() {
            return Err(VoiceCloneError::InferenceFailed(
                "Engine produced an empty waveform".to_string(),
            ));
        }

        // A rate measured by the engine beats the model's declared one
        let sample_rate = match rendered_rate {
            Some(rate) => rate,
            None => self.target_sample_rate()?,
        };
        let samples = waveform.len();
        let path = output_path.to_path_buf();
        tokio::task::spawn_blocking(move || write_wav(&path, sample_rate, &waveform))
            .await
            .map_err(|e| VoiceCloneError::AudioProcessing(format!("WAV writer task failed: {e}")))??;

        info!(
            output = %output_path.display(),
            sample_rate,
            samples,
            "Voice conversion complete"
        );

        Ok(ConversionReport {
            output_path: output_path.to_path_buf(),
            sample_rate,
            samples,
        })
    }
}

/// Write 16-bit mono PCM
fn write_wav(path: &Path, sample_rate: u32, waveform: &[i16]) -> Result<(), VoiceCloneError> {
    let spec = WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };
    let mut writer = WavWriter::create(path, spec)?;
    for &sample in waveform {
        writer.write_sample(sample)?;
    }
    writer.finalize()?;
    Ok(())
}
