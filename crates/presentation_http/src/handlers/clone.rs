//! Voice cloning handler
//!
//! `POST /clone` takes a multipart form with an `audio` file and either a
//! `model` checkpoint upload or a `model_name` from the configured source
//! table, and answers with the converted WAV.

use axum::{
    extract::{Multipart, State},
    http::header,
    response::{IntoResponse, Response},
};
use bytes::Bytes;
use infrastructure::StagedKind;
use tracing::{info, instrument};
use voice_conversion::InferenceSession;

use crate::{error::ApiError, state::AppState};

/// MIME type of the converted audio
pub const AUDIO_WAV: &str = "audio/wav";

/// Raw multipart fields of a clone request
#[derive(Debug, Default)]
pub struct CloneForm {
    pub audio: Option<Bytes>,
    pub model: Option<Bytes>,
    pub model_name: Option<String>,
}

/// Where the model for a request comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelSelection {
    /// Checkpoint uploaded with the request
    Upload(Bytes),
    /// Name looked up in the source table
    Named(String),
}

impl CloneForm {
    /// Collect the known fields; unknown fields are ignored
    pub async fn read(mut multipart: Multipart) -> Result<Self, ApiError> {
        let mut form = Self::default();

        while let Some(field) = multipart.next_field().await? {
            let name = field.name().unwrap_or_default().to_string();
            match name.as_str() {
                "audio" => form.audio = Some(field.bytes().await?),
                "model" => form.model = Some(field.bytes().await?),
                "model_name" => form.model_name = Some(field.text().await?),
                _ => {},
            }
        }

        Ok(form)
    }

    /// Validate required fields
    ///
    /// Empty parts count as missing. An uploaded model wins over `model_name`.
    pub fn into_parts(self) -> Result<(Bytes, ModelSelection), ApiError> {
        let audio = self
            .audio
            .filter(|b| !b.is_empty())
            .ok_or_else(|| ApiError::BadRequest("Missing audio file".to_string()))?;

        let selection = match (self.model.filter(|b| !b.is_empty()), self.model_name) {
            (Some(model), _) => ModelSelection::Upload(model),
            (None, Some(name)) if !name.trim().is_empty() => {
                ModelSelection::Named(name.trim().to_string())
            },
            _ => {
                return Err(ApiError::BadRequest(
                    "Missing model file or model_name".to_string(),
                ));
            },
        };

        Ok((audio, selection))
    }
}

/// Convert the uploaded audio with the selected model
#[instrument(skip(state, multipart))]
pub async fn clone_voice(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Response, ApiError> {
    let (audio, selection) = CloneForm::read(multipart).await?.into_parts()?;

    if let ModelSelection::Named(name) = &selection
        && !state.model_cache.contains(name)
    {
        return Err(ApiError::NotFound(format!("Unknown model: {name}")));
    }

    let input_path = state.uploads.stage(StagedKind::InputAudio, &audio).await?;

    let model_path = match selection {
        ModelSelection::Upload(model) => state.uploads.stage(StagedKind::Model, &model).await?,
        ModelSelection::Named(name) => state.model_cache.resolve(&name).await?,
    };

    let output_path = state.uploads.unique_path(StagedKind::OutputAudio);

    let mut session = InferenceSession::with_model(
        state.engine.clone(),
        state.session_defaults.clone(),
        &model_path,
    )
    .await?;
    session.set_params(&state.clone_overrides)?;
    let report = session.convert_file(&input_path, &output_path).await?;

    info!(
        model = %model_path.display(),
        output = %report.output_path.display(),
        duration_ms = report.duration_ms(),
        "Clone request complete"
    );

    let body = tokio::fs::read(&report.output_path)
        .await
        .map_err(|e| ApiError::Internal(format!("Failed to read converted audio: {e}")))?;

    Ok(([(header::CONTENT_TYPE, AUDIO_WAV)], body).into_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form(
        audio: Option<&'static str>,
        model: Option<&'static str>,
        name: Option<&str>,
    ) -> CloneForm {
        CloneForm {
            audio: audio.map(|a| Bytes::from_static(a.as_bytes())),
            model: model.map(|m| Bytes::from_static(m.as_bytes())),
            model_name: name.map(str::to_string),
        }
    }

    #[test]
    fn missing_audio_is_bad_request() {
        let err = form(None, Some("w"), None).into_parts().unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(ref m) if m.contains("audio")));
    }

    #[test]
    fn empty_audio_is_bad_request() {
        assert!(form(Some(""), Some("w"), None).into_parts().is_err());
    }

    #[test]
    fn missing_model_and_name_is_bad_request() {
        let err = form(Some("RIFF"), None, None).into_parts().unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(ref m) if m.contains("model")));
    }

    #[test]
    fn blank_model_name_is_bad_request() {
        assert!(form(Some("RIFF"), None, Some("   ")).into_parts().is_err());
    }

    #[test]
    fn uploaded_model_wins_over_name() {
        let (_, selection) = form(Some("RIFF"), Some("w"), Some("alice"))
            .into_parts()
            .unwrap();
        assert_eq!(selection, ModelSelection::Upload(Bytes::from_static(b"w")));
    }

    #[test]
    fn model_name_is_trimmed() {
        let (audio, selection) = form(Some("RIFF"), None, Some(" alice\n"))
            .into_parts()
            .unwrap();
        assert_eq!(audio, Bytes::from_static(b"RIFF"));
        assert_eq!(selection, ModelSelection::Named("alice".to_string()));
    }

    #[test]
    fn empty_model_upload_falls_back_to_name() {
        let (_, selection) = form(Some("RIFF"), Some(""), Some("bob"))
            .into_parts()
            .unwrap();
        assert_eq!(selection, ModelSelection::Named("bob".to_string()));
    }
}
