//! Integration tests for HTTP handlers
#![allow(clippy::expect_used)]

use std::{
    collections::BTreeMap,
    io::Cursor,
    path::Path,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
};

use async_trait::async_trait;
use axum::http::StatusCode;
use axum_test::{
    TestServer,
    multipart::{MultipartForm, Part},
};
use infrastructure::AppConfig;
use presentation_http::{
    handlers::health::{HealthResponse, ReadinessResponse, STATUS_RUNNING},
    routes::create_router,
    state::AppState,
};
use serde_json::Value;
use tempfile::TempDir;
use voice_conversion::{
    ModelDownloader, ModelInfo, VcOutput, VcSingleRequest, VoiceCloneError, VoiceConversionEngine,
};

const MODEL_RATE: u32 = 40_000;
const OUTPUT_SAMPLES: usize = 20_000;

/// Mock engine that returns a fixed-length sawtooth waveform
struct MockEngine {
    available: bool,
    fail_with: Option<String>,
    conversions: AtomicUsize,
    last_request: std::sync::Mutex<Option<VcSingleRequest>>,
}

impl MockEngine {
    fn new() -> Self {
        Self {
            available: true,
            fail_with: None,
            conversions: AtomicUsize::new(0),
            last_request: std::sync::Mutex::new(None),
        }
    }

    fn failing(message: &str) -> Self {
        Self {
            fail_with: Some(message.to_string()),
            ..Self::new()
        }
    }

    fn unavailable() -> Self {
        Self {
            available: false,
            ..Self::new()
        }
    }
}

#[async_trait]
impl VoiceConversionEngine for MockEngine {
    async fn load_model(&self, model_path: &Path) -> Result<ModelInfo, VoiceCloneError> {
        if !model_path.exists() {
            return Err(VoiceCloneError::InvalidModel(format!(
                "Model file not found: {}",
                model_path.display()
            )));
        }
        Ok(ModelInfo {
            name: model_path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default(),
            path: model_path.to_path_buf(),
            index: None,
            target_sample_rate: MODEL_RATE,
        })
    }

    async fn vc_single(
        &self,
        _model: &ModelInfo,
        request: &VcSingleRequest,
    ) -> Result<VcOutput, VoiceCloneError> {
        *self.last_request.lock().expect("lock") = Some(request.clone());
        self.conversions.fetch_add(1, Ordering::SeqCst);
        if let Some(message) = &self.fail_with {
            return Err(VoiceCloneError::InferenceFailed(message.clone()));
        }
        let waveform = (0..OUTPUT_SAMPLES)
            .map(|i| i16::try_from(i % 1000).expect("fits") - 500)
            .collect();
        Ok(VcOutput::Annotated {
            info: "Success".to_string(),
            waveform,
        })
    }

    async fn is_available(&self) -> bool {
        self.available
    }

    fn name(&self) -> &str {
        "mock-rvc"
    }
}

/// Mock downloader that writes a placeholder checkpoint and counts calls
#[derive(Default)]
struct CountingDownloader {
    calls: AtomicUsize,
    fail_with: Option<String>,
}

impl CountingDownloader {
    fn failing(message: &str) -> Self {
        Self {
            fail_with: Some(message.to_string()),
            ..Self::default()
        }
    }
}

#[async_trait]
impl ModelDownloader for CountingDownloader {
    async fn download(&self, file_id: &str, destination: &Path) -> Result<(), VoiceCloneError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(message) = &self.fail_with {
            return Err(VoiceCloneError::DownloadFailed(message.clone()));
        }
        tokio::fs::write(destination, format!("checkpoint {file_id}")).await?;
        Ok(())
    }
}

struct Harness {
    server: TestServer,
    engine: Arc<MockEngine>,
    downloader: Arc<CountingDownloader>,
    dir: TempDir,
}

fn harness(engine: MockEngine) -> Harness {
    harness_with(engine, CountingDownloader::default())
}

fn harness_with(engine: MockEngine, downloader: CountingDownloader) -> Harness {
    let dir = TempDir::new().expect("tempdir");

    let mut config = AppConfig::default();
    config.storage.upload_dir = dir.path().join("uploads");
    config.storage.model_dir = dir.path().join("models");
    std::fs::create_dir_all(&config.storage.upload_dir).expect("upload dir");
    config.voice_conversion.models.sources = BTreeMap::from([
        ("alice".to_string(), "1AliceDriveId".to_string()),
        ("bob".to_string(), "1BobDriveId".to_string()),
    ]);

    let engine = Arc::new(engine);
    let downloader = Arc::new(downloader);
    let state = AppState::from_config(&config, engine.clone(), downloader.clone());
    let server = TestServer::new(create_router(state)).expect("Failed to create test server");

    Harness {
        server,
        engine,
        downloader,
        dir,
    }
}

fn audio_part() -> Part {
    Part::bytes(b"RIFF....WAVEfmt ".to_vec())
        .file_name("input.wav")
        .mime_type("audio/wav")
}

fn model_part() -> Part {
    Part::bytes(b"fake checkpoint".to_vec())
        .file_name("voice.pth")
        .mime_type("application/octet-stream")
}

fn read_wav(bytes: &[u8]) -> (hound::WavSpec, usize) {
    let reader = hound::WavReader::new(Cursor::new(bytes.to_vec())).expect("valid wav");
    let spec = reader.spec();
    let len = reader.len() as usize;
    (spec, len)
}

// ============================================================================
// Health
// ============================================================================

#[tokio::test]
async fn health_reports_running_and_models() {
    let h = harness(MockEngine::new());

    let response = h.server.get("/").await;

    response.assert_status_ok();
    let body: HealthResponse = response.json();
    assert_eq!(body.status, STATUS_RUNNING);
    assert_eq!(body.available_models, vec!["alice", "bob"]);
}

#[tokio::test]
async fn health_does_not_touch_engine_or_store() {
    let h = harness(MockEngine::new());

    h.server.get("/").await.assert_status_ok();

    assert_eq!(h.engine.conversions.load(Ordering::SeqCst), 0);
    assert_eq!(h.downloader.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn readiness_ok_when_engine_available() {
    let h = harness(MockEngine::new());

    let response = h.server.get("/ready").await;

    response.assert_status_ok();
    let body: ReadinessResponse = response.json();
    assert!(body.ready);
    assert_eq!(body.engine.name, "mock-rvc");
}

#[tokio::test]
async fn readiness_unavailable_when_engine_missing() {
    let h = harness(MockEngine::unavailable());

    let response = h.server.get("/ready").await;

    response.assert_status(StatusCode::SERVICE_UNAVAILABLE);
    let body: ReadinessResponse = response.json();
    assert!(!body.ready);
    assert!(!body.engine.available);
}

// ============================================================================
// Clone: validation
// ============================================================================

#[tokio::test]
async fn clone_without_audio_is_bad_request() {
    let h = harness(MockEngine::new());
    let form = MultipartForm::new().add_text("model_name", "alice");

    let response = h.server.post("/clone").multipart(form).await;

    response.assert_status_bad_request();
    let body: Value = response.json();
    assert_eq!(body["code"], "bad_request");
    assert_eq!(h.engine.conversions.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn clone_without_model_or_name_is_bad_request() {
    let h = harness(MockEngine::new());
    let form = MultipartForm::new().add_part("audio", audio_part());

    let response = h.server.post("/clone").multipart(form).await;

    response.assert_status_bad_request();
    let body: Value = response.json();
    assert!(body["error"].as_str().expect("message").contains("model"));
}

#[tokio::test]
async fn clone_with_unknown_name_is_not_found_without_download() {
    let h = harness(MockEngine::new());
    let form = MultipartForm::new()
        .add_part("audio", audio_part())
        .add_text("model_name", "carol");

    let response = h.server.post("/clone").multipart(form).await;

    response.assert_status_not_found();
    let body: Value = response.json();
    assert_eq!(body["code"], "not_found");
    assert!(body["error"].as_str().expect("message").contains("carol"));
    assert_eq!(h.downloader.calls.load(Ordering::SeqCst), 0);
    assert_eq!(h.engine.conversions.load(Ordering::SeqCst), 0);
}

// ============================================================================
// Clone: conversion
// ============================================================================

#[tokio::test]
async fn clone_with_uploaded_model_returns_wav() {
    let h = harness(MockEngine::new());
    let form = MultipartForm::new()
        .add_part("audio", audio_part())
        .add_part("model", model_part());

    let response = h.server.post("/clone").multipart(form).await;

    response.assert_status_ok();
    assert_eq!(response.header("content-type"), "audio/wav");

    let (spec, samples) = read_wav(response.as_bytes());
    assert_eq!(spec.channels, 1);
    assert_eq!(spec.bits_per_sample, 16);
    assert_eq!(spec.sample_rate, MODEL_RATE);
    assert_eq!(samples, OUTPUT_SAMPLES);

    // Uploaded models are used as-is, never fetched
    assert_eq!(h.downloader.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn clone_applies_fixed_overrides() {
    let h = harness(MockEngine::new());
    let form = MultipartForm::new()
        .add_part("audio", audio_part())
        .add_part("model", model_part());

    h.server
        .post("/clone")
        .multipart(form)
        .await
        .assert_status_ok();

    let request = h
        .engine
        .last_request
        .lock()
        .expect("lock")
        .clone()
        .expect("engine was called");
    assert_eq!(request.sid, 0);
    assert_eq!(request.f0_up_key, 0);
    assert!((request.index_rate - 0.75).abs() < f32::EPSILON);
    assert!(request.input_audio_path.starts_with(h.dir.path().join("uploads")));
}

#[tokio::test]
async fn clone_with_named_model_downloads_once() {
    let h = harness(MockEngine::new());

    for _ in 0..2 {
        let form = MultipartForm::new()
            .add_part("audio", audio_part())
            .add_text("model_name", "alice");
        h.server
            .post("/clone")
            .multipart(form)
            .await
            .assert_status_ok();
    }

    assert_eq!(h.downloader.calls.load(Ordering::SeqCst), 1);
    assert_eq!(h.engine.conversions.load(Ordering::SeqCst), 2);
    assert!(h.dir.path().join("models").join("alice.pth").exists());
}

#[tokio::test]
async fn uploaded_model_wins_over_name() {
    let h = harness(MockEngine::new());
    let form = MultipartForm::new()
        .add_part("audio", audio_part())
        .add_part("model", model_part())
        .add_text("model_name", "alice");

    h.server
        .post("/clone")
        .multipart(form)
        .await
        .assert_status_ok();

    assert_eq!(h.downloader.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn engine_failure_is_internal_error_with_message() {
    let h = harness(MockEngine::failing("CUDA out of memory"));
    let form = MultipartForm::new()
        .add_part("audio", audio_part())
        .add_part("model", model_part());

    let response = h.server.post("/clone").multipart(form).await;

    response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = response.json();
    assert_eq!(body["code"], "internal_error");
    assert!(
        body["error"]
            .as_str()
            .expect("message")
            .contains("CUDA out of memory")
    );
}

#[tokio::test]
async fn download_failure_is_internal_error_with_message() {
    let h = harness_with(
        MockEngine::new(),
        CountingDownloader::failing("File 1AliceDriveId returned HTTP 404 Not Found"),
    );
    let form = MultipartForm::new()
        .add_part("audio", audio_part())
        .add_text("model_name", "alice");

    let response = h.server.post("/clone").multipart(form).await;

    response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = response.json();
    assert_eq!(body["code"], "internal_error");
    let message = body["error"].as_str().expect("message");
    assert!(message.contains("Download failed"));
    assert!(message.contains("HTTP 404"));
    assert_eq!(h.downloader.calls.load(Ordering::SeqCst), 1);
    assert_eq!(h.engine.conversions.load(Ordering::SeqCst), 0);
    assert!(!h.dir.path().join("models").join("alice.pth").exists());
}

#[tokio::test]
async fn staged_files_use_unique_names() {
    let h = harness(MockEngine::new());

    for _ in 0..2 {
        let form = MultipartForm::new()
            .add_part("audio", audio_part())
            .add_part("model", model_part());
        h.server
            .post("/clone")
            .multipart(form)
            .await
            .assert_status_ok();
    }

    let staged = std::fs::read_dir(h.dir.path().join("uploads"))
        .expect("upload dir exists")
        .count();
    // input, model and output per request
    assert_eq!(staged, 6);
}
