//! Voice clone HTTP server
//!
//! Main entry point for the HTTP API server.

use std::{sync::Arc, time::Duration};

use axum::http::HeaderName;
use infrastructure::{AppConfig, LogFormat, ensure_dir, init_logging};
use presentation_http::{AppState, routes};
use tokio::{net::TcpListener, signal};
use tower::ServiceBuilder;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use tracing::info;
use voice_conversion::{GoogleDriveDownloader, ModelDownloader, RvcCliEngine, VoiceConversionEngine};

const REQUEST_ID_HEADER: &str = "x-request-id";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config = AppConfig::load()?;
    config
        .validate()
        .map_err(|e| anyhow::anyhow!("Invalid configuration: {e}"))?;

    // Initialize tracing
    init_logging(LogFormat::from_setting(&config.server.log_format))?;

    info!("🎙️ voiceclone v{} starting...", env!("CARGO_PKG_VERSION"));
    info!(
        host = %config.server.host,
        port = %config.server.port,
        upload_dir = %config.storage.upload_dir.display(),
        model_dir = %config.storage.model_dir.display(),
        models = config.voice_conversion.models.sources.len(),
        "Configuration loaded"
    );

    let engine = RvcCliEngine::new(config.voice_conversion.engine.clone())
        .map_err(|e| anyhow::anyhow!("Failed to initialize engine: {e}"))?;
    let engine: Arc<dyn VoiceConversionEngine> = Arc::new(engine);
    if !engine.is_available().await {
        tracing::warn!(
            executable = %config.voice_conversion.engine.executable.display(),
            "Voice conversion engine is not runnable; /clone will fail until it is installed"
        );
    }

    let downloader =
        GoogleDriveDownloader::new(config.voice_conversion.models.download_base_url.clone())?;
    let downloader: Arc<dyn ModelDownloader> = Arc::new(downloader);

    let state = AppState::from_config(&config, engine, downloader);

    // Directories must exist before the first request
    state.uploads.ensure().await?;
    ensure_dir(state.model_cache.model_dir()).await?;

    // Request id is set before tracing so spans can carry it
    let request_id = HeaderName::from_static(REQUEST_ID_HEADER);
    let app = routes::create_router(state).layer(
        ServiceBuilder::new()
            .layer(SetRequestIdLayer::new(request_id.clone(), MakeRequestUuid))
            .layer(TraceLayer::new_for_http())
            .layer(PropagateRequestIdLayer::new(request_id)),
    );

    // Start server
    let addr = config.server.bind_addr();
    let listener = TcpListener::bind(&addr).await?;

    info!("🚀 Server listening on http://{}", addr);

    let shutdown_timeout = Duration::from_secs(config.server.shutdown_timeout_secs.unwrap_or(30));

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown_timeout))
        .await?;

    info!("👋 Server shutdown complete");

    Ok(())
}

/// Wait for shutdown signals (SIGINT, SIGTERM)
async fn shutdown_signal(timeout: Duration) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            },
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            },
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("📥 Received Ctrl+C, initiating graceful shutdown...");
        }
        () = terminate => {
            info!("📥 Received SIGTERM, initiating graceful shutdown...");
        }
    }

    info!("⏳ Waiting up to {:?} for connections to close...", timeout);
}
