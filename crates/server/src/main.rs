//! Civic tracker server entry point.

use std::sync::Arc;

use axum::{extract::DefaultBodyLimit, middleware};
use civic_api::{
    middleware::{AppState, auth_middleware},
    router as api_router,
};
use civic_common::{Config, LocalStorage, config::LogFormat};
use civic_core::StorageService;
use tokio::signal;
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use url::Url;

/// Waits for a shutdown signal (SIGINT or SIGTERM).
///
/// On Unix systems, this listens for both SIGINT (Ctrl+C) and SIGTERM.
/// On Windows, this only listens for Ctrl+C.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received SIGINT, initiating graceful shutdown...");
        },
        () = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown...");
        },
    }
}

fn init_tracing(format: LogFormat) {
    let json = format == LogFormat::Json;

    tracing_subscriber::registry()
        .with(json.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!json).then(|| tracing_subscriber::fmt::layer()))
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "civic=debug,tower_http=debug".into()),
        )
        .init();
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Configuration decides the log format, so it loads first
    let config = Config::load()?;
    init_tracing(config.logging.format);

    let public_url = Url::parse(&config.server.url)?;
    info!(url = %public_url, "Starting civic tracker server...");

    let db = civic_db::init(&config).await?;
    info!("Connected to database");

    civic_db::migrate(&db).await?;
    info!("Migrations completed");

    let storage: StorageService = Arc::new(LocalStorage::from_settings(&config.storage));
    tokio::fs::create_dir_all(&config.storage.path).await?;
    info!(path = %config.storage.path.display(), "Photo storage ready");

    let state = AppState::new(Arc::new(db), storage);

    let mut app = api_router()
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
        .layer(DefaultBodyLimit::max(config.server.max_body_bytes))
        .with_state(state);

    // A relative public URL means photos are served by this process
    let mount = config.storage.public_url.trim_end_matches('/');
    if mount.starts_with('/') {
        app = app.nest_service(mount, ServeDir::new(&config.storage.path));
    }

    let app = app.layer(TraceLayer::new_for_http()).layer(
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any),
    );

    let listener =
        tokio::net::TcpListener::bind((config.server.host.as_str(), config.server.port)).await?;
    info!(addr = %listener.local_addr()?, "Listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}
