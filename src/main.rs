//! Main entry point for the Posterbox REST server.
//!
//! Resolves configuration from the environment once at startup, loads the
//! persisted poster catalogue, wires the media uploader, and serves the
//! REST API. Backup and restore are run separately via the `posterbox` CLI.
//!
//! # Environment Variables
//! - `POSTERBOX_ADDR`: server address (default: "0.0.0.0:3000")
//! - `POSTER_FILE`: persisted catalogue path (default: "poster.json")
//! - `CLOUDINARY_NAME` / `CLOUDINARY_KEY` / `CLOUDINARY_SECRET`: media host
//!   credentials (required)
//! - `CLOUDINARY_ENDPOINT`: media host API endpoint override (optional)
//! - `UPLOAD_FOLDER`: media host folder hint (default: "letterboxd-posters")

use api_rest::AppState;
use posterbox_core::constants::DEFAULT_POSTER_FILE;
use posterbox_core::{CatalogStore, CoreConfig};
use posterbox_uploader::{CloudinaryUploader, UploaderConfig};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Starts the Posterbox REST server on the configured address.
///
/// # Errors
/// Returns an error if:
/// - the logging/tracing configuration cannot be initialised,
/// - the media host credentials are missing or invalid,
/// - the server address cannot be bound, or
/// - the HTTP server fails while running.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("posterbox=info".parse()?)
                .add_directive("api_rest=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let addr = std::env::var("POSTERBOX_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".into());

    tracing::info!("++ Starting Posterbox REST on {}", addr);

    let poster_file =
        std::env::var("POSTER_FILE").unwrap_or_else(|_| DEFAULT_POSTER_FILE.into());
    let core = Arc::new(CoreConfig::new(PathBuf::from(poster_file))?);
    let store = Arc::new(CatalogStore::load(core));

    let uploader_cfg = uploader_config_from_env()?;
    let uploader = Arc::new(CloudinaryUploader::new(uploader_cfg));
    let upload_folder =
        std::env::var("UPLOAD_FOLDER").unwrap_or_else(|_| "letterboxd-posters".into());

    let app = api_rest::router(AppState {
        store,
        uploader,
        upload_folder,
    });

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn uploader_config_from_env() -> anyhow::Result<UploaderConfig> {
    let cloud_name = std::env::var("CLOUDINARY_NAME").unwrap_or_default();
    let api_key = std::env::var("CLOUDINARY_KEY").unwrap_or_default();
    let api_secret = std::env::var("CLOUDINARY_SECRET").unwrap_or_default();

    let mut cfg = UploaderConfig::new(cloud_name, api_key, api_secret)?;
    if let Ok(endpoint) = std::env::var("CLOUDINARY_ENDPOINT") {
        cfg = cfg.with_endpoint(endpoint);
    }
    Ok(cfg)
}
