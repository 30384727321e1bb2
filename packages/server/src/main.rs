use std::sync::Arc;

use anyhow::Context;
use axum::http::{HeaderValue, Method, header};
use cmo_server::config::AppConfig;
use cmo_server::state::AppState;
use cmo_server::upload::{UploadAssembler, run_session_sweeper};
use cmo_server::{database, seed};
use common::storage::filesystem::FilesystemUploadStore;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing::{Level, info};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::load().context("Failed to load configuration")?;

    let level = config.log.level.parse::<Level>().unwrap_or(Level::INFO);
    tracing_subscriber::fmt().with_max_level(level).init();

    let db = database::init_db(&config.database.url)
        .await
        .context("Failed to connect to database")?;
    seed::seed_admin(&db, &config.auth)
        .await
        .context("Failed to seed bootstrap admin")?;

    tokio::fs::create_dir_all(&config.storage.apk_dir)
        .await
        .context("Failed to create APK directory")?;
    let store = Arc::new(
        FilesystemUploadStore::new(config.storage.upload_dir.clone())
            .await
            .context("Failed to open upload store")?,
    );
    let assembler = Arc::new(UploadAssembler::new(
        store.clone(),
        store,
        config.upload.clone(),
        config.storage.upload_dir.join(".assembly"),
    ));

    if let Some(ttl_secs) = config.upload.session_ttl_secs {
        tokio::spawn(run_session_sweeper(
            assembler.clone(),
            ttl_secs,
            config.upload.sweep_interval_secs,
        ));
    }

    let cors = build_cors(&config);
    let addr = format!("{}:{}", config.server.host, config.server.port);

    let state = AppState {
        db,
        config: Arc::new(config),
        assembler,
    };
    let app = cmo_server::build_router(state).layer(cors);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!("Server running at http://{}", addr);
    info!("Swagger UI at http://{}/swagger-ui", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

fn build_cors(config: &AppConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .server
        .cors
        .allow_origins
        .iter()
        .filter_map(|o| o.parse().ok())
        .collect();

    let allow_origin = if origins.is_empty() {
        AllowOrigin::any()
    } else {
        AllowOrigin::list(origins)
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .max_age(std::time::Duration::from_secs(config.server.cors.max_age))
}
