mod routes;
mod controllers;
mod services;
mod models;
mod api_docs;
mod shared_state;
mod config;
mod errors;

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Context;
use axum::{Router, routing::get, response::Html};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;
use utoipa::OpenApi;
use utoipa_scalar::Scalar;

use crate::api_docs::ApiDoc;
use crate::config::{Config, LogFormat, LoggingConfig};
use crate::routes::api_routes::api_routes;
use crate::services::narrative::Narrator;
use crate::shared_state::AppState;

fn init_logging(cfg: &LoggingConfig) {
    // RUST_LOG wins over the configured level
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&cfg.level));
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(false);
    match cfg.format {
        LogFormat::Compact => builder.compact().init(),
        LogFormat::Pretty => builder.pretty().init(),
        LogFormat::Json => builder.json().init(),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Load configuration
    let config_path = std::env::var("ADVISOR_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("config.json"));
    let config = Config::load(&config_path)
        .with_context(|| format!("failed to load {}", config_path.display()))?;
    init_logging(&config.logging);
    tracing::info!(
        event_name = "system.config.loaded",
        path = %config_path.display(),
        file_found = config_path.exists(),
        subsidy_rules = config.subsidies.rules.len(),
        known_sites = config.locations.sites.len(),
        "configuration loaded"
    );

    // 2. Narrative collaborator (probed once, optional)
    let narrator = Narrator::from_config(&config.narrative).await;

    // 3. Shared state
    let state = AppState::new(&config, narrator);

    // 4. Axum HTTP server
    let app = Router::new()
        .nest("/api", api_routes(state))
        .route("/scalar", get(|| async {
            Html(Scalar::new(ApiDoc::openapi()).to_html())
        }))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let ip = config.server.host.parse::<std::net::IpAddr>()
        .with_context(|| format!("invalid server.host `{}`", config.server.host))?;
    let addr = SocketAddr::new(ip, config.server.port);
    tracing::info!(event_name = "system.server.started", %addr, "API server listening on http://{addr}");
    tracing::info!("Scalar UI: http://{addr}/scalar");

    axum_server::bind(addr)
        .serve(app.into_make_service())
        .await
        .context("HTTP server terminated")?;

    Ok(())
}
