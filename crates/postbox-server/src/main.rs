#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

mod api;
mod config;

use anyhow::Context;
use axum::http::{Method, header};
use config::ServerConfig;
use postbox_core::{AppCore, paths};
use std::sync::Arc;
use tower_http::cors::CorsLayer;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing logger
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,postbox_server=debug,postbox_core=debug".into()),
        )
        .with_target(false)
        .with_thread_ids(true)
        .with_line_number(true)
        .init();

    tracing::info!("Starting Postbox server");

    let config = ServerConfig::load()?;
    let db_path = paths::ensure_database_path()
        .context("Failed to determine Postbox database path")?;
    let core = Arc::new(
        AppCore::new(&db_path, config.core_config()).context("Failed to initialize app core")?,
    );

    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);

    let http_app = api::http_router(core.clone()).layer(cors);
    let rpc_app = api::rpc_router(core);

    let http_listener = tokio::net::TcpListener::bind((config.host.as_str(), config.http_port))
        .await
        .with_context(|| format!("Failed to bind HTTP port {}", config.http_port))?;
    let rpc_listener = tokio::net::TcpListener::bind((config.host.as_str(), config.rpc_port))
        .await
        .with_context(|| format!("Failed to bind RPC port {}", config.rpc_port))?;

    tracing::info!("Postbox HTTP running on http://{}:{}", config.host, config.http_port);
    tracing::info!("Postbox RPC running on http://{}:{}/rpc", config.host, config.rpc_port);

    let http_server = async {
        axum::serve(http_listener, http_app)
            .await
            .context("HTTP server failed")
    };
    let rpc_server = async {
        axum::serve(rpc_listener, rpc_app)
            .await
            .context("RPC server failed")
    };

    tokio::try_join!(http_server, rpc_server)?;
    Ok(())
}
