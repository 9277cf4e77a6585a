//! HTTP server
//!
//! Exposes `GET|HEAD|OPTIONS /stream/{token}` over axum.

mod handler;
pub mod range;

use crate::config::{ServerConfig, StreamConfig};
use crate::error::Result;
use crate::telegram::{MetadataResolver, SenderPool};
use axum::routing::get;
use axum::Router;
use std::sync::Arc;
use tracing::info;

/// State shared by every request
#[derive(Clone)]
pub struct AppState {
    /// Maps message references to documents
    pub resolver: Arc<dyn MetadataResolver>,
    /// Senders per data center
    pub pool: Arc<SenderPool>,
    /// Chunking, caching and body settings
    pub config: Arc<StreamConfig>,
}

impl AppState {
    pub fn new(
        resolver: Arc<dyn MetadataResolver>,
        pool: Arc<SenderPool>,
        config: StreamConfig,
    ) -> Self {
        AppState {
            resolver,
            pool,
            config: Arc::new(config),
        }
    }
}

/// Build the router
pub fn router(state: AppState) -> Router {
    Router::new()
        .route(
            "/stream/:token",
            get(handler::stream_media)
                .head(handler::stream_media)
                .options(handler::preflight),
        )
        .with_state(state)
}

/// Listen on the configured address until Ctrl-C
pub async fn serve(config: &ServerConfig, state: AppState) -> Result<()> {
    let addr = format!("{}:{}", config.bind_address, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Server listening on {}", addr);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_err() {
        // No signal handler available; run until the process is killed.
        std::future::pending::<()>().await;
    }
}
