//! HTTP relay in front of the generation backend.
//!
//! Exposes the subset of the backend API a dashboard needs, translating
//! backend failures into `503` responses and answering generate requests
//! with a mock project when the backend is down.

pub mod handlers;
pub mod models;

use axum::{
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use crate::client::GeneratorClient;

/// Shared state of the relay handlers.
#[derive(Debug, Clone)]
pub struct RelayState {
    pub client: GeneratorClient,
}

/// Address the relay listens on.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    pub host: String,
    pub port: u16,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
        }
    }
}

/// Create the relay router
pub fn create_router(client: GeneratorClient) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/generate", post(handlers::generate))
        .route("/api/status/:id", get(handlers::status))
        .route("/api/files", get(handlers::files))
        .layer(cors)
        .with_state(RelayState { client })
}

/// Start the relay server
pub async fn start_server(client: GeneratorClient, config: &RelayConfig) -> anyhow::Result<()> {
    let backend = client.endpoint().to_string();
    let router = create_router(client);
    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, %backend, "relay listening");

    axum::serve(listener, router).await?;

    Ok(())
}
