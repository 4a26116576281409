//! Router and server loop

use std::future::Future;
use std::net::SocketAddr;

use anyhow::{Context, Result};
use axum::{
    routing::{get, post},
    Router,
};
use studio_core::NovelGenerator;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;

use crate::handlers;

/// Shared request state
#[derive(Clone, Debug)]
pub struct AppState {
    /// Generation pipeline over the configured backend
    pub generator: NovelGenerator,
}

impl AppState {
    /// State over a generator
    pub fn new(generator: NovelGenerator) -> Self {
        Self { generator }
    }
}

/// Create the API router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/api/generate-structure", post(handlers::generate_structure))
        .route("/api/generate-outline", post(handlers::generate_outline))
        .route("/api/generate-chapter", post(handlers::generate_chapter))
        .route("/health", get(handlers::health))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Serve until `shutdown` resolves
///
/// In-flight requests, including open chapter streams, are allowed to finish.
///
/// # Errors
///
/// Returns an error if the address cannot be bound or the server fails.
pub async fn run_server<F>(state: AppState, addr: SocketAddr, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!(addr = %listener.local_addr()?, "Listening");

    axum::serve(listener, create_router(state))
        .with_graceful_shutdown(shutdown)
        .await
        .context("Server error")?;

    Ok(())
}
