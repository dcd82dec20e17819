//! Axum server setup and router configuration.

use crate::state::AppState;
use axum::{Json, Router, extract::State, response::IntoResponse, routing::get};
use pmon_core::processors::MetricsSnapshot;
use serde::Serialize;
use std::future::Future;
use std::net::SocketAddr;
use tokio::net::TcpListener;

/// Build the main application router.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        // Health check endpoint
        .route("/health", get(health_check))
        // Latest pipeline metrics
        .route("/metrics", get(metrics))
        // Add state to all routes
        .with_state(state)
}

/// Health check response.
#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
    queue_size: usize,
    processing: bool,
    pending_retries: usize,
}

/// Returns OK while the server is running, with a glance at the queue.
async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        queue_size: state.pipeline.size().await,
        processing: state.pipeline.is_processing(),
        pending_retries: state.pipeline.pending_retries(),
    })
}

/// The most recent snapshot published on the metrics interval.
async fn metrics(State(state): State<AppState>) -> Json<MetricsSnapshot> {
    Json(state.metrics.borrow().clone())
}

/// Run the server until `shutdown` resolves.
pub async fn run_server(
    router: Router,
    addr: SocketAddr,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<(), std::io::Error> {
    let listener = TcpListener::bind(addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown)
        .await
}
