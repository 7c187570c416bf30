//! HTTP server
//!
//! Builds the router and runs it to completion:
//! - OAuth sign-in flow (/api/auth/*)
//! - Search Console endpoints, streaming and batch (/api/search-console/*)

use crate::error::{AppError, Result};
use crate::http::handlers;
use crate::state::AppState;
use axum::routing::{get, post};
use axum::Router;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

/// Build the application router
pub fn router(state: Arc<AppState>) -> Router {
    // Allow all origins; the service fronts a local single-page UI
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        .route("/", get(handlers::health_check))
        // OAuth flow
        .route("/api/auth/google", get(handlers::auth_google))
        .route("/api/auth/callback", get(handlers::auth_callback))
        .route("/api/auth/status", get(handlers::auth_status))
        .route("/api/auth/logout", post(handlers::auth_logout))
        .route("/api/test-credentials", post(handlers::test_credentials))
        // Search Console
        .route("/api/search-console/sites", get(handlers::list_sites))
        .route("/api/search-console/search", post(handlers::search))
        .route("/api/search-console/search/batch", post(handlers::search_batch))
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

/// Bind and serve until a shutdown signal arrives
pub async fn serve(state: Arc<AppState>) -> Result<()> {
    let addr: SocketAddr = format!("{}:{}", state.config.host, state.config.port)
        .parse()
        .map_err(|e| AppError::Config(format!("Invalid address: {}", e)))?;

    let app = router(state.clone());

    info!("Starting Rankscope API server on {}", addr);
    info!("  GET  {}/api/auth/google", state.config.base_url);
    info!("  GET  {}/api/auth/status", state.config.base_url);
    info!("  GET  {}/api/search-console/sites", state.config.base_url);
    info!("  POST {}/api/search-console/search", state.config.base_url);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    info!("Shutdown signal received");
}
