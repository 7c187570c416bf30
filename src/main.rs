//! Rankscope server binary

use anyhow::Context;
use rankscope::config::Config;
use rankscope::http::server;
use rankscope::state::AppState;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    // Initialize tracing/logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rankscope=debug,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Rankscope...");

    let config = Config::from_env();
    if config.default_credentials().is_none() {
        tracing::warn!(
            "GOOGLE_CLIENT_ID / GOOGLE_CLIENT_SECRET not set; \
             credentials must be supplied per request"
        );
    }

    let state = Arc::new(AppState::new(config));

    server::serve(state).await.context("server error")?;
    Ok(())
}
