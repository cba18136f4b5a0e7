// HTTP surface
// JSON endpoints over the analyzer, wrapped in {success, data} envelopes

mod error;
mod handlers;

pub use error::{status_from_error, ApiError};

use axum::{routing::get, Router};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::analysis::MarketAnalyzer;

pub struct AppState {
    pub analyzer: Arc<MarketAnalyzer>,
    /// Used when a request carries no bearer token of its own
    pub default_token: Option<String>,
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/api/market/market-data", get(handlers::market_data))
        .route("/api/analyze", get(handlers::quick_analyze))
        .route("/api/market/session", get(handlers::session))
        .route("/api/market/signals", get(handlers::signals))
        .fallback(handlers::not_found)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(Arc::new(state))
}

/// Bind and serve until Ctrl+C
pub async fn serve(bind: &str, state: AppState) -> crate::Result<()> {
    let listener = tokio::net::TcpListener::bind(bind).await?;
    tracing::info!("🌐 Listening on http://{}", listener.local_addr()?);

    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("Failed to listen for shutdown signal: {}", e);
            }
            tracing::info!("Shutting down HTTP server");
        })
        .await?;

    Ok(())
}
