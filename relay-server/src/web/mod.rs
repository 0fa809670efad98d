//! Web server module.
//!
//! This module provides the relay's HTTP surface:
//! - A static root page and a health check
//! - Webhook registration with TableCheck
//! - The webhook receiver TableCheck delivers callbacks to

pub mod envelope;
pub mod handlers;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

pub use envelope::Envelope;
pub use handlers::{
    health, register_webhook, root, webhook_receiver, AppState, HealthResponse, SERVICE_BANNER,
};

/// Build the application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/api/register-webhook", post(register_webhook))
        .route("/api/webhook-receiver", post(webhook_receiver))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
