//! HTTP route handlers for the stamping service.
//!
//! All API routes answer with JSON; failures use the `{"error": ...}` shape
//! from [`crate::helpers::ApiError`].

mod health;
mod stamp;

pub use health::health;
pub use stamp::{method_not_allowed, stamp};

use std::sync::Arc;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Largest accepted request body. Stamp requests carry URLs and small
/// field maps, never document bytes.
pub const MAX_BODY_BYTES: usize = 1024 * 1024;

/// Build the application router.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/stamp", post(stamp).fallback(method_not_allowed))
        .route("/health", get(health))
        // Middleware
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
