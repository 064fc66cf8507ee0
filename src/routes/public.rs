use crate::AppState;
use axum::{Router, routing::get};

/// Public Router Module
///
/// The only unauthenticated surface of the service.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        // Used by monitoring and load balancer checks. Returns "ok" immediately
        // to verify the service is running and responsive.
        .route("/health", get(|| async { "ok" }))
}
