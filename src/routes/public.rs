use crate::{AppState, handlers};
use axum::{Router, routing::get};

/// Public Router Module
///
/// Endpoints that need no session. `/auth` must stay here: it is the target of every
/// fail-closed redirect, so guarding it would loop.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        // Liveness check for load balancers.
        .route("/health", get(|| async { "ok" }))
        // GET /auth
        // Login landing page.
        .route("/auth", get(handlers::login_page))
        // GET /api/guard?path=...
        // Decision preview for client-side navigation. Anonymous callers receive a
        // redirect decision rather than a 401.
        .route("/api/guard", get(handlers::get_guard_decision))
        // GET /api/routes
        // The declared page table.
        .route("/api/routes", get(handlers::get_routes))
}
