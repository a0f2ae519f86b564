use crate::{AppState, handlers};
use axum::{Router, routing::get};

/// Authenticated API Router Module
///
/// Every handler here takes a `CurrentIdentity`, which rejects anonymous and deactivated
/// callers with 401 before the handler runs.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        // GET /api/me
        .route("/api/me", get(handlers::get_me))
        // GET /api/navigation?path=...
        // Sidebar for the caller's role.
        .route("/api/navigation", get(handlers::get_navigation))
}
