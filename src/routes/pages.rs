use crate::{AppState, handlers, route_table::RouteTable};
use axum::{Router, routing::get};

/// Guarded Page Router Module
///
/// Registers every declared page. The caller must wrap the result in the page guard
/// (`route_layer`), which looks the matched pattern up in the same table.
pub fn page_routes(table: &RouteTable) -> Router<AppState> {
    table
        .specs()
        .iter()
        .fold(Router::new(), |router, spec| {
            router.route(&spec.path, get(handlers::render_page))
        })
}
