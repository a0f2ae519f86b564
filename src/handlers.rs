use crate::{
    AppState,
    auth::{Credentials, CurrentIdentity},
    models::{GuardDecision, Identity, NavigationEntry, PageView, RouteSpec},
    navigation,
    policy::{self, default_dashboard},
    session::{Resolution, SessionResolver},
};
use axum::{
    Extension, Json,
    extract::{Query, State},
    http::{StatusCode, Uri},
};
use serde::Deserialize;

// --- Query Structs ---

/// NavigationQuery
///
/// The page the navigation is drawn for. Defaults to the caller's dashboard.
#[derive(Deserialize, utoipa::IntoParams)]
pub struct NavigationQuery {
    pub path: Option<String>,
}

/// GuardQuery
///
/// The path a client is about to navigate to.
#[derive(Deserialize, utoipa::IntoParams)]
pub struct GuardQuery {
    pub path: String,
}

// --- Handlers ---

/// login_page
///
/// [Public Route] Landing page every unauthenticated or deactivated visitor is sent to.
/// The actual sign-in form belongs to the front end.
#[utoipa::path(
    get,
    path = "/auth",
    responses((status = 200, description = "Login landing"))
)]
pub async fn login_page() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "page": "auth",
        "message": "Sign in to continue",
    }))
}

/// render_page
///
/// [Guarded Page] Only reached once the page guard rendered the request, which also
/// attached the resolved `Identity`.
pub async fn render_page(Extension(identity): Extension<Identity>, uri: Uri) -> Json<PageView> {
    let path = uri.path().to_string();
    Json(PageView {
        navigation: navigation::entries(identity.role, &path),
        path,
        identity,
    })
}

/// get_me
///
/// [Authenticated Route] The caller's identity as the guard sees it.
#[utoipa::path(
    get,
    path = "/api/me",
    responses(
        (status = 200, description = "Current identity", body = Identity),
        (status = 401, description = "Not signed in or deactivated")
    )
)]
pub async fn get_me(CurrentIdentity(identity): CurrentIdentity) -> Json<Identity> {
    Json(identity)
}

/// get_navigation
///
/// [Authenticated Route] Sidebar entries for the caller's role, with the entry for
/// `path` marked active.
#[utoipa::path(
    get,
    path = "/api/navigation",
    params(NavigationQuery),
    responses(
        (status = 200, description = "Navigation entries", body = [NavigationEntry]),
        (status = 401, description = "Not signed in or deactivated")
    )
)]
pub async fn get_navigation(
    CurrentIdentity(identity): CurrentIdentity,
    Query(query): Query<NavigationQuery>,
) -> Json<Vec<NavigationEntry>> {
    let path = query
        .path
        .unwrap_or_else(|| default_dashboard(identity.role).to_string());
    Json(navigation::entries(identity.role, &path))
}

/// get_guard_decision
///
/// [Public Route] Evaluates a prospective client-side navigation without performing it.
/// Anonymous callers get a redirect decision, not a 401: the answer itself is the
/// guard's verdict.
#[utoipa::path(
    get,
    path = "/api/guard",
    params(GuardQuery),
    responses(
        (status = 200, description = "Decision for the path", body = GuardDecision),
        (status = 404, description = "No page is registered for the path")
    )
)]
pub async fn get_guard_decision(
    State(state): State<AppState>,
    credentials: Credentials,
    Query(query): Query<GuardQuery>,
) -> Result<Json<GuardDecision>, StatusCode> {
    let spec = state
        .routes
        .find(&query.path)
        .cloned()
        .ok_or(StatusCode::NOT_FOUND)?;

    let mut session = SessionResolver::spawn(state.identity.clone(), credentials);
    let resolution = tokio::time::timeout(state.config.session_settle_timeout(), session.settled())
        .await
        .unwrap_or_else(|_| Resolution::pending());

    Ok(Json(policy::decide(
        &query.path,
        spec.required_role,
        &resolution,
    )))
}

/// get_routes
///
/// [Public Route] The registered page table, so the front end can build its router from
/// the same declarations the server enforces.
#[utoipa::path(
    get,
    path = "/api/routes",
    responses((status = 200, description = "Registered pages", body = [RouteSpec]))
)]
pub async fn get_routes(State(state): State<AppState>) -> Json<Vec<RouteSpec>> {
    Json(state.routes.specs().to_vec())
}
