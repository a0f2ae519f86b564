use axum::{
    Json, Router,
    extract::{FromRef, MatchedPath, Request, State},
    http::{HeaderName, StatusCode, header},
    middleware::{self, Next},
    response::{IntoResponse, Redirect, Response},
};
use std::sync::Arc;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

// Access core: identity, policy, guard, navigation.
pub mod auth;
pub mod error;
pub mod guard;
pub mod models;
pub mod navigation;
pub mod policy;
pub mod route_table;
pub mod session;

// Application services and wiring.
pub mod config;
pub mod handlers;
pub mod repository;

// Module for routing segregation (Public, API, Pages).
pub mod routes;
use routes::{api, pages, public};

use auth::{Credentials, IdentityState};
use guard::{GuardOutcome, RequestNavigator, RouteGuard};
use models::{Identity, LoadingView};
use policy::AUTH_PATH;
use session::SessionResolver;

// --- Public Re-exports ---

pub use config::AppConfig;
pub use repository::{InMemoryRepository, PostgresRepository, RepositoryState};
pub use route_table::RouteTable;

/// ApiDoc
///
/// Aggregates the documented API paths and wire schemas into the OpenAPI document served
/// at `/api-docs/openapi.json`. Guarded pages are generated from the route table and are
/// listed by `/api/routes` instead.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::login_page, handlers::get_me, handlers::get_navigation,
        handlers::get_guard_decision, handlers::get_routes
    ),
    components(
        schemas(
            models::Role, models::Identity, models::RouteSpec, models::GuardDecision,
            models::NavigationEntry, models::PageView, models::LoadingView,
        )
    ),
    tags(
        (name = "estate-portal", description = "Estate Portal access guard API")
    )
)]
struct ApiDoc;

/// RouteTableState
///
/// The validated page table, shared read-only.
pub type RouteTableState = Arc<RouteTable>;

/// AppState
///
/// The single, immutable container shared by every request: where identities come from,
/// which pages exist, and the loaded configuration.
#[derive(Clone)]
pub struct AppState {
    /// The external auth/session collaborator.
    pub identity: IdentityState,
    /// Declared pages. Must have passed `RouteTable::validate`.
    pub routes: RouteTableState,
    pub config: AppConfig,
}

// --- Axum FromRef Extractor Implementations ---

impl FromRef<AppState> for IdentityState {
    fn from_ref(app_state: &AppState) -> IdentityState {
        app_state.identity.clone()
    }
}

impl FromRef<AppState> for RouteTableState {
    fn from_ref(app_state: &AppState) -> RouteTableState {
        app_state.routes.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

/// page_guard
///
/// Runs the Route Guard for every page route.
///
/// *Mechanism*: the matched pattern selects the `RouteSpec`; the session check is started
/// from the request's credentials and awaited up to the configured settle timeout.
/// - Rendered: the resolved `Identity` is attached as an extension and the page handler runs.
/// - Redirected: `303 See Other`; the page handler never runs.
/// - Loading: `202 Accepted` with `Retry-After`, the page handler never runs.
async fn page_guard(
    State(state): State<AppState>,
    matched: MatchedPath,
    credentials: Credentials,
    mut request: Request,
    next: Next,
) -> Response {
    let Some(spec) = state.routes.get(matched.as_str()).cloned() else {
        tracing::error!(pattern = matched.as_str(), "page registered without a declaration");
        return Redirect::to(AUTH_PATH).into_response();
    };

    let guard = RouteGuard::new(RequestNavigator::new(request.uri().path()))
        .with_settle_timeout(state.config.session_settle_timeout());
    // The guard owns the only resolver; when it gives up waiting, dropping it cancels the
    // background check instead of leaving it attached to a stalled backend.
    let session = SessionResolver::spawn(state.identity.clone(), credentials);

    match guard.guard(&spec, session, Identity::clone).await {
        GuardOutcome::Rendered(identity) => {
            request.extensions_mut().insert(identity);
            next.run(request).await
        }
        GuardOutcome::Redirected(target) => Redirect::to(&target).into_response(),
        GuardOutcome::Loading | GuardOutcome::Discarded => loading_response(),
    }
}

fn loading_response() -> Response {
    let view = LoadingView::default();
    (
        StatusCode::ACCEPTED,
        [(header::RETRY_AFTER, view.retry_after_secs.to_string())],
        Json(view),
    )
        .into_response()
}

/// create_router
///
/// Assembles the routing structure, applies global and scoped middleware, and registers
/// the application state.
pub fn create_router(state: AppState) -> Router {
    // 1. CORS Configuration
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    // Header name constant for Request Correlation.
    let x_request_id = HeaderName::from_static("x-request-id");

    // 2. Base Router Assembly
    let base_router = Router::new()
        // Documentation: Serve the auto-generated Swagger UI.
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        // Public Routes: No middleware applied.
        .merge(public::public_routes())
        // API Routes: each handler resolves the caller via `CurrentIdentity`.
        .merge(api::api_routes())
        // Pages: every declared page sits behind the page guard.
        .merge(
            pages::page_routes(&state.routes).route_layer(middleware::from_fn_with_state(
                state.clone(),
                page_guard,
            )),
        )
        .with_state(state);

    // 3. Observability and Correlation Layers (Applied outermost/first)
    base_router
        .layer(
            ServiceBuilder::new()
                // 3a. Request ID Generation: every incoming request gets a UUID, so a
                // redirect or a 202 can be traced back to the session check behind it.
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                // 3b. Request Tracing: wraps the request/response lifecycle in a span built
                // by `trace_span_logger`, which carries the generated request ID.
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                // 3c. Request ID Propagation: echoes x-request-id back to the client.
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        // 4. CORS Layer (Applied last, allowing all traffic in/out after processing)
        .layer(cors)
}

/// trace_span_logger
///
/// Builds the per-request span with method, URI and the `x-request-id` so every log line
/// of one request can be correlated.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}
