use axum::{
    Json, Router,
    http::{HeaderMap, StatusCode, header},
    routing::get,
};
use estate_portal::{
    AppConfig, AppState, RouteTable,
    auth::{Credentials, IdentityProvider, RestIdentityProvider},
    create_router,
    error::GuardError,
    guard::{GuardOutcome, RequestNavigator, RouteGuard},
    models::{GuardDecision, Identity, PageView, Role, RouteSpec},
    session::SessionResolver,
};
use std::{sync::Arc, time::Duration};
use tokio::{
    io::AsyncReadExt,
    net::TcpListener,
    sync::oneshot,
    time::{Instant, timeout},
};
use uuid::Uuid;

const LANDLORD_TOKEN: &str = "landlord-token";
const DORMANT_TOKEN: &str = "dormant-token";
const BROKEN_TOKEN: &str = "broken-token";
const LANDLORD_ID: Uuid = Uuid::from_u128(42);

/// Stand-in for the REST backend that owns sessions.
async fn fake_auth_me(headers: HeaderMap) -> Result<Json<Identity>, StatusCode> {
    let token = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "));

    match token {
        Some(LANDLORD_TOKEN) => Ok(Json(Identity {
            id: LANDLORD_ID,
            role: Role::Landlord,
            is_active: true,
        })),
        Some(DORMANT_TOKEN) => Ok(Json(Identity {
            id: Uuid::from_u128(43),
            role: Role::Landlord,
            is_active: false,
        })),
        Some(BROKEN_TOKEN) => Err(StatusCode::INTERNAL_SERVER_ERROR),
        _ => Err(StatusCode::UNAUTHORIZED),
    }
}

async fn serve(router: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind port");
    let port = listener.local_addr().unwrap().port();

    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    format!("http://127.0.0.1:{}", port)
}

async fn spawn_backend() -> String {
    serve(Router::new().route("/auth/me", get(fake_auth_me))).await
}

/// A backend that accepts one connection, reads the request and never answers. The
/// receiver fires once the client side closes the connection.
async fn spawn_silent_backend() -> (String, oneshot::Receiver<()>) {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind port");
    let port = listener.local_addr().unwrap().port();
    let (closed_tx, closed_rx) = oneshot::channel();

    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut buf = [0u8; 1024];
        loop {
            match socket.read(&mut buf).await {
                Ok(0) | Err(_) => break,
                Ok(_) => continue,
            }
        }
        let _ = closed_tx.send(());
    });

    (format!("http://127.0.0.1:{}", port), closed_rx)
}

fn rest_provider(backend: impl Into<String>, request_timeout: Duration) -> RestIdentityProvider {
    RestIdentityProvider::new(backend, request_timeout).expect("Failed to build HTTP client")
}

async fn spawn_app(backend: &str) -> String {
    let config = AppConfig::default();
    let state = AppState {
        identity: Arc::new(rest_provider(backend, config.identity_timeout())),
        routes: Arc::new(RouteTable::standard()),
        config,
    };
    serve(create_router(state)).await
}

fn client() -> reqwest::Client {
    // Redirects are part of what is under test.
    reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .unwrap()
}

// --- RestIdentityProvider ---

#[tokio::test]
async fn test_rest_provider_resolves_identity() {
    let backend = spawn_backend().await;
    let provider = rest_provider(format!("{backend}/"), Duration::from_secs(5));

    let identity = provider
        .current_identity(&Credentials::bearer(LANDLORD_TOKEN))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(identity.id, LANDLORD_ID);
    assert_eq!(identity.role, Role::Landlord);
}

#[tokio::test]
async fn test_rest_provider_maps_statuses() {
    let backend = spawn_backend().await;
    let provider = rest_provider(backend, Duration::from_secs(5));

    assert_eq!(
        provider.current_identity(&Credentials::bearer("nobody")).await,
        Ok(None)
    );
    assert_eq!(provider.current_identity(&Credentials::default()).await, Ok(None));

    let error = provider
        .current_identity(&Credentials::bearer(BROKEN_TOKEN))
        .await
        .unwrap_err();
    assert!(!error.is_fatal());
}

#[tokio::test]
async fn test_rest_provider_unreachable_backend() {
    // Nothing listens on port 9 (discard) in the test environment.
    let provider = rest_provider("http://127.0.0.1:9", Duration::from_secs(5));
    assert!(
        provider
            .current_identity(&Credentials::bearer(LANDLORD_TOKEN))
            .await
            .is_err()
    );
}

#[tokio::test]
async fn test_rest_provider_times_out_on_silent_backend() {
    let (backend, _closed) = spawn_silent_backend().await;
    let provider = rest_provider(backend, Duration::from_millis(200));

    let started = Instant::now();
    let result = provider
        .current_identity(&Credentials::bearer(LANDLORD_TOKEN))
        .await;

    assert!(matches!(result, Err(GuardError::SessionCheckFailed(_))));
    assert!(started.elapsed() < Duration::from_secs(5));
}

#[tokio::test]
async fn test_abandoned_session_check_releases_backend_connection() {
    let (backend, closed) = spawn_silent_backend().await;
    // The request timeout is far longer than the test waits: only cancellation can close
    // the connection in time.
    let provider = Arc::new(rest_provider(backend, Duration::from_secs(60)));

    let guard = RouteGuard::new(RequestNavigator::new("/landlord/dashboard"))
        .with_settle_timeout(Duration::from_millis(50));
    let session = SessionResolver::spawn(provider, Credentials::bearer(LANDLORD_TOKEN));
    let spec = RouteSpec::new("/landlord/dashboard", Some(Role::Landlord));

    let outcome = guard.guard(&spec, session, Identity::clone).await;
    assert_eq!(outcome, GuardOutcome::Loading);

    assert!(
        timeout(Duration::from_secs(5), closed).await.is_ok(),
        "session check still holds the backend connection after the loading answer"
    );
}

#[tokio::test]
async fn test_api_me_is_unauthorized_when_backend_stalls() {
    let (backend, _closed) = spawn_silent_backend().await;
    let config = AppConfig {
        identity_timeout_ms: 200,
        ..AppConfig::default()
    };
    let state = AppState {
        identity: Arc::new(rest_provider(backend, config.identity_timeout())),
        routes: Arc::new(RouteTable::standard()),
        config,
    };
    let app = serve(create_router(state)).await;

    let response = timeout(
        Duration::from_secs(5),
        client()
            .get(format!("{}/api/me", app))
            .bearer_auth(LANDLORD_TOKEN)
            .send(),
    )
    .await
    .expect("/api/me hung on a silent identity backend")
    .unwrap();
    assert_eq!(response.status(), 401);
}

// --- Full Stack over HTTP ---

#[tokio::test]
async fn test_health_check() {
    let app = spawn_app(&spawn_backend().await).await;
    let response = client()
        .get(format!("{}/health", app))
        .send()
        .await
        .expect("req fail");
    assert!(response.status().is_success());
}

#[tokio::test]
async fn test_page_lifecycle_against_remote_backend() {
    let app = spawn_app(&spawn_backend().await).await;
    let client = client();

    // Own dashboard renders.
    let response = client
        .get(format!("{}/landlord/dashboard", app))
        .bearer_auth(LANDLORD_TOKEN)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    assert!(response.headers().contains_key("x-request-id"));
    let page: PageView = response.json().await.unwrap();
    assert_eq!(page.identity.id, LANDLORD_ID);

    // Someone else's dashboard sends the landlord home.
    let response = client
        .get(format!("{}/tenant/dashboard", app))
        .bearer_auth(LANDLORD_TOKEN)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 303);
    assert_eq!(response.headers()["location"], "/landlord/dashboard");

    // A deactivated account goes to login.
    let response = client
        .get(format!("{}/landlord/dashboard", app))
        .bearer_auth(DORMANT_TOKEN)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 303);
    assert_eq!(response.headers()["location"], "/auth");

    // A failing backend collapses to login as well.
    let response = client
        .get(format!("{}/landlord/dashboard", app))
        .bearer_auth(BROKEN_TOKEN)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 303);
    assert_eq!(response.headers()["location"], "/auth");
}

#[tokio::test]
async fn test_guard_preview_over_http() {
    let app = spawn_app(&spawn_backend().await).await;
    let decision: GuardDecision = client()
        .get(format!("{}/api/guard", app))
        .query(&[("path", "/landlord/properties/17")])
        .bearer_auth(LANDLORD_TOKEN)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(decision, GuardDecision::Render);
}

#[tokio::test]
async fn test_openapi_document_is_served() {
    let app = spawn_app(&spawn_backend().await).await;
    let doc: serde_json::Value = client()
        .get(format!("{}/api-docs/openapi.json", app))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(doc["paths"]["/api/guard"].is_object());
}
