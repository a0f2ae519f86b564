use estate_portal::{
    AppState,
    auth::{IdentityState, JwtIdentityProvider, RestIdentityProvider},
    config::{AppConfig, Env, IdentitySource},
    create_router,
    repository::{PostgresRepository, RepositoryState},
    route_table::RouteTable,
};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// main
///
/// Entry point: configuration, logging, route table validation, identity source, and the
/// HTTP server.
#[tokio::main]
async fn main() {
    // 1. Configuration & Environment Loading (Fail-Fast)
    // Loads .env file settings before configuration can be read.
    dotenv::dotenv().ok();
    // AppConfig::load() panics on anything production cannot run without.
    let config = AppConfig::load();

    // 2. Logging Filter Setup
    // RUST_LOG wins when set; otherwise our own crate logs at debug.
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "estate_portal=debug,tower_http=info,axum=trace".into());

    // 3. Initialize Logging based on Environment
    match config.env {
        Env::Local => {
            // LOCAL: pretty output for reading guard decisions in a terminal.
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
        Env::Production => {
            // PROD: one JSON object per line for the log aggregator.
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
    }

    tracing::info!("Application starting in {:?} mode", config.env);

    // 4. Route Table Validation
    // A role without a served dashboard would leave wrong-role visitors nowhere to go.
    let routes = RouteTable::standard();
    if let Err(error) = routes.validate() {
        tracing::error!(%error, "FATAL: route table is invalid");
        std::process::exit(1);
    }
    tracing::info!(pages = routes.specs().len(), "route table validated");

    // 5. Identity Source
    // Either tokens are validated here against the profile table, or the remote backend
    // is asked who the caller is. Both are bounded by IDENTITY_TIMEOUT_MS.
    let identity: IdentityState = match &config.identity_source {
        IdentitySource::Database { url } => {
            let pool = PgPoolOptions::new()
                .max_connections(5)
                .acquire_timeout(config.identity_timeout())
                .connect(url)
                .await
                .expect("FATAL: Failed to connect to Postgres. Check DATABASE_URL.");
            let repo = Arc::new(PostgresRepository::new(pool)) as RepositoryState;
            Arc::new(JwtIdentityProvider::new(repo, config.clone()))
        }
        IdentitySource::Remote { base_url } => {
            tracing::info!(%base_url, "using remote identity backend");
            let provider = RestIdentityProvider::new(base_url.clone(), config.identity_timeout())
                .expect("FATAL: Failed to build the identity backend HTTP client.");
            Arc::new(provider)
        }
    };

    // 6. Unified State Assembly
    // Bundles the identity source, the validated pages and the config into AppState.
    let bind_addr = config.bind_addr.clone();
    let app_state = AppState {
        identity,
        routes: Arc::new(routes),
        config,
    };

    // 7. Router and Server Startup
    let app = create_router(app_state);

    let listener = TcpListener::bind(&bind_addr)
        .await
        .expect("FATAL: Failed to bind the HTTP listener. Check BIND_ADDR.");

    tracing::info!("Listening on {}", bind_addr);
    tracing::info!("API Documentation (Swagger UI) available at /swagger-ui");

    if let Err(error) = axum::serve(listener, app).await {
        tracing::error!(%error, "server terminated");
    }
}
