use gradebook_api::{
    AppState, create_router,
    config::{AppConfig, Env},
    identity::{HttpTokenValidator, IdentityState},
    storage::{DynamoGradeStore, StoreState},
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// main
///
/// The asynchronous entry point, responsible for initializing all core
/// components: configuration, logging, the store client, the identity client,
/// and the HTTP server.
#[tokio::main]
async fn main() {
    // 1. Configuration & Environment Loading (fail-fast)
    dotenv::dotenv().ok();
    let config = AppConfig::load();

    // 2. Logging Filter Setup
    // RUST_LOG wins; otherwise sensible defaults for local development.
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "gradebook_api=debug,tower_http=info,axum=trace".into());

    // 3. Initialize Logging based on Environment
    match config.env {
        Env::Local => {
            // LOCAL: pretty output for human readability.
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
        Env::Production => {
            // PROD: JSON output for ingestion by centralized log aggregators.
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
    }

    tracing::info!("Application starting in {:?} mode", config.env);

    // 4. Store Initialization (DynamoDB)
    // The long-lived client is built once and shared across all requests.
    let dynamo = DynamoGradeStore::new(&config);

    // LOCAL-ONLY: provision the grades and users tables against
    // dynamodb-local. Development convenience for the Dockerized setup.
    if config.env == Env::Local {
        dynamo.ensure_tables_exist().await;
    }

    let store = Arc::new(dynamo) as StoreState;

    // 5. Identity Initialization (remote token validator)
    let identity = Arc::new(HttpTokenValidator::new(&config.identity_url)) as IdentityState;

    // 6. Unified State Assembly
    let app_state = AppState {
        store,
        identity,
        config,
    };

    // 7. Router and Server Startup
    let app = create_router(app_state);

    let listener = TcpListener::bind("0.0.0.0:3000").await.unwrap();

    tracing::info!("HTTP server bound successfully.");
    tracing::info!("Listening on 0.0.0.0:3000");
    tracing::info!("API Documentation (Swagger UI) available at: http://localhost:3000/swagger-ui");

    axum::serve(listener, app).await.unwrap();
}
