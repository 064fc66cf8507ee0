use axum::{Router, extract::FromRef, http::HeaderName};
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

// Core application services and components.
pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod identity;
pub mod keys;
pub mod models;
pub mod storage;

// Module for routing segregation (Public, Staff, Student).
pub mod routes;
use routes::{public, staff, student};

// --- Public Re-exports ---

// Makes core state types easily accessible to the application entry point
// (main.rs) and to the integration tests.
pub use config::AppConfig;
pub use error::ApiError;
pub use identity::{HttpTokenValidator, IdentityState, TokenValidator};
pub use storage::{DynamoGradeStore, GradeStore, MemoryGradeStore, StoreState};

/// ApiDoc
///
/// Auto-generates the OpenAPI documentation (Swagger JSON) from the handlers
/// and schemas decorated with the utoipa macros. Served at
/// `/api-docs/openapi.json`.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::create_grade,
        handlers::get_grade,
        handlers::delete_grade,
        handlers::list_grades_by_period
    ),
    components(
        schemas(
            models::CreateGradeRequest,
            models::GradeKeyRequest,
            models::PeriodRequest,
            models::MessageResponse,
            models::GradeResponse,
            models::PeriodGrade,
            models::PeriodGradesResponse,
        )
    ),
    tags(
        (name = "gradebook", description = "Multi-tenant grade records API")
    )
)]
struct ApiDoc;

/// AppState
///
/// The single, thread-safe, immutable container holding all shared services
/// and configuration. Both remote clients are acquired once per process and
/// reused across requests; nothing else is shared between invocations.
#[derive(Clone)]
pub struct AppState {
    /// Store Layer: the partitioned key-value store behind the GradeStore port.
    pub store: StoreState,
    /// Identity Layer: the remote token validator behind the TokenValidator port.
    pub identity: IdentityState,
    /// Configuration: the loaded, immutable environment configuration.
    pub config: AppConfig,
}

// --- Axum FromRef Extractor Implementations ---

// Allow handlers and extractors to selectively pull components from the shared
// AppState.

impl FromRef<AppState> for StoreState {
    fn from_ref(app_state: &AppState) -> StoreState {
        app_state.store.clone()
    }
}

impl FromRef<AppState> for IdentityState {
    fn from_ref(app_state: &AppState) -> IdentityState {
        app_state.identity.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

/// create_router
///
/// Assembles the routing structure, applies the observability layers, and
/// registers the application state. Authentication and role checks live in
/// the handlers themselves (via the `TokenClaims` extractor and `authorize`),
/// so every grade route is protected uniformly regardless of which module it
/// sits in.
pub fn create_router(state: AppState) -> Router {
    // 1. CORS Configuration
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    // Header name constant for request correlation.
    let x_request_id = HeaderName::from_static("x-request-id");

    // 2. Base Router Assembly
    let base_router = Router::new()
        // Documentation: serve the auto-generated Swagger UI.
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        // Public plumbing (health probe).
        .merge(public::public_routes())
        // Teacher/admin grade management.
        .merge(staff::staff_routes())
        // Student self-service, under /me.
        .merge(student::student_routes())
        // Apply the unified state to all routes.
        .with_state(state);

    // 3. Observability and Correlation Layers (applied outermost)
    base_router
        .layer(
            ServiceBuilder::new()
                // 3a. Request ID generation: a unique UUID per incoming request.
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                // 3b. Request tracing: wraps the request/response lifecycle in
                // a span correlated by the generated request id.
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                // 3c. Request ID propagation back to the client.
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        // 4. CORS layer.
        .layer(cors)
}

/// trace_span_logger
///
/// Customizes the tracing span creation for `TraceLayer`: includes the
/// `x-request-id` header in the structured metadata so every log line for one
/// request is correlated by a unique id.
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
