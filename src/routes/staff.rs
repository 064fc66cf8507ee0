use crate::{AppState, handlers};
use axum::{Router, routing::post};

/// Staff Router Module
///
/// Grade management endpoints restricted to the 'teacher' and 'admin' roles,
/// all addressing a caller-supplied (tenant, student, periodo, curso) target.
/// The endpoints are RPC-shaped (one route per operation, parameters in the
/// JSON body), mirroring the one-function-per-operation model this service
/// replaces.
pub fn staff_routes() -> Router<AppState> {
    Router::new()
        // POST /grades
        // Registers (or overwrites) a grade for an enrolled student.
        .route("/grades", post(handlers::create_grade))
        // POST /grades/lookup
        // Exact-key lookup; returns only {grade, registered_by}.
        .route("/grades/lookup", post(handlers::get_grade))
        // POST /grades/delete
        // Idempotent delete by exact key.
        .route("/grades/delete", post(handlers::delete_grade))
}
