use crate::{AppState, handlers};
use axum::{Router, routing::post};

/// Student Router Module
///
/// Self-service endpoints restricted to the 'student' role. Everything under
/// /me is scoped to the caller's own tenant/user taken from validated claims;
/// the request body cannot widen that scope.
pub fn student_routes() -> Router<AppState> {
    Router::new()
        // POST /me/grades/period
        // Lists the caller's own grades for one academic term, in the store's
        // sort-key order.
        .route("/me/grades/period", post(handlers::list_grades_by_period))
}
