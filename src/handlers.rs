use crate::{
    AppState,
    auth::{STAFF_ROLES, STUDENT_ONLY, authorize},
    error::ApiError,
    keys::{GradeKey, PartitionKey, PeriodPrefix, SortKey},
    models::{
        CreateGradeRequest, GradeKeyRequest, GradeResponse, MessageResponse, PeriodGrade,
        PeriodGradesResponse, PeriodRequest, TokenClaims,
    },
};
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde_json::Value;

// --- Request Shape Validation ---

/// Unwraps a required body field, turning an absent or empty value into a 400
/// with the `{"error": ...}` body. The composite-key constructors then reject
/// separator characters with the same error kind.
fn require(value: Option<String>, field: &'static str) -> Result<String, ApiError> {
    match value {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(ApiError::validation(format!(
            "Missing required field: {field}."
        ))),
    }
}

/// A grade must be present, non-null, and a JSON number or string score.
fn require_grade(value: Option<Value>) -> Result<Value, ApiError> {
    let grade = match value {
        Some(g) if !g.is_null() => g,
        _ => return Err(ApiError::validation("Missing required field: grade.")),
    };
    if grade.is_number() || grade.is_string() {
        Ok(grade)
    } else {
        Err(ApiError::validation(
            "Field grade must be a number or a string.",
        ))
    }
}

fn grade_key_from(payload: GradeKeyRequest) -> Result<GradeKey, ApiError> {
    let tenant_id = require(payload.tenant_id, "tenant_id")?;
    let user_id = require(payload.user_id, "user_id")?;
    let periodo = require(payload.periodo, "periodo")?;
    let curso_id = require(payload.curso_id, "curso_id")?;
    Ok(GradeKey::new(&tenant_id, &user_id, &periodo, &curso_id)?)
}

// --- Handlers ---

/// create_grade
///
/// [Staff Route] Registers a grade for an enrolled student. The write is an
/// unconditional overwrite, so repeating the identical call is idempotent.
/// Targeting a user with no student enrollment record is rejected with 400
/// and writes nothing. `registered_by` is always the caller's own id from the
/// validated claims, never taken from the body.
///
/// Known gap: the enrollment check and the write are not transactional; a
/// concurrent unenrollment between them can let a grade land for a
/// no-longer-valid student.
#[utoipa::path(
    post,
    path = "/grades",
    request_body = CreateGradeRequest,
    responses(
        (status = 201, description = "Grade registered", body = MessageResponse),
        (status = 400, description = "Missing field or unknown student"),
        (status = 403, description = "Caller is not teacher or admin")
    )
)]
pub async fn create_grade(
    claims: TokenClaims,
    State(state): State<AppState>,
    Json(payload): Json<CreateGradeRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let tenant_id = require(payload.tenant_id, "tenant_id")?;
    let user_id = require(payload.user_id, "user_id")?;
    let periodo = require(payload.periodo, "periodo")?;
    let curso_id = require(payload.curso_id, "curso_id")?;
    let grade = require_grade(payload.grade)?;

    authorize(
        &claims,
        STAFF_ROLES,
        "Only teachers or administrators can register grades.",
    )?;

    let key = GradeKey::new(&tenant_id, &user_id, &periodo, &curso_id)?;

    if !state.store.student_exists(&key.partition).await? {
        return Err(ApiError::validation(format!(
            "No student enrollment found for {}.",
            key.partition.as_str()
        )));
    }

    state.store.put_grade(&key, &grade, &claims.user_id).await?;

    tracing::info!(
        partition = key.partition.as_str(),
        sort = key.sort.as_str(),
        registered_by = %claims.user_id,
        "grade registered",
    );

    Ok((
        StatusCode::CREATED,
        Json(MessageResponse {
            message: "Grade registered successfully.".to_string(),
        }),
    ))
}

/// get_grade
///
/// [Staff Route] Exact-key lookup of one grade. Returns only the score and
/// who registered it, never the full stored item.
#[utoipa::path(
    post,
    path = "/grades/lookup",
    request_body = GradeKeyRequest,
    responses(
        (status = 200, description = "Grade found", body = GradeResponse),
        (status = 404, description = "No grade for the given key"),
        (status = 403, description = "Caller is not teacher or admin")
    )
)]
pub async fn get_grade(
    claims: TokenClaims,
    State(state): State<AppState>,
    Json(payload): Json<GradeKeyRequest>,
) -> Result<Json<GradeResponse>, ApiError> {
    let key = grade_key_from(payload)?;

    authorize(
        &claims,
        STAFF_ROLES,
        "You do not have permission to look up grades.",
    )?;

    match state.store.get_grade(&key.partition, &key.sort).await? {
        Some(stored) => Ok(Json(GradeResponse {
            grade: stored.grade,
            registered_by: stored.registered_by,
        })),
        None => Err(ApiError::not_found(
            "No grade found for the given criteria.",
        )),
    }
}

/// delete_grade
///
/// [Staff Route] Unconditional delete by exact key. No prior existence check:
/// deleting a key that was never written still reports success.
#[utoipa::path(
    post,
    path = "/grades/delete",
    request_body = GradeKeyRequest,
    responses(
        (status = 200, description = "Grade deleted (or was already absent)", body = MessageResponse),
        (status = 403, description = "Caller is not teacher or admin")
    )
)]
pub async fn delete_grade(
    claims: TokenClaims,
    State(state): State<AppState>,
    Json(payload): Json<GradeKeyRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    let key = grade_key_from(payload)?;

    authorize(
        &claims,
        STAFF_ROLES,
        "You do not have permission to delete grades.",
    )?;

    state.store.delete_grade(&key.partition, &key.sort).await?;

    Ok(Json(MessageResponse {
        message: "Grade deleted successfully.".to_string(),
    }))
}

/// list_grades_by_period
///
/// [Student Route] Self-service listing of the caller's own grades for one
/// academic term. The partition is built exclusively from the validated
/// claims; any identity fields a client smuggles into the body are ignored by
/// the request schema. Entries keep the store's sort-key order.
#[utoipa::path(
    post,
    path = "/me/grades/period",
    request_body = PeriodRequest,
    responses(
        (status = 200, description = "Grades for the period", body = PeriodGradesResponse),
        (status = 404, description = "No grades for the period"),
        (status = 403, description = "Caller is not a student")
    )
)]
pub async fn list_grades_by_period(
    claims: TokenClaims,
    State(state): State<AppState>,
    Json(payload): Json<PeriodRequest>,
) -> Result<Json<PeriodGradesResponse>, ApiError> {
    let periodo = require(payload.periodo, "periodo")?;

    authorize(
        &claims,
        STUDENT_ONLY,
        "Only students can list their own grades for a period.",
    )?;

    let partition = PartitionKey::new(&claims.tenant_id, &claims.user_id)?;
    let prefix = PeriodPrefix::new(&periodo)?;

    let stored = state.store.grades_for_period(&partition, &prefix).await?;

    if stored.is_empty() {
        return Err(ApiError::not_found(
            "No grades found for the requested period.",
        ));
    }

    let notas = stored
        .into_iter()
        .filter_map(|item| match SortKey::decode(&item.sort_key) {
            Some((_, curso_id)) => Some(PeriodGrade {
                curso_id: curso_id.to_string(),
                grade: item.grade,
            }),
            None => {
                // Can only happen for items written outside this service.
                tracing::warn!(sort_key = %item.sort_key, "skipping grade with malformed sort key");
                None
            }
        })
        .collect();

    Ok(Json(PeriodGradesResponse { notas }))
}
