use serde::{Deserialize, Serialize};
use serde_json::Value;
use ts_rs::TS;
use utoipa::ToSchema;

// --- Identity & Claims ---

/// Role
///
/// The closed set of authorization levels the identity service can assign.
/// Extracted from a validated credential and trusted for the remainder of the
/// request. Policies are fixed per operation, never configurable at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Teacher,
    Student,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Admin => write!(f, "admin"),
            Role::Teacher => write!(f, "teacher"),
            Role::Student => write!(f, "student"),
        }
    }
}

/// TokenClaims
///
/// The resolved identity of an authenticated request, produced once per request
/// by the token validator and consumed within the same request only. Never
/// persisted. For the student self-service listing this is the ONLY source of
/// tenant/user identity; request-supplied identifiers are ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenClaims {
    pub user_id: String,
    pub tenant_id: String,
    pub role: Role,
}

// --- Request Payloads (Input Schemas) ---

// Required fields are modeled as Option so that an absent field becomes a 400
// with our `{"error": ...}` body instead of a serde rejection.

/// CreateGradeRequest
///
/// Input payload for registering (or overwriting) a grade (POST /grades).
/// `grade` accepts a JSON number or string score; anything else is rejected.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct CreateGradeRequest {
    pub tenant_id: Option<String>,
    pub user_id: Option<String>,
    pub periodo: Option<String>,
    pub curso_id: Option<String>,
    #[ts(type = "number | string | null")]
    #[schema(value_type = Option<Object>)]
    pub grade: Option<Value>,
}

/// GradeKeyRequest
///
/// Input payload for the exact-key operations: lookup (POST /grades/lookup)
/// and delete (POST /grades/delete).
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct GradeKeyRequest {
    pub tenant_id: Option<String>,
    pub user_id: Option<String>,
    pub periodo: Option<String>,
    pub curso_id: Option<String>,
}

/// PeriodRequest
///
/// Input payload for the student self-service listing (POST /me/grades/period).
/// Deliberately carries nothing but the academic term: the student's own
/// tenant/user scope comes from the validated claims.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct PeriodRequest {
    pub periodo: Option<String>,
}

// --- Response Schemas (Output) ---

/// MessageResponse
///
/// Plain confirmation body for create and delete.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct MessageResponse {
    pub message: String,
}

/// GradeResponse
///
/// Output of a single-grade lookup. Exactly these two fields; the stored item
/// is never returned whole.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct GradeResponse {
    #[ts(type = "number | string")]
    #[schema(value_type = Object)]
    pub grade: Value,
    pub registered_by: String,
}

/// PeriodGrade
///
/// One entry of a period listing: the course extracted from the record's sort
/// key, paired with the stored score.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct PeriodGrade {
    pub curso_id: String,
    #[ts(type = "number | string")]
    #[schema(value_type = Object)]
    pub grade: Value,
}

/// PeriodGradesResponse
///
/// Output of the student self-service listing. Entries follow the store's
/// natural sort-key order (lexicographic on the encoded sort key).
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct PeriodGradesResponse {
    pub notas: Vec<PeriodGrade>,
}

// --- Store Rows (Internal Use) ---

/// StoredGrade
///
/// Raw shape handed back by the store for reads. Carries the encoded sort key
/// so period listings can decode `curso_id` out of it.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredGrade {
    pub sort_key: String,
    pub grade: Value,
    pub registered_by: String,
}
