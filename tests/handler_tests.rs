use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
};
use gradebook_api::{
    AppConfig, AppState, create_router,
    error::ApiError,
    identity::{IdentityState, TokenValidator},
    keys::{GradeKey, PartitionKey},
    models::{Role, TokenClaims},
    storage::{GradeStore, MemoryGradeStore, StoreState},
};
use serde_json::{Value, json};
use std::sync::Arc;
use tower::util::ServiceExt;

struct StubValidator;

fn claims(tenant_id: &str, user_id: &str, role: Role) -> TokenClaims {
    TokenClaims {
        user_id: user_id.to_string(),
        tenant_id: tenant_id.to_string(),
        role,
    }
}

#[async_trait]
impl TokenValidator for StubValidator {
    async fn validate(&self, token: &str) -> Result<TokenClaims, ApiError> {
        match token {
            "teacher-token" => Ok(claims("T1", "prof-7", Role::Teacher)),
            "admin-token" => Ok(claims("T1", "adm-1", Role::Admin)),
            "s1-token" => Ok(claims("T1", "S1", Role::Student)),
            "s2-token" => Ok(claims("T1", "S2", Role::Student)),
            _ => Err(ApiError::unauthorized("Invalid or expired token.")),
        }
    }
}

fn test_app(store: Arc<MemoryGradeStore>) -> Router {
    let state = AppState {
        store: store as StoreState,
        identity: Arc::new(StubValidator) as IdentityState,
        config: AppConfig::default(),
    };
    create_router(state)
}

fn post_json(uri: &str, token: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .header("authorization", format!("Bearer {token}"))
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn grade_body(tenant: &str, user: &str, periodo: &str, curso: &str) -> Value {
    json!({
        "tenant_id": tenant,
        "user_id": user,
        "periodo": periodo,
        "curso_id": curso,
    })
}

fn create_body(tenant: &str, user: &str, periodo: &str, curso: &str, grade: Value) -> Value {
    let mut body = grade_body(tenant, user, periodo, curso);
    body["grade"] = grade;
    body
}

/// The end-to-end scenario: teacher registers, teacher/admin look up, the
/// student lists their own period, and a lookup for an unknown course is 404.
#[tokio::test]
async fn create_lookup_and_period_listing_flow() {
    let store = Arc::new(MemoryGradeStore::new());
    store.enroll_student(&PartitionKey::new("T1", "S1").unwrap());
    let app = test_app(store);

    // Teacher registers the grade.
    let response = app
        .clone()
        .oneshot(post_json(
            "/grades",
            "teacher-token",
            create_body("T1", "S1", "2024-1", "MATH101", json!(95)),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    // Lookup returns exactly {grade, registered_by} with the creator's id.
    let response = app
        .clone()
        .oneshot(post_json(
            "/grades/lookup",
            "admin-token",
            grade_body("T1", "S1", "2024-1", "MATH101"),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body, json!({ "grade": 95, "registered_by": "prof-7" }));

    // The student sees it in the period listing.
    let response = app
        .clone()
        .oneshot(post_json(
            "/me/grades/period",
            "s1-token",
            json!({ "periodo": "2024-1" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(
        body,
        json!({ "notas": [{ "curso_id": "MATH101", "grade": 95 }] })
    );

    // A course never graded is 404.
    let response = app
        .oneshot(post_json(
            "/grades/lookup",
            "teacher-token",
            grade_body("T1", "S1", "2024-1", "CHEM300"),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn create_overwrites_existing_grade() {
    let store = Arc::new(MemoryGradeStore::new());
    store.enroll_student(&PartitionKey::new("T1", "S1").unwrap());
    let app = test_app(store);

    for (token, grade) in [("teacher-token", json!(70)), ("admin-token", json!("A-"))] {
        let response = app
            .clone()
            .oneshot(post_json(
                "/grades",
                token,
                create_body("T1", "S1", "2024-1", "MATH101", grade),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    let response = app
        .oneshot(post_json(
            "/grades/lookup",
            "teacher-token",
            grade_body("T1", "S1", "2024-1", "MATH101"),
        ))
        .await
        .unwrap();
    let body = body_json(response).await;
    // Last write wins, including the registrar.
    assert_eq!(body, json!({ "grade": "A-", "registered_by": "adm-1" }));
}

#[tokio::test]
async fn create_for_unknown_student_is_400_and_writes_nothing() {
    let store = Arc::new(MemoryGradeStore::new());
    let app = test_app(store.clone());

    let response = app
        .clone()
        .oneshot(post_json(
            "/grades",
            "teacher-token",
            create_body("T1", "ghost", "2024-1", "MATH101", json!(95)),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // Nothing was written.
    let key = GradeKey::new("T1", "ghost", "2024-1", "MATH101").unwrap();
    assert!(store.get_grade(&key.partition, &key.sort).await.unwrap().is_none());
}

#[tokio::test]
async fn delete_is_idempotent_through_the_api() {
    let store = Arc::new(MemoryGradeStore::new());
    store.enroll_student(&PartitionKey::new("T1", "S1").unwrap());
    let app = test_app(store);

    // Deleting a grade that never existed still reports success.
    let response = app
        .clone()
        .oneshot(post_json(
            "/grades/delete",
            "teacher-token",
            grade_body("T1", "S1", "2024-1", "MATH101"),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // Create, delete, then the lookup is 404.
    let response = app
        .clone()
        .oneshot(post_json(
            "/grades",
            "teacher-token",
            create_body("T1", "S1", "2024-1", "MATH101", json!(95)),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = app
        .clone()
        .oneshot(post_json(
            "/grades/delete",
            "admin-token",
            grade_body("T1", "S1", "2024-1", "MATH101"),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .oneshot(post_json(
            "/grades/lookup",
            "teacher-token",
            grade_body("T1", "S1", "2024-1", "MATH101"),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn period_listing_is_scoped_to_the_callers_claims() {
    let store = Arc::new(MemoryGradeStore::new());
    store.enroll_student(&PartitionKey::new("T1", "S1").unwrap());
    store.enroll_student(&PartitionKey::new("T1", "S2").unwrap());
    let app = test_app(store);

    let response = app
        .clone()
        .oneshot(post_json(
            "/grades",
            "teacher-token",
            create_body("T1", "S1", "2024-1", "MATH101", json!(95)),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    // S2 smuggles S1's identity into the body; the schema ignores it and the
    // scope comes from S2's claims, so there is nothing to list.
    let response = app
        .clone()
        .oneshot(post_json(
            "/me/grades/period",
            "s2-token",
            json!({ "periodo": "2024-1", "tenant_id": "T1", "user_id": "S1" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    // The legitimate owner still sees the record.
    let response = app
        .oneshot(post_json(
            "/me/grades/period",
            "s1-token",
            json!({ "periodo": "2024-1" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn period_listing_keeps_sort_key_order() {
    let store = Arc::new(MemoryGradeStore::new());
    store.enroll_student(&PartitionKey::new("T1", "S1").unwrap());
    let app = test_app(store);

    for (curso, grade) in [("PHYS201", json!(81)), ("ART100", json!("B")), ("MATH101", json!(95))] {
        let response = app
            .clone()
            .oneshot(post_json(
                "/grades",
                "teacher-token",
                create_body("T1", "S1", "2024-1", curso, grade),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    let response = app
        .oneshot(post_json(
            "/me/grades/period",
            "s1-token",
            json!({ "periodo": "2024-1" }),
        ))
        .await
        .unwrap();
    let body = body_json(response).await;
    assert_eq!(
        body,
        json!({ "notas": [
            { "curso_id": "ART100", "grade": "B" },
            { "curso_id": "MATH101", "grade": 95 },
            { "curso_id": "PHYS201", "grade": 81 },
        ] })
    );
}

#[tokio::test]
async fn missing_fields_are_400_with_error_body() {
    let store = Arc::new(MemoryGradeStore::new());
    let app = test_app(store);

    // Create without a grade.
    let response = app
        .clone()
        .oneshot(post_json(
            "/grades",
            "teacher-token",
            grade_body("T1", "S1", "2024-1", "MATH101"),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["error"], "Missing required field: grade.");

    // Explicit null grade is treated the same as absent.
    let response = app
        .clone()
        .oneshot(post_json(
            "/grades",
            "teacher-token",
            create_body("T1", "S1", "2024-1", "MATH101", Value::Null),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // A structured grade is not a score.
    let response = app
        .clone()
        .oneshot(post_json(
            "/grades",
            "teacher-token",
            create_body("T1", "S1", "2024-1", "MATH101", json!({ "value": 95 })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // Lookup without tenant_id.
    let response = app
        .clone()
        .oneshot(post_json(
            "/grades/lookup",
            "teacher-token",
            json!({ "user_id": "S1", "periodo": "2024-1", "curso_id": "MATH101" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // Listing without periodo.
    let response = app
        .oneshot(post_json("/me/grades/period", "s1-token", json!({})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn key_components_containing_the_separator_are_400() {
    let store = Arc::new(MemoryGradeStore::new());
    let app = test_app(store);

    let response = app
        .clone()
        .oneshot(post_json(
            "/grades",
            "teacher-token",
            create_body("T1", "S1", "2024-1", "MATH#101", json!(95)),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(
        body["error"],
        "Field curso_id must not contain the '#' character."
    );

    let response = app
        .oneshot(post_json(
            "/grades/lookup",
            "teacher-token",
            grade_body("T#1", "S1", "2024-1", "MATH101"),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn empty_period_listing_is_404() {
    let store = Arc::new(MemoryGradeStore::new());
    store.enroll_student(&PartitionKey::new("T1", "S1").unwrap());
    let app = test_app(store);

    let response = app
        .oneshot(post_json(
            "/me/grades/period",
            "s1-token",
            json!({ "periodo": "1999-1" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = body_json(response).await;
    assert_eq!(body["error"], "No grades found for the requested period.");
}

#[tokio::test]
async fn store_failures_surface_as_generic_500() {
    let store = Arc::new(MemoryGradeStore::new_failing());
    let app = test_app(store);

    let response = app
        .oneshot(post_json(
            "/grades",
            "teacher-token",
            create_body("T1", "S1", "2024-1", "MATH101", json!(95)),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let body = body_json(response).await;
    // Generic message only; no backend detail leaks into the response.
    assert_eq!(
        body["error"],
        "A database error occurred while processing the request."
    );
}
