use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts},
};

use crate::{
    error::ApiError,
    identity::IdentityState,
    models::{Role, TokenClaims},
};

/// Roles allowed to create, look up, and delete grades on behalf of a student.
pub const STAFF_ROLES: &[Role] = &[Role::Teacher, Role::Admin];

/// The only role allowed to use the self-service period listing.
pub const STUDENT_ONLY: &[Role] = &[Role::Student];

/// TokenClaims Extractor Implementation
///
/// Makes `TokenClaims` usable as a function argument in any handler, which is
/// where the authorization gate begins for every operation. The process:
///
/// 1. Pull the shared identity client from the application state.
/// 2. Extract the Authorization header and require the "Bearer " scheme.
/// 3. Delegate validation to the remote identity service via the
///    `TokenValidator` port and return the resolved claims.
///
/// Rejection: 401 on a missing/malformed header or any validation failure,
/// before any store access can occur. The response carries a generic message;
/// detail stays in the logs.
impl<S> FromRequestParts<S> for TokenClaims
where
    S: Send + Sync,
    // Allows the extractor to pull the identity client from the app state.
    IdentityState: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let identity = IdentityState::from_ref(state);

        let auth_header = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| ApiError::unauthorized("Missing bearer credential."))?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or_else(|| ApiError::unauthorized("Missing bearer credential."))?;

        identity.validate(token).await
    }
}

/// authorize
///
/// The role-policy half of the gate. Each operation carries a fixed allowed
/// set and its own denial message; claims outside the set get a 403.
pub fn authorize(claims: &TokenClaims, allowed: &[Role], denied: &str) -> Result<(), ApiError> {
    if allowed.contains(&claims.role) {
        Ok(())
    } else {
        tracing::warn!(role = %claims.role, "request denied by role policy");
        Err(ApiError::forbidden(denied))
    }
}
