use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;

use crate::error::ApiError;
use crate::models::TokenClaims;

/// The one client-safe message for every authentication failure. The actual
/// cause (service unreachable, non-200, malformed payload) is logged at the
/// boundary and never leaked to the caller.
const INVALID_TOKEN: &str = "Invalid or expired token.";

// 1. TokenValidator Contract

/// TokenValidator
///
/// The abstract contract for the remote credential check. Handlers never see
/// the identity service's wire format; they receive `TokenClaims` or a 401.
/// Tests substitute a deterministic stub so no live network dependency is
/// needed to exercise the authorization gate.
#[async_trait]
pub trait TokenValidator: Send + Sync {
    async fn validate(&self, token: &str) -> Result<TokenClaims, ApiError>;
}

/// IdentityState
///
/// The concrete type used to share the validator across the application state.
pub type IdentityState = Arc<dyn TokenValidator>;

// 2. The Real Implementation (HTTP)

/// ValidatorEnvelope
///
/// The identity service's response shape: `{statusCode, body}`. The `body`
/// field is inconsistently typed upstream (sometimes a JSON object, sometimes
/// a JSON-encoded string); `normalized_body` flattens that here so the
/// inconsistency never reaches business code.
#[derive(Debug, Deserialize)]
struct ValidatorEnvelope {
    #[serde(rename = "statusCode")]
    status_code: u16,
    #[serde(default)]
    body: Value,
}

impl ValidatorEnvelope {
    fn normalized_body(&self) -> Result<Value, serde_json::Error> {
        match &self.body {
            Value::String(raw) => serde_json::from_str(raw),
            other => Ok(other.clone()),
        }
    }
}

/// HttpTokenValidator
///
/// Calls the identity service over HTTP with `{token}` and interprets the
/// envelope. A non-200 `statusCode` inside the envelope is an authentication
/// failure regardless of the body content; so is any transport or parse
/// failure.
pub struct HttpTokenValidator {
    client: reqwest::Client,
    validate_url: String,
}

impl HttpTokenValidator {
    pub fn new(validate_url: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            validate_url: validate_url.to_string(),
        }
    }
}

#[async_trait]
impl TokenValidator for HttpTokenValidator {
    async fn validate(&self, token: &str) -> Result<TokenClaims, ApiError> {
        let response = self
            .client
            .post(&self.validate_url)
            .json(&serde_json::json!({ "token": token }))
            .send()
            .await
            .map_err(|e| {
                tracing::error!("identity service unreachable: {e}");
                ApiError::unauthorized(INVALID_TOKEN)
            })?;

        let envelope = response.json::<ValidatorEnvelope>().await.map_err(|e| {
            tracing::error!("identity service returned an unparseable response: {e}");
            ApiError::unauthorized(INVALID_TOKEN)
        })?;

        let body = envelope.normalized_body().map_err(|e| {
            tracing::error!("identity service returned a malformed body: {e}");
            ApiError::unauthorized(INVALID_TOKEN)
        })?;

        if envelope.status_code != 200 {
            tracing::warn!(
                status = envelope.status_code,
                error = body.get("error").and_then(serde_json::Value::as_str).unwrap_or("unknown"),
                "identity service rejected the credential",
            );
            return Err(ApiError::unauthorized(INVALID_TOKEN));
        }

        serde_json::from_value::<TokenClaims>(body).map_err(|e| {
            tracing::error!("identity service claims payload is malformed: {e}");
            ApiError::unauthorized(INVALID_TOKEN)
        })
    }
}
