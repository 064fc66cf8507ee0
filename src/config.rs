use std::env;

/// AppConfig
///
/// Holds the application's entire configuration state, immutable once loaded
/// and shared across all threads via the application state.
#[derive(Clone)]
pub struct AppConfig {
    // Explicit DynamoDB endpoint. Set for dynamodb-local; None in production
    // means the regional AWS endpoint.
    pub dynamo_endpoint: Option<String>,
    pub dynamo_region: String,
    // Static credentials for the store client.
    pub dynamo_key: String,
    pub dynamo_secret: String,
    // The grades table (partition tenant_id#user_id, sort periodo#curso_id).
    pub notes_table: String,
    // The users table holding the student enrollment records.
    pub users_table: String,
    // Endpoint of the remote token-validating identity service.
    pub identity_url: String,
    // Runtime environment marker. Controls log format and local provisioning.
    pub env: Env,
}

/// Env
///
/// Defines the runtime context, used to switch between development
/// conveniences (dynamodb-local, table auto-provisioning, pretty logs) and
/// production infrastructure (real AWS, JSON logs, mandatory secrets).
#[derive(Clone, PartialEq, Debug)]
pub enum Env {
    Local,
    Production,
}

impl Default for AppConfig {
    /// Provides a safe, non-panicking AppConfig instance primarily used for
    /// test setup, without requiring any environment variables.
    fn default() -> Self {
        Self {
            dynamo_endpoint: Some("http://localhost:8000".to_string()),
            dynamo_region: "us-east-1".to_string(),
            dynamo_key: "local".to_string(),
            dynamo_secret: "local".to_string(),
            notes_table: "t_notas".to_string(),
            users_table: "t_usuarios".to_string(),
            identity_url: "http://localhost:4000/token/validate".to_string(),
            env: Env::Local,
        }
    }
}

impl AppConfig {
    /// The canonical function for initializing configuration at startup. Reads
    /// everything from environment variables and fails fast: a Production
    /// start with a missing secret must not come up half-configured.
    ///
    /// # Panics
    /// Panics when a variable required for the current environment is unset.
    pub fn load() -> Self {
        let env_str = env::var("APP_ENV").unwrap_or_else(|_| "local".to_string());
        let env = match env_str.as_str() {
            "production" => Env::Production,
            _ => Env::Local,
        };

        let notes_table = env::var("NOTES_TABLE").unwrap_or_else(|_| "t_notas".to_string());
        let users_table = env::var("USERS_TABLE").unwrap_or_else(|_| "t_usuarios".to_string());

        match env {
            Env::Local => Self {
                env: Env::Local,
                // dynamodb-local accepts any static credentials.
                dynamo_endpoint: Some(
                    env::var("DYNAMO_ENDPOINT")
                        .unwrap_or_else(|_| "http://localhost:8000".to_string()),
                ),
                dynamo_region: "us-east-1".to_string(),
                dynamo_key: "local".to_string(),
                dynamo_secret: "local".to_string(),
                notes_table,
                users_table,
                identity_url: env::var("TOKEN_VALIDATOR_URL")
                    .unwrap_or_else(|_| "http://localhost:4000/token/validate".to_string()),
            },
            Env::Production => Self {
                env: Env::Production,
                // Unset means the regional AWS endpoint; set only for private
                // gateways.
                dynamo_endpoint: env::var("DYNAMO_ENDPOINT").ok(),
                dynamo_region: env::var("DYNAMO_REGION")
                    .unwrap_or_else(|_| "us-east-1".to_string()),
                dynamo_key: env::var("DYNAMO_ACCESS_KEY")
                    .expect("FATAL: DYNAMO_ACCESS_KEY required in prod"),
                dynamo_secret: env::var("DYNAMO_SECRET_KEY")
                    .expect("FATAL: DYNAMO_SECRET_KEY required in prod"),
                notes_table,
                users_table,
                identity_url: env::var("TOKEN_VALIDATOR_URL")
                    .expect("FATAL: TOKEN_VALIDATOR_URL required in prod"),
            },
        }
    }
}
