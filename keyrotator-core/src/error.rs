//! Rotation error types

use thiserror::Error;

/// Errors raised while parsing or validating a secret payload
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("{0} key is missing from secret JSON")]
    MissingField(&'static str),

    #[error("Secret version {0} has no SecretString")]
    MissingSecretString(String),

    #[error("Secret JSON is not an object")]
    NotAnObject,

    #[error("Invalid secret JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

/// Errors from the secret store collaborator
#[derive(Debug, Error)]
pub enum SecretStoreError {
    /// The secret, version or staged value does not exist
    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("{code}: {message}")]
    Service { code: String, message: String },
}

impl SecretStoreError {
    pub fn service(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Service {
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

/// Errors from the credential store collaborator
#[derive(Debug, Error)]
pub enum CredentialStoreError {
    #[error("No such entity: {0}")]
    NoSuchEntity(String),

    #[error("Limit exceeded: {0}")]
    LimitExceeded(String),

    #[error("{code}: {message}")]
    Service { code: String, message: String },
}

impl CredentialStoreError {
    pub fn service(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Service {
            code: code.into(),
            message: message.into(),
        }
    }
}

/// Errors surfaced to the rotation framework
#[derive(Debug, Error)]
pub enum RotationError {
    /// The secret is not in a state that allows this rotation step
    #[error("{0}")]
    Validation(String),

    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(
        "Pending IAM secret {secret_id} in rotation {user} failed the test to authenticate: {code}"
    )]
    Authentication {
        secret_id: String,
        user: String,
        code: String,
    },

    #[error("Secrets Manager error: {0}")]
    SecretStore(#[from] SecretStoreError),

    #[error("IAM error: {0}")]
    CredentialStore(#[from] CredentialStoreError),
}

impl RotationError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }
}
