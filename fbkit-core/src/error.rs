//! Error types shared by the credential loader and both store clients.

use std::path::PathBuf;

use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while connecting to or talking with the backend.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Failed to read credentials file '{}': {source}", .path.display())]
    CredentialsRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse credentials file '{}': {source}", .path.display())]
    CredentialsParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid service account credentials: {0}")]
    InvalidCredentials(String),

    #[error("Invalid database URL '{0}'")]
    InvalidDatabaseUrl(String),

    #[error("Session not configured: {0}")]
    NotConfigured(&'static str),

    #[error("A default session is already initialized")]
    AlreadyInitialized,

    #[error("No default session has been initialized")]
    NotInitialized,

    #[error("Failed to sign token assertion: {0}")]
    TokenSigning(#[from] jsonwebtoken::errors::Error),

    #[error("Token exchange failed: {0}")]
    TokenExchange(String),

    #[error("Invalid path '{path}': {reason}")]
    InvalidPath { path: String, reason: &'static str },

    #[error("Invalid document key '{0}'")]
    InvalidDocumentKey(String),

    #[error("Payload must be a JSON object, got {0}")]
    NotAMapping(&'static str),

    #[error("Invalid document value: {0}")]
    InvalidValue(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Backend returned status {status}: {message}")]
    Api { status: u16, message: String },
}

impl Error {
    /// Returns true when the backend rejected the caller's credentials.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Error::Api { status: 401 | 403, .. })
    }
}

/// Builds an [`Error::Api`] from a failed response.
///
/// Understands both the realtime store's `{"error": "..."}` body and the
/// document store's `{"error": {"message": "..."}}` body.
pub(crate) async fn api_error(response: reqwest::Response) -> Error {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<serde_json::Value>(&body)
        .ok()
        .and_then(|v| match v.get("error") {
            Some(serde_json::Value::String(message)) => Some(message.clone()),
            Some(serde_json::Value::Object(err)) => err
                .get("message")
                .and_then(|m| m.as_str())
                .map(str::to_string),
            _ => None,
        })
        .unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("unexpected response")
                .to_string()
        });

    Error::Api {
        status: status.as_u16(),
        message,
    }
}

/// Name of the JSON kind of a value, used in payload errors.
pub(crate) fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}
