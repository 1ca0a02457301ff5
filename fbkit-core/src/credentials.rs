//! Service account credential loading.
//!
//! A service account key is the JSON file downloaded from the project
//! console. Only the fields needed to mint access tokens are kept.

use std::path::Path;

use serde::Deserialize;

use crate::error::{Error, Result};

/// Token endpoint used when the key file does not name one.
pub const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

/// A parsed service account key file.
#[derive(Clone, Deserialize)]
pub struct ServiceAccountKey {
    #[serde(rename = "type")]
    pub key_type: String,
    #[serde(default)]
    pub project_id: Option<String>,
    #[serde(default)]
    pub private_key_id: Option<String>,
    pub private_key: String,
    pub client_email: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

impl std::fmt::Debug for ServiceAccountKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceAccountKey")
            .field("project_id", &self.project_id)
            .field("private_key_id", &self.private_key_id)
            .field("client_email", &self.client_email)
            .field("token_uri", &self.token_uri)
            .finish_non_exhaustive()
    }
}

impl ServiceAccountKey {
    /// Reads and validates a key file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| Error::CredentialsRead {
            path: path.to_path_buf(),
            source,
        })?;
        let key: ServiceAccountKey =
            serde_json::from_str(&contents).map_err(|source| Error::CredentialsParse {
                path: path.to_path_buf(),
                source,
            })?;
        key.validate()?;
        Ok(key)
    }

    /// Parses a key from its JSON text.
    pub fn from_json(json: &str) -> Result<Self> {
        let key: ServiceAccountKey = serde_json::from_str(json)?;
        key.validate()?;
        Ok(key)
    }

    fn validate(&self) -> Result<()> {
        if self.key_type != "service_account" {
            return Err(Error::InvalidCredentials(format!(
                "expected type \"service_account\", got \"{}\"",
                self.key_type
            )));
        }
        if self.private_key.trim().is_empty() {
            return Err(Error::InvalidCredentials("private_key is empty".to_string()));
        }
        if self.client_email.trim().is_empty() {
            return Err(Error::InvalidCredentials(
                "client_email is empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// How requests to the backend are authorized.
#[derive(Debug, Clone)]
pub enum Credentials {
    /// Mint OAuth2 access tokens from a service account key.
    ServiceAccount(ServiceAccountKey),
    /// Use a caller supplied bearer token as-is.
    AccessToken(String),
    /// Talk to the local emulator suite, which accepts the `owner` token.
    Emulator,
}

impl Credentials {
    /// Loads service account credentials from a key file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        ServiceAccountKey::from_file(path).map(Credentials::ServiceAccount)
    }

    /// Project id carried by the credentials, if any.
    pub fn project_id(&self) -> Option<&str> {
        match self {
            Credentials::ServiceAccount(key) => key.project_id.as_deref(),
            _ => None,
        }
    }
}
