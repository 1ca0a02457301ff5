//! OAuth2 access tokens for service account credentials.
//!
//! Tokens are minted with the JWT-bearer grant: an RS256 assertion signed
//! with the service account's private key is exchanged at the key's token
//! endpoint. The resulting access token is cached until shortly before it
//! expires.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::credentials::{Credentials, ServiceAccountKey};
use crate::error::{Error, Result};

/// Scopes requested for realtime and document store access.
pub const SCOPES: &[&str] = &[
    "https://www.googleapis.com/auth/cloud-platform",
    "https://www.googleapis.com/auth/firebase.database",
    "https://www.googleapis.com/auth/userinfo.email",
];

const GRANT_TYPE: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
/// Lifetime requested for the signed assertion, in seconds.
const ASSERTION_LIFETIME_SECS: i64 = 3600;
/// Tokens closer than this many seconds to expiry are refreshed.
const REFRESH_MARGIN_SECS: i64 = 60;
/// Token the emulator suite accepts as an administrator.
pub(crate) const EMULATOR_TOKEN: &str = "owner";

#[derive(Debug, Serialize)]
struct AssertionClaims<'a> {
    iss: &'a str,
    sub: &'a str,
    aud: &'a str,
    scope: String,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct TokenErrorResponse {
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}

#[derive(Debug, Clone)]
struct CachedToken {
    token: String,
    expires_at: DateTime<Utc>,
}

impl CachedToken {
    fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        self.expires_at - now > Duration::seconds(REFRESH_MARGIN_SECS)
    }
}

/// Produces bearer tokens for outgoing requests.
#[derive(Debug)]
pub struct TokenSource {
    credentials: Credentials,
    cached: Mutex<Option<CachedToken>>,
}

impl TokenSource {
    pub fn new(credentials: Credentials) -> Self {
        Self {
            credentials,
            cached: Mutex::new(None),
        }
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    /// Returns a bearer token, minting a new one when needed.
    pub async fn bearer(&self, http: &reqwest::Client) -> Result<String> {
        let key = match &self.credentials {
            Credentials::AccessToken(token) => return Ok(token.clone()),
            Credentials::Emulator => return Ok(EMULATOR_TOKEN.to_string()),
            Credentials::ServiceAccount(key) => key,
        };

        let mut cached = self.cached.lock().await;
        let now = Utc::now();
        if let Some(token) = cached.as_ref().filter(|t| t.is_fresh(now)) {
            return Ok(token.token.clone());
        }

        let token = fetch_token(http, key, now).await?;
        let bearer = token.token.clone();
        *cached = Some(token);
        Ok(bearer)
    }
}

/// Signs the JWT-bearer assertion for a service account.
fn sign_assertion(key: &ServiceAccountKey, now: DateTime<Utc>) -> Result<String> {
    let claims = AssertionClaims {
        iss: &key.client_email,
        sub: &key.client_email,
        aud: &key.token_uri,
        scope: SCOPES.join(" "),
        iat: now.timestamp(),
        exp: now.timestamp() + ASSERTION_LIFETIME_SECS,
    };

    let mut header = Header::new(Algorithm::RS256);
    header.kid = key.private_key_id.clone();

    let signing_key = EncodingKey::from_rsa_pem(key.private_key.as_bytes())?;
    Ok(encode(&header, &claims, &signing_key)?)
}

async fn fetch_token(
    http: &reqwest::Client,
    key: &ServiceAccountKey,
    now: DateTime<Utc>,
) -> Result<CachedToken> {
    let assertion = sign_assertion(key, now)?;

    tracing::debug!("Requesting access token for {}", key.client_email);

    let response = http
        .post(&key.token_uri)
        .header(reqwest::header::ACCEPT, "application/json")
        .form(&[("grant_type", GRANT_TYPE), ("assertion", assertion.as_str())])
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        let message = match serde_json::from_str::<TokenErrorResponse>(&body) {
            Ok(err) => match err.error_description {
                Some(description) => format!("{}: {}", err.error, description),
                None => err.error,
            },
            Err(_) => format!("token endpoint returned status {}", status),
        };
        tracing::warn!("Access token request failed: {}", message);
        return Err(Error::TokenExchange(message));
    }

    let token: TokenResponse = response
        .json()
        .await
        .map_err(|e| Error::TokenExchange(e.to_string()))?;

    let lifetime = Duration::seconds(token.expires_in.unwrap_or(ASSERTION_LIFETIME_SECS));

    Ok(CachedToken {
        token: token.access_token,
        expires_at: now + lifetime,
    })
}
