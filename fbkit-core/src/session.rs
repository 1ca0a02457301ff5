//! The connection handle shared by the realtime and document clients.
//!
//! A [`Session`] owns the HTTP client, the token source and the addresses
//! of both backends. It is cheap to clone; clones share the connection pool
//! and the cached access token. Sessions are passed to clients explicitly,
//! but one session can also be registered as the process default.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use once_cell::sync::OnceCell;

use crate::auth::{TokenSource, EMULATOR_TOKEN};
use crate::credentials::Credentials;
use crate::error::{Error, Result};
use crate::path::DbPath;

/// Document store REST endpoint.
pub const FIRESTORE_BASE_URL: &str = "https://firestore.googleapis.com/v1";
/// Database id used when none is configured.
pub const DEFAULT_FIRESTORE_DATABASE: &str = "(default)";

/// Environment variable naming the realtime database emulator host.
pub const DATABASE_EMULATOR_HOST_VAR: &str = "FIREBASE_DATABASE_EMULATOR_HOST";
/// Environment variable naming the document store emulator host.
pub const FIRESTORE_EMULATOR_HOST_VAR: &str = "FIRESTORE_EMULATOR_HOST";

static DEFAULT_SESSION: OnceCell<Session> = OnceCell::new();

/// Builds a [`Session`] from credentials and backend addresses.
#[derive(Debug)]
pub struct SessionBuilder {
    credentials: Credentials,
    database_url: Option<String>,
    database_emulator_host: Option<String>,
    project_id: Option<String>,
    firestore_base_url: Option<String>,
    firestore_emulated: bool,
    firestore_database: String,
    timeout: Option<Duration>,
}

impl SessionBuilder {
    fn new(credentials: Credentials) -> Self {
        Self {
            credentials,
            database_url: None,
            database_emulator_host: None,
            project_id: None,
            firestore_base_url: None,
            firestore_emulated: false,
            firestore_database: DEFAULT_FIRESTORE_DATABASE.to_string(),
            timeout: None,
        }
    }

    /// Realtime database URL, e.g. `https://my-project-default-rtdb.firebaseio.com/`.
    pub fn database_url(mut self, url: impl Into<String>) -> Self {
        self.database_url = Some(url.into());
        self
    }

    /// Project id for the document store. Defaults to the one in the key file.
    pub fn project_id(mut self, project_id: impl Into<String>) -> Self {
        self.project_id = Some(project_id.into());
        self
    }

    /// Document store database id. Defaults to `(default)`.
    pub fn firestore_database(mut self, database: impl Into<String>) -> Self {
        self.firestore_database = database.into();
        self
    }

    /// Overrides the document store REST endpoint.
    pub fn firestore_base_url(mut self, url: impl Into<String>) -> Self {
        self.firestore_base_url = Some(url.into());
        self
    }

    /// Sends realtime requests to a local emulator (`host:port`).
    pub fn database_emulator(mut self, host: impl Into<String>) -> Self {
        self.database_emulator_host = Some(host.into());
        self
    }

    /// Sends document store requests to a local emulator (`host:port`).
    pub fn firestore_emulator(mut self, host: impl Into<String>) -> Self {
        self.firestore_base_url = Some(format!("http://{}/v1", host.into()));
        self.firestore_emulated = true;
        self
    }

    /// Picks up emulator hosts from the standard environment variables.
    pub fn emulators_from_env(mut self) -> Self {
        if let Ok(host) = std::env::var(DATABASE_EMULATOR_HOST_VAR) {
            self = self.database_emulator(host);
        }
        if let Ok(host) = std::env::var(FIRESTORE_EMULATOR_HOST_VAR) {
            self = self.firestore_emulator(host);
        }
        self
    }

    /// Request timeout applied to every call.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn build(self) -> Result<Session> {
        let database_url = self
            .database_url
            .map(|url| normalize_database_url(&url))
            .transpose()?;

        let project_id = self
            .project_id
            .or_else(|| self.credentials.project_id().map(str::to_string));

        let mut http = reqwest::Client::builder();
        if let Some(timeout) = self.timeout {
            http = http.timeout(timeout);
        }

        Ok(Session {
            inner: Arc::new(SessionInner {
                http: http.build()?,
                tokens: TokenSource::new(self.credentials),
                database_url,
                database_emulator_host: self.database_emulator_host,
                project_id,
                firestore_emulated: self.firestore_emulated,
                firestore_base_url: self
                    .firestore_base_url
                    .unwrap_or_else(|| FIRESTORE_BASE_URL.to_string())
                    .trim_end_matches('/')
                    .to_string(),
                firestore_database: self.firestore_database,
            }),
        })
    }
}

#[derive(Debug)]
struct SessionInner {
    http: reqwest::Client,
    tokens: TokenSource,
    database_url: Option<String>,
    database_emulator_host: Option<String>,
    project_id: Option<String>,
    firestore_emulated: bool,
    firestore_base_url: String,
    firestore_database: String,
}

/// An authenticated handle to the backend.
#[derive(Debug, Clone)]
pub struct Session {
    inner: Arc<SessionInner>,
}

/// Loads a service account key and opens a session against `database_url`.
///
/// Emulator hosts set in the environment are honored.
pub fn initialize_app(secret_path: impl AsRef<Path>, database_url: &str) -> Result<Session> {
    let secret_path = secret_path.as_ref();
    tracing::info!(
        "Connecting to {} with credentials {}",
        database_url,
        secret_path.display()
    );

    let session = Credentials::from_file(secret_path).and_then(|credentials| {
        Session::builder(credentials)
            .database_url(database_url)
            .emulators_from_env()
            .build()
    });

    match &session {
        Ok(_) => tracing::info!("Connection established"),
        Err(e) => tracing::warn!("Connection failed: {}", e),
    }
    session
}

impl Session {
    pub fn builder(credentials: Credentials) -> SessionBuilder {
        SessionBuilder::new(credentials)
    }

    /// Registers `session` as the process default.
    ///
    /// Only one default can exist; later calls fail with
    /// [`Error::AlreadyInitialized`] and leave the first one in place.
    pub fn set_default(session: Session) -> Result<&'static Session> {
        DEFAULT_SESSION
            .set(session)
            .map_err(|_| Error::AlreadyInitialized)?;
        Self::default_instance()
    }

    /// Returns the process default session.
    pub fn default_instance() -> Result<&'static Session> {
        DEFAULT_SESSION.get().ok_or(Error::NotInitialized)
    }

    pub fn database_url(&self) -> Option<&str> {
        self.inner.database_url.as_deref()
    }

    pub fn project_id(&self) -> Option<&str> {
        self.inner.project_id.as_deref()
    }

    pub fn credentials(&self) -> &Credentials {
        self.inner.tokens.credentials()
    }

    pub(crate) fn http(&self) -> &reqwest::Client {
        &self.inner.http
    }

    /// Attaches a bearer token to a request.
    pub(crate) async fn authorize(
        &self,
        request: reqwest::RequestBuilder,
        emulated: bool,
    ) -> Result<reqwest::RequestBuilder> {
        let token = if emulated {
            EMULATOR_TOKEN.to_string()
        } else {
            self.inner.tokens.bearer(self.http()).await?
        };
        Ok(request.bearer_auth(token))
    }

    /// URL of a realtime location, plus query parameters and whether it
    /// points at an emulator.
    pub(crate) fn realtime_url(&self, path: &DbPath) -> Result<RealtimeEndpoint> {
        let database_url = self
            .inner
            .database_url
            .as_deref()
            .ok_or(Error::NotConfigured("database_url is required for the realtime store"))?;

        let resource = format!("{}.json", path.url_encoded());
        match &self.inner.database_emulator_host {
            Some(host) => Ok(RealtimeEndpoint {
                url: format!("http://{}/{}", host, resource),
                namespace: Some(namespace_of(database_url)?),
            }),
            None => Ok(RealtimeEndpoint {
                url: format!("{}/{}", database_url, resource),
                namespace: None,
            }),
        }
    }

    pub(crate) fn realtime_emulated(&self) -> bool {
        self.inner.database_emulator_host.is_some()
    }

    /// Base URL of the document tree: `.../projects/{p}/databases/{d}/documents`.
    pub(crate) fn documents_url(&self) -> Result<String> {
        let project_id = self
            .inner
            .project_id
            .as_deref()
            .ok_or(Error::NotConfigured("project_id is required for the document store"))?;
        Ok(format!(
            "{}/projects/{}/databases/{}/documents",
            self.inner.firestore_base_url, project_id, self.inner.firestore_database
        ))
    }

    pub(crate) fn firestore_emulated(&self) -> bool {
        self.inner.firestore_emulated
    }
}

/// A resolved realtime request target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RealtimeEndpoint {
    pub url: String,
    /// `ns` query parameter required by the emulator.
    pub namespace: Option<String>,
}

fn normalize_database_url(url: &str) -> Result<String> {
    let trimmed = url.trim().trim_end_matches('/');
    let host = trimmed
        .strip_prefix("https://")
        .or_else(|| trimmed.strip_prefix("http://"))
        .ok_or_else(|| Error::InvalidDatabaseUrl(url.to_string()))?;
    if host.is_empty() || host.contains('/') {
        return Err(Error::InvalidDatabaseUrl(url.to_string()));
    }
    Ok(trimmed.to_string())
}

/// Database namespace: the first DNS label of the database URL host.
fn namespace_of(database_url: &str) -> Result<String> {
    let host = database_url
        .split_once("://")
        .map(|(_, rest)| rest)
        .unwrap_or(database_url);
    let host = host.split([':', '/']).next().unwrap_or_default();
    host.split('.')
        .next()
        .filter(|label| !label.is_empty())
        .map(str::to_string)
        .ok_or_else(|| Error::InvalidDatabaseUrl(database_url.to_string()))
}
