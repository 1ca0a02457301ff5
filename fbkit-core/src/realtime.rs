//! Realtime tree store client.
//!
//! The tree is addressed by slash-delimited paths. A [`Reference`] names a
//! single location and performs reads and writes against it; a
//! [`RealtimeClient`] adds a default root so callers can work with short,
//! relative child keys.
//!
//! Requests go to the REST endpoint `{database_url}/{path}.json`.

use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{api_error, Result};
use crate::path::DbPath;
use crate::record::to_record;
use crate::session::Session;

#[derive(Debug, Deserialize)]
struct PushResponse {
    name: String,
}

/// A location in the realtime tree.
#[derive(Debug, Clone)]
pub struct Reference {
    session: Session,
    path: DbPath,
}

impl Reference {
    pub fn new(session: Session, path: DbPath) -> Self {
        Self { session, path }
    }

    pub fn path(&self) -> &DbPath {
        &self.path
    }

    /// Last path segment, or `None` for the root.
    pub fn key(&self) -> Option<&str> {
        self.path.key()
    }

    /// Reference to a location below this one. An empty child is this location.
    pub fn child(&self, child: &str) -> Result<Reference> {
        Ok(Self::new(self.session.clone(), self.path.join(child)?))
    }

    pub fn parent(&self) -> Option<Reference> {
        self.path
            .parent()
            .map(|path| Self::new(self.session.clone(), path))
    }

    /// Reads the value stored here. `Ok(None)` means the location is empty.
    pub async fn get(&self) -> Result<Option<Value>> {
        tracing::info!("Collecting data from {}", self.path);

        let value: Value = self
            .send(Method::GET, None, false)
            .await
            .inspect_err(|e| tracing::warn!("Read from {} failed: {}", self.path, e))?
            .json()
            .await?;

        Ok(match value {
            Value::Null => None,
            value => Some(value),
        })
    }

    /// Reads and deserializes the value stored here.
    pub async fn get_as<T: DeserializeOwned>(&self) -> Result<Option<T>> {
        match self.get().await? {
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(None),
        }
    }

    /// Merges `data` into this location: its keys overwrite, other children stay.
    ///
    /// Keys may be slash-delimited paths relative to this location.
    pub async fn update(&self, data: &impl Serialize) -> Result<()> {
        let payload = Value::Object(to_record(data)?);
        tracing::info!("Sending data to realtime {} | {}", self.path, payload);

        self.send(Method::PATCH, Some(&payload), true)
            .await
            .inspect_err(|e| tracing::warn!("Update of {} failed: {}", self.path, e))?;
        Ok(())
    }

    /// Replaces whatever is stored here with `data`.
    pub async fn set(&self, data: &impl Serialize) -> Result<()> {
        let value = serde_json::to_value(data)?;
        tracing::info!("Setting realtime {} | {}", self.path, value);

        self.send(Method::PUT, Some(&value), true)
            .await
            .inspect_err(|e| tracing::warn!("Set of {} failed: {}", self.path, e))?;
        Ok(())
    }

    /// Appends `data` under a backend-generated, time-ordered key.
    pub async fn push(&self, data: &impl Serialize) -> Result<Reference> {
        let value = serde_json::to_value(data)?;
        tracing::info!("Pushing data to realtime {} | {}", self.path, value);

        let response: PushResponse = self
            .send(Method::POST, Some(&value), false)
            .await
            .inspect_err(|e| tracing::warn!("Push to {} failed: {}", self.path, e))?
            .json()
            .await?;

        self.child(&response.name)
    }

    /// Removes this location and everything below it.
    pub async fn delete(&self) -> Result<()> {
        tracing::info!("Deleting realtime {}", self.path);

        self.send(Method::DELETE, None, true)
            .await
            .inspect_err(|e| tracing::warn!("Delete of {} failed: {}", self.path, e))?;
        Ok(())
    }

    async fn send(
        &self,
        method: Method,
        body: Option<&Value>,
        silent: bool,
    ) -> Result<reqwest::Response> {
        let endpoint = self.session.realtime_url(&self.path)?;

        let mut request = self.session.http().request(method, &endpoint.url);
        if let Some(namespace) = &endpoint.namespace {
            request = request.query(&[("ns", namespace)]);
        }
        if silent {
            request = request.query(&[("print", "silent")]);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let request = self
            .session
            .authorize(request, self.session.realtime_emulated())
            .await?;
        let response = request.send().await?;

        if !response.status().is_success() {
            return Err(api_error(response).await);
        }
        Ok(response)
    }
}

/// Realtime store client bound to a default root path.
#[derive(Debug, Clone)]
pub struct RealtimeClient {
    session: Session,
    root: DbPath,
}

impl RealtimeClient {
    /// Creates a client whose default root is `root`.
    pub fn new(session: Session, root: &str) -> Result<Self> {
        Ok(Self {
            session,
            root: DbPath::parse(root)?,
        })
    }

    /// Returns a client bound to another default root.
    pub fn with_path(&self, path: &str) -> Result<Self> {
        Self::new(self.session.clone(), path)
    }

    pub fn root(&self) -> &DbPath {
        &self.root
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Resolves `path` (absolute from the tree root), or the default root.
    pub fn connect(&self, path: Option<&str>) -> Result<Reference> {
        let path = match path {
            Some(path) => DbPath::parse(path)?,
            None => self.root.clone(),
        };
        tracing::debug!("Resolved realtime reference {}", path);
        Ok(Reference::new(self.session.clone(), path))
    }

    /// Merges `data` into `child` under `path` (or the default root).
    ///
    /// A missing or empty `child` writes at the base location itself.
    pub async fn write(
        &self,
        data: &impl Serialize,
        child: Option<&str>,
        path: Option<&str>,
    ) -> Result<()> {
        self.target(path, child)?.update(data).await
    }

    /// Reads `child` under `path` (or the default root).
    ///
    /// Returns `Ok(None)` when the location holds no data.
    pub async fn read(&self, path: Option<&str>, child: Option<&str>) -> Result<Option<Value>> {
        self.target(path, child)?.get().await
    }

    fn target(&self, path: Option<&str>, child: Option<&str>) -> Result<Reference> {
        let base = self.connect(path)?;
        match child {
            Some(child) => base.child(child),
            None => Ok(base),
        }
    }
}
