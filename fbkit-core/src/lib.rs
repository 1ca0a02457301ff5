//! fbkit core library
//!
//! Thin clients for a Firebase project's Realtime Database (a hierarchical
//! key-value tree) and Cloud Firestore (collections of documents), built on
//! their REST APIs.
//!
//! ```no_run
//! use fbkit_core::{initialize_app, DocumentClient, RealtimeClient};
//! use serde_json::json;
//!
//! # async fn demo() -> fbkit_core::Result<()> {
//! let session = initialize_app("service-account.json", "https://demo-default-rtdb.firebaseio.com")?;
//!
//! let realtime = RealtimeClient::new(session.clone(), "test/documents")?;
//! realtime.write(&json!({"a": 1}), Some("node"), None).await?;
//! let node = realtime.read(None, Some("node")).await?;
//!
//! let documents = DocumentClient::new(session);
//! documents.write("sample", "test", &json!({"Hola": "mundo"})).await?;
//! let doc = documents.read("sample", "test").await?;
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod credentials;
pub mod error;
pub mod firestore;
pub mod path;
pub mod realtime;
pub mod record;
pub mod session;

#[cfg(test)]
mod testing;

pub use credentials::{Credentials, ServiceAccountKey};
pub use error::{Error, Result};
pub use firestore::DocumentClient;
pub use path::DbPath;
pub use realtime::{RealtimeClient, Reference};
pub use record::{to_record, Record};
pub use session::{initialize_app, Session, SessionBuilder};

pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
