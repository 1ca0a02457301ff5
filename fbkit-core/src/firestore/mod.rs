//! Document store client.
//!
//! Documents are addressed by a `(collection, document)` pair and hold a
//! schemaless [`Record`]. Collections and documents are created implicitly
//! by the first write.

mod value;

pub use value::{decode_fields, decode_value, encode_fields, encode_value};

use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::error::{api_error, Error, Result};
use crate::record::{to_record, Record};
use crate::session::Session;

#[derive(Debug, Deserialize)]
struct DocumentResponse {
    #[serde(default)]
    fields: Map<String, Value>,
}

/// Client for reading and writing whole documents.
#[derive(Debug, Clone)]
pub struct DocumentClient {
    session: Session,
}

impl DocumentClient {
    pub fn new(session: Session) -> Self {
        Self { session }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Replaces the document at `collection/document` with `data`, creating it if needed.
    pub async fn write(
        &self,
        collection: &str,
        document: &str,
        data: &impl Serialize,
    ) -> Result<()> {
        let record = to_record(data)?;
        tracing::info!("Adding data to /{}/{}/", collection, document);

        self.patch(collection, document, &record, None).await
    }

    /// Sets the top-level fields of `data` on the document, keeping the others.
    pub async fn merge(
        &self,
        collection: &str,
        document: &str,
        data: &impl Serialize,
    ) -> Result<()> {
        let record = to_record(data)?;
        tracing::info!("Merging data into /{}/{}/", collection, document);

        // A PATCH without a mask replaces the document, so an empty merge
        // only creates the document when it is missing.
        if record.is_empty() {
            if self.read(collection, document).await?.is_none() {
                self.patch(collection, document, &record, None).await?;
            }
            return Ok(());
        }

        let mask: Vec<String> = record.keys().map(|k| quote_field_path(k)).collect();
        self.patch(collection, document, &record, Some(mask.as_slice()))
            .await
    }

    /// Reads the document. `Ok(None)` means it does not exist.
    pub async fn read(&self, collection: &str, document: &str) -> Result<Option<Record>> {
        tracing::info!("Collecting data from /{}/{}/", collection, document);

        let response = self
            .send(Method::GET, collection, document)
            .await
            .inspect_err(|e| {
                tracing::warn!("Read of /{}/{}/ failed: {}", collection, document, e)
            })?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            let err = api_error(response).await;
            tracing::warn!("Read of /{}/{}/ failed: {}", collection, document, err);
            return Err(err);
        }

        let document: DocumentResponse = response.json().await?;
        decode_fields(&document.fields).map(Some)
    }

    /// Reads the document and deserializes it into `T`.
    pub async fn read_as<T: DeserializeOwned>(
        &self,
        collection: &str,
        document: &str,
    ) -> Result<Option<T>> {
        match self.read(collection, document).await? {
            Some(record) => Ok(Some(serde_json::from_value(Value::Object(record))?)),
            None => Ok(None),
        }
    }

    /// Deletes the document. Deleting a missing document succeeds.
    pub async fn delete(&self, collection: &str, document: &str) -> Result<()> {
        tracing::info!("Deleting /{}/{}/", collection, document);

        let response = self.send(Method::DELETE, collection, document).await?;
        if !response.status().is_success() {
            let err = api_error(response).await;
            tracing::warn!("Delete of /{}/{}/ failed: {}", collection, document, err);
            return Err(err);
        }
        Ok(())
    }

    async fn patch(
        &self,
        collection: &str,
        document: &str,
        record: &Record,
        mask: Option<&[String]>,
    ) -> Result<()> {
        let url = self.document_url(collection, document)?;
        let fields = encode_fields(record)?;
        let body = json!({ "fields": fields });

        let mut request = self.session.http().patch(&url).json(&body);
        if let Some(mask) = mask {
            let params: Vec<(&str, &str)> = mask
                .iter()
                .map(|field| ("updateMask.fieldPaths", field.as_str()))
                .collect();
            request = request.query(&params);
        }

        let request = self
            .session
            .authorize(request, self.session.firestore_emulated())
            .await?;
        let response = request.send().await.inspect_err(|e| {
            tracing::warn!("Write to /{}/{}/ failed: {}", collection, document, e)
        })?;

        if !response.status().is_success() {
            let err = api_error(response).await;
            tracing::warn!("Write to /{}/{}/ failed: {}", collection, document, err);
            return Err(err);
        }
        Ok(())
    }

    async fn send(
        &self,
        method: Method,
        collection: &str,
        document: &str,
    ) -> Result<reqwest::Response> {
        let url = self.document_url(collection, document)?;
        let request = self.session.http().request(method, &url);
        let request = self
            .session
            .authorize(request, self.session.firestore_emulated())
            .await?;
        Ok(request.send().await?)
    }

    fn document_url(&self, collection: &str, document: &str) -> Result<String> {
        validate_key(collection)?;
        validate_key(document)?;
        Ok(format!(
            "{}/{}/{}",
            self.session.documents_url()?,
            urlencoding::encode(collection),
            urlencoding::encode(document)
        ))
    }
}

fn validate_key(key: &str) -> Result<()> {
    if key.is_empty() || key.contains('/') || key == "." || key == ".." {
        return Err(Error::InvalidDocumentKey(key.to_string()));
    }
    Ok(())
}

/// Quotes a top-level field name for use in an update mask.
///
/// Simple identifiers pass through; anything else is wrapped in backticks.
fn quote_field_path(field: &str) -> String {
    let simple = field
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && field.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if simple {
        field.to_string()
    } else {
        format!("`{}`", field.replace('\\', "\\\\").replace('`', "\\`"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credentials::Credentials;
    use crate::testing::FakeFirestore;
    use serde_json::json;
    use wiremock::matchers::{any, method};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn fake_client() -> (MockServer, FakeFirestore, DocumentClient) {
        let server = MockServer::start().await;
        let fake = FakeFirestore::default();
        Mock::given(any())
            .respond_with(fake.clone())
            .mount(&server)
            .await;

        let session = Session::builder(Credentials::AccessToken("test-token".to_string()))
            .project_id("demo-project")
            .firestore_base_url(format!("{}/v1", server.uri()))
            .build()
            .unwrap();
        (server, fake, DocumentClient::new(session))
    }

    #[tokio::test]
    async fn test_write_then_read() {
        let (_server, _fake, client) = fake_client().await;

        client
            .write("sample", "test", &json!({"Hola": "mundo"}))
            .await
            .unwrap();

        let record = client.read("sample", "test").await.unwrap().unwrap();
        assert_eq!(Value::Object(record), json!({"Hola": "mundo"}));
    }

    #[tokio::test]
    async fn test_write_replaces_whole_document() {
        let (_server, fake, client) = fake_client().await;

        client.write("c", "d", &json!({"a": 1, "b": 2})).await.unwrap();
        client.write("c", "d", &json!({"b": 3})).await.unwrap();

        let record = client.read("c", "d").await.unwrap().unwrap();
        assert_eq!(Value::Object(record), json!({"b": 3}));
        assert_eq!(
            fake.fields("c/d").unwrap().get("b"),
            Some(&json!({"integerValue": "3"}))
        );
    }

    #[tokio::test]
    async fn test_merge_keeps_other_fields() {
        let (_server, _fake, client) = fake_client().await;

        client.write("c", "d", &json!({"a": 1, "b": 2})).await.unwrap();
        client
            .merge("c", "d", &json!({"b": {"nested": true}, "odd key": "x"}))
            .await
            .unwrap();

        let record = client.read("c", "d").await.unwrap().unwrap();
        assert_eq!(
            Value::Object(record),
            json!({"a": 1, "b": {"nested": true}, "odd key": "x"})
        );
    }

    #[tokio::test]
    async fn test_empty_merge_keeps_existing_fields() {
        let (_server, _fake, client) = fake_client().await;

        client.write("c", "d", &json!({"a": 1, "b": 2})).await.unwrap();
        client.merge("c", "d", &json!({})).await.unwrap();

        let record = client.read("c", "d").await.unwrap().unwrap();
        assert_eq!(Value::Object(record), json!({"a": 1, "b": 2}));
    }

    #[tokio::test]
    async fn test_empty_merge_creates_missing_document() {
        let (_server, fake, client) = fake_client().await;

        client.merge("c", "new", &json!({})).await.unwrap();

        assert_eq!(fake.fields("c/new"), Some(Map::new()));
        let record = client.read("c", "new").await.unwrap().unwrap();
        assert!(record.is_empty());
    }

    #[tokio::test]
    async fn test_oversized_integer_is_rejected_before_sending() {
        let (server, _fake, client) = fake_client().await;

        let err = client
            .write("c", "d", &json!({"big": u64::MAX}))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidValue(_)));
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_missing_document_is_none() {
        let (_server, _fake, client) = fake_client().await;
        assert_eq!(client.read("sample", "missing").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_delete() {
        let (_server, _fake, client) = fake_client().await;

        client.write("c", "d", &json!({"a": 1})).await.unwrap();
        client.delete("c", "d").await.unwrap();
        assert_eq!(client.read("c", "d").await.unwrap(), None);

        // Deleting again is fine.
        client.delete("c", "d").await.unwrap();
    }

    #[tokio::test]
    async fn test_read_as_struct() {
        #[derive(Debug, Deserialize, PartialEq)]
        struct Greeting {
            #[serde(rename = "Hola")]
            hola: String,
        }

        let (_server, _fake, client) = fake_client().await;
        client
            .write("sample", "test", &json!({"Hola": "mundo"}))
            .await
            .unwrap();

        let greeting: Option<Greeting> = client.read_as("sample", "test").await.unwrap();
        assert_eq!(
            greeting,
            Some(Greeting {
                hola: "mundo".to_string()
            })
        );
    }

    #[tokio::test]
    async fn test_invalid_keys_are_rejected() {
        let (_server, _fake, client) = fake_client().await;

        for (collection, document) in [("", "d"), ("c", ""), ("a/b", "d"), ("c", "..")] {
            let err = client.read(collection, document).await.unwrap_err();
            assert!(matches!(err, Error::InvalidDocumentKey(_)));
        }
    }

    #[tokio::test]
    async fn test_backend_error_is_not_missing_document() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(403).set_body_json(json!({
                "error": {
                    "code": 403,
                    "message": "Missing or insufficient permissions.",
                    "status": "PERMISSION_DENIED"
                }
            })))
            .mount(&server)
            .await;

        let session = Session::builder(Credentials::AccessToken("t".to_string()))
            .project_id("demo-project")
            .firestore_base_url(format!("{}/v1", server.uri()))
            .build()
            .unwrap();
        let client = DocumentClient::new(session);

        let err = client.read("sample", "test").await.unwrap_err();
        assert!(err.is_unauthorized());
        assert_eq!(
            err.to_string(),
            "Backend returned status 403: Missing or insufficient permissions."
        );
    }

    #[test]
    fn test_quote_field_path() {
        assert_eq!(quote_field_path("Hola"), "Hola");
        assert_eq!(quote_field_path("_private1"), "_private1");
        assert_eq!(quote_field_path("odd key"), "`odd key`");
        assert_eq!(quote_field_path("1st"), "`1st`");
        assert_eq!(quote_field_path("back`tick"), "`back\\`tick`");
    }
}
