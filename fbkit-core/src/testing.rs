//! In-memory stand-ins for the realtime and document store REST endpoints.
//!
//! Both fakes are `wiremock` responders that keep state across requests,
//! so tests can exercise write-then-read behavior end to end.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use serde_json::{json, Map, Value};
use wiremock::{Request, Respond, ResponseTemplate};

fn bearer(request: &Request) -> Option<String> {
    request
        .headers
        .get("authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::to_string)
}

fn query_value(request: &Request, name: &str) -> Option<String> {
    request
        .url
        .query_pairs()
        .find(|(k, _)| k == name)
        .map(|(_, v)| v.into_owned())
}

/// Fake realtime database keeping the whole tree as one JSON value.
#[derive(Debug, Clone, Default)]
pub struct FakeRealtime {
    tree: Arc<Mutex<Value>>,
    requests: Arc<AtomicUsize>,
    push_ids: Arc<AtomicUsize>,
    required_token: Option<String>,
}

impl FakeRealtime {
    /// A fake that rejects requests not carrying `token`.
    pub fn requiring_token(token: &str) -> Self {
        Self {
            required_token: Some(token.to_string()),
            ..Self::default()
        }
    }

    pub fn tree(&self) -> Value {
        self.tree.lock().unwrap().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }

    fn path_of(request: &Request) -> Vec<String> {
        let path = request.url.path();
        let path = path.strip_suffix(".json").unwrap_or(path);
        path.split('/')
            .filter(|s| !s.is_empty())
            .map(|s| urlencoding::decode(s).unwrap().into_owned())
            .collect()
    }
}

fn get_at(node: &Value, path: &[String]) -> Value {
    match path.split_first() {
        None => node.clone(),
        Some((head, rest)) => node
            .get(head)
            .map(|child| get_at(child, rest))
            .unwrap_or(Value::Null),
    }
}

/// Drops nulls and empty objects, which the tree never stores.
fn normalize(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let map: Map<String, Value> = map
                .into_iter()
                .map(|(k, v)| (k, normalize(v)))
                .filter(|(_, v)| !v.is_null())
                .collect();
            if map.is_empty() {
                Value::Null
            } else {
                Value::Object(map)
            }
        }
        other => other,
    }
}

fn set_at(node: &mut Value, path: &[String], value: Value) {
    let Some((head, rest)) = path.split_first() else {
        *node = normalize(value);
        return;
    };
    if !node.is_object() {
        *node = Value::Object(Map::new());
    }
    let Value::Object(map) = node else {
        unreachable!()
    };
    let child = map.entry(head.clone()).or_insert(Value::Null);
    set_at(child, rest, value);
    let remove = child.is_null();
    if remove {
        map.remove(head);
    }
    if map.is_empty() {
        *node = Value::Null;
    }
}

impl Respond for FakeRealtime {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        self.requests.fetch_add(1, Ordering::SeqCst);

        if let Some(required) = &self.required_token {
            if bearer(request).as_deref() != Some(required.as_str()) {
                return ResponseTemplate::new(401)
                    .set_body_json(json!({"error": "Unauthorized request."}));
            }
        }

        let path = Self::path_of(request);
        let silent = query_value(request, "print").as_deref() == Some("silent");
        let body: Value = serde_json::from_slice(&request.body).unwrap_or(Value::Null);
        let mut tree = self.tree.lock().unwrap();

        let echo = match request.method.as_str() {
            "GET" => return ResponseTemplate::new(200).set_body_json(get_at(&tree, &path)),
            "PUT" => {
                set_at(&mut tree, &path, body.clone());
                body
            }
            "PATCH" => {
                let Value::Object(updates) = body.clone() else {
                    return ResponseTemplate::new(400)
                        .set_body_json(json!({"error": "Invalid data; couldn't parse JSON object."}));
                };
                for (key, value) in updates {
                    let mut target = path.clone();
                    target.extend(key.split('/').filter(|s| !s.is_empty()).map(str::to_string));
                    set_at(&mut tree, &target, value);
                }
                body
            }
            "POST" => {
                let id = self.push_ids.fetch_add(1, Ordering::SeqCst);
                let name = format!("-Fake{:06}", id);
                let mut target = path.clone();
                target.push(name.clone());
                set_at(&mut tree, &target, body);
                return ResponseTemplate::new(200).set_body_json(json!({ "name": name }));
            }
            "DELETE" => {
                set_at(&mut tree, &path, Value::Null);
                Value::Null
            }
            _ => return ResponseTemplate::new(405),
        };

        if silent {
            ResponseTemplate::new(204)
        } else {
            ResponseTemplate::new(200).set_body_json(echo)
        }
    }
}

/// Fake document store holding encoded fields per document path.
#[derive(Debug, Clone, Default)]
pub struct FakeFirestore {
    documents: Arc<Mutex<BTreeMap<String, Map<String, Value>>>>,
}

impl FakeFirestore {
    /// Raw encoded fields of a stored document.
    pub fn fields(&self, document_path: &str) -> Option<Map<String, Value>> {
        self.documents.lock().unwrap().get(document_path).cloned()
    }

    fn not_found(name: &str) -> ResponseTemplate {
        ResponseTemplate::new(404).set_body_json(json!({
            "error": {
                "code": 404,
                "message": format!("Document \"{}\" not found.", name),
                "status": "NOT_FOUND"
            }
        }))
    }
}

fn unquote_field_path(path: &str) -> String {
    match path.strip_prefix('`').and_then(|p| p.strip_suffix('`')) {
        Some(inner) => inner.replace("\\`", "`").replace("\\\\", "\\"),
        None => path.to_string(),
    }
}

impl Respond for FakeFirestore {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let url_path = urlencoding::decode(request.url.path()).unwrap().into_owned();
        let Some((_, document_path)) = url_path.split_once("/documents/") else {
            return ResponseTemplate::new(400);
        };
        let document_path = document_path.to_string();
        let mut documents = self.documents.lock().unwrap();

        let stored = match request.method.as_str() {
            "GET" => match documents.get(&document_path) {
                Some(fields) => fields.clone(),
                None => return Self::not_found(&url_path),
            },
            "PATCH" => {
                let body: Value = serde_json::from_slice(&request.body).unwrap_or(Value::Null);
                let fields = body
                    .get("fields")
                    .and_then(Value::as_object)
                    .cloned()
                    .unwrap_or_default();
                let mask: Vec<String> = request
                    .url
                    .query_pairs()
                    .filter(|(k, _)| k == "updateMask.fieldPaths")
                    .map(|(_, v)| unquote_field_path(&v))
                    .collect();

                let entry = documents.entry(document_path.clone()).or_default();
                if mask.is_empty() {
                    *entry = fields;
                } else {
                    for key in mask {
                        match fields.get(&key) {
                            Some(value) => {
                                entry.insert(key, value.clone());
                            }
                            None => {
                                entry.remove(&key);
                            }
                        }
                    }
                }
                entry.clone()
            }
            "DELETE" => {
                documents.remove(&document_path);
                return ResponseTemplate::new(200).set_body_json(json!({}));
            }
            _ => return ResponseTemplate::new(405),
        };

        let mut document = json!({
            "name": url_path.trim_start_matches("/v1/"),
            "createTime": "2024-01-01T00:00:00.000000Z",
            "updateTime": "2024-01-01T00:00:00.000000Z"
        });
        if !stored.is_empty() {
            document["fields"] = Value::Object(stored);
        }
        ResponseTemplate::new(200).set_body_json(document)
    }
}
