//! Schemaless records.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::{json_kind, Error, Result};

/// A mapping from string keys to JSON-compatible values.
pub type Record = Map<String, Value>;

/// Serializes `data` and requires the result to be a JSON object.
pub fn to_record(data: &impl Serialize) -> Result<Record> {
    match serde_json::to_value(data)? {
        Value::Object(record) => Ok(record),
        other => Err(Error::NotAMapping(json_kind(&other))),
    }
}
