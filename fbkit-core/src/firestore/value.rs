//! Conversion between plain JSON and the document store's typed values.
//!
//! The REST API wraps every value in a single-key object naming its type,
//! e.g. `{"stringValue": "mundo"}` or `{"integerValue": "42"}` (64-bit
//! integers travel as decimal strings).

use serde_json::{json, Map, Number, Value};

use crate::error::{Error, Result};
use crate::record::Record;

/// Encodes a record as a document `fields` object.
pub fn encode_fields(record: &Record) -> Result<Map<String, Value>> {
    record
        .iter()
        .map(|(key, value)| Ok((key.clone(), encode_value(value)?)))
        .collect()
}

/// Encodes a single JSON value.
///
/// Integers outside the signed 64-bit range have no typed form and are
/// rejected with [`Error::InvalidValue`].
pub fn encode_value(value: &Value) -> Result<Value> {
    let encoded = match value {
        Value::Null => json!({ "nullValue": null }),
        Value::Bool(b) => json!({ "booleanValue": b }),
        Value::Number(n) if n.is_f64() => json!({ "doubleValue": n.as_f64() }),
        Value::Number(n) => match n.as_i64() {
            Some(i) => json!({ "integerValue": i.to_string() }),
            None => {
                return Err(Error::InvalidValue(format!(
                    "{} does not fit in a 64-bit signed integer",
                    n
                )))
            }
        },
        Value::String(s) => json!({ "stringValue": s }),
        Value::Array(items) => {
            let values = items.iter().map(encode_value).collect::<Result<Vec<_>>>()?;
            if values.is_empty() {
                json!({ "arrayValue": {} })
            } else {
                json!({ "arrayValue": { "values": values } })
            }
        }
        Value::Object(map) => {
            let fields = encode_fields(map)?;
            json!({ "mapValue": { "fields": fields } })
        }
    };
    Ok(encoded)
}

/// Decodes a document `fields` object into a record.
pub fn decode_fields(fields: &Map<String, Value>) -> Result<Record> {
    fields
        .iter()
        .map(|(key, value)| Ok((key.clone(), decode_value(value)?)))
        .collect()
}

/// Decodes a single typed value.
pub fn decode_value(value: &Value) -> Result<Value> {
    let (kind, inner) = match value.as_object() {
        Some(map) if map.len() == 1 => map.iter().next().ok_or_else(|| invalid(value))?,
        _ => return Err(invalid(value)),
    };

    match (kind.as_str(), inner) {
        ("nullValue", _) => Ok(Value::Null),
        ("booleanValue", Value::Bool(b)) => Ok(Value::Bool(*b)),
        ("integerValue", Value::String(s)) => s
            .parse::<i64>()
            .map(Value::from)
            .map_err(|_| invalid(value)),
        ("integerValue", Value::Number(n)) if n.is_i64() => Ok(Value::Number(n.clone())),
        ("doubleValue", Value::Number(n)) => Ok(n
            .as_f64()
            .and_then(Number::from_f64)
            .map(Value::Number)
            .unwrap_or(Value::Null)),
        // NaN and the infinities are sent as strings and have no JSON form.
        ("doubleValue", Value::String(_)) => Ok(Value::Null),
        ("stringValue" | "timestampValue" | "bytesValue" | "referenceValue", Value::String(s)) => {
            Ok(Value::String(s.clone()))
        }
        ("mapValue", Value::Object(map)) => match map.get("fields") {
            Some(Value::Object(fields)) => Ok(Value::Object(decode_fields(fields)?)),
            None => Ok(Value::Object(Map::new())),
            Some(_) => Err(invalid(value)),
        },
        ("arrayValue", Value::Object(array)) => match array.get("values") {
            Some(Value::Array(values)) => Ok(Value::Array(
                values.iter().map(decode_value).collect::<Result<_>>()?,
            )),
            None => Ok(Value::Array(Vec::new())),
            Some(_) => Err(invalid(value)),
        },
        ("geoPointValue", Value::Object(point)) => Ok(json!({
            "latitude": point.get("latitude").and_then(Value::as_f64).unwrap_or(0.0),
            "longitude": point.get("longitude").and_then(Value::as_f64).unwrap_or(0.0),
        })),
        _ => Err(invalid(value)),
    }
}

fn invalid(value: &Value) -> Error {
    Error::InvalidValue(value.to_string())
}
