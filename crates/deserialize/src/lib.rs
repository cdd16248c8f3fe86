//! JSON:API request body deserializer.
//!
//! Flattens `{data: {type, id, attributes, relationships}}` into one attribute
//! map with internal (snake_case) keys. Purely structural: no coercion and no
//! validation, missing sections simply yield an empty map.

#![forbid(unsafe_code)]

use inflector::string::singularize::to_singular;
use japi_core::{CodecResult, KeyCase};
use metrics::counter;
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::debug;

/// Flattened request body.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DeserializedBody {
    /// `data.type`, internal casing.
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub id: Option<String>,
    pub attributes: Map<String, Value>,
}

impl DeserializedBody {
    pub fn get(&self, key: &str) -> Option<&Value> { self.attributes.get(key) }

    pub fn is_empty(&self) -> bool { self.attributes.is_empty() }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DocumentDeserializer {
    case: KeyCase,
}

impl DocumentDeserializer {
    pub fn new(case: KeyCase) -> Self { Self { case } }

    /// Parse raw bytes. Only a body that is not JSON at all is an error; an
    /// empty body is treated like `{}`.
    pub fn deserialize(&self, raw: &[u8]) -> CodecResult<DeserializedBody> {
        if raw.iter().all(u8::is_ascii_whitespace) {
            return Ok(self.finish(DeserializedBody::default()));
        }
        let body: Value = serde_json::from_slice(raw).map_err(|e| {
            counter!("jsonapi_codec_failures_total", 1u64, "kind" => "malformed_body");
            e
        })?;
        Ok(self.deserialize_value(&body))
    }

    pub fn deserialize_str(&self, raw: &str) -> CodecResult<DeserializedBody> {
        self.deserialize(raw.as_bytes())
    }

    /// Flatten an already-parsed body.
    pub fn deserialize_value(&self, body: &Value) -> DeserializedBody {
        let Some(data) = body.get("data").and_then(Value::as_object) else {
            return self.finish(DeserializedBody::default());
        };

        let mut attributes = Map::new();
        if let Some(rels) = data.get("relationships").and_then(Value::as_object) {
            for (name, rel) in rels {
                if let Some((key, value)) = self.flatten_relationship(name, rel) {
                    attributes.insert(key, value);
                }
            }
        }
        if let Some(attrs) = data.get("attributes").and_then(Value::as_object) {
            // Explicit attributes win over flattened relationships.
            for (key, value) in attrs {
                attributes.insert(self.case.from_wire(key).into_owned(), value.clone());
            }
        }

        self.finish(DeserializedBody {
            kind: data.get("type").and_then(Value::as_str).map(|t| self.case.from_wire(t).into_owned()),
            id: data.get("id").and_then(scalar_id),
            attributes,
        })
    }

    /// `owner: {data: {id}}` -> `owner_id`, `skills: {data: [...]}` -> `skill_ids`.
    fn flatten_relationship(&self, name: &str, rel: &Value) -> Option<(String, Value)> {
        let name = self.case.from_wire(name);
        match rel.get("data")? {
            Value::Null => Some((format!("{name}_id"), Value::Null)),
            Value::Object(ident) => Some((format!("{name}_id"), ident.get("id").and_then(scalar_id).map(Value::String).unwrap_or(Value::Null))),
            Value::Array(items) => {
                let ids = items.iter().filter_map(|i| i.get("id").and_then(scalar_id)).map(Value::String).collect();
                Some((format!("{}_ids", singular(&name)), Value::Array(ids)))
            }
            _ => None,
        }
    }

    fn finish(&self, body: DeserializedBody) -> DeserializedBody {
        counter!("jsonapi_deserialize_total", 1u64);
        debug!(kind = ?body.kind, attributes = body.attributes.len(), key_case = %self.case, "deserialized request body");
        body
    }
}

/// Convenience wrapper for one-off calls.
pub fn deserialize(raw: &[u8], case: KeyCase) -> CodecResult<DeserializedBody> {
    DocumentDeserializer::new(case).deserialize(raw)
}

fn scalar_id(v: &Value) -> Option<String> {
    match v {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Singular of a to-many relationship name. Only the last `_` segment is
/// inflected (`user_statuses` -> `user_status`).
fn singular(name: &str) -> String {
    let (prefix, last) = match name.rfind('_') {
        Some(i) => name.split_at(i + 1),
        None => ("", name),
    };
    let one = to_singular(last);
    if one.is_empty() {
        return name.to_string();
    }
    format!("{prefix}{one}")
}
