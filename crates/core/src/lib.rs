//! JSON:API codec core types.
//!
//! Wire-level shapes shared by the serializer, the deserializer and the
//! façade, plus key casing and the error vocabulary.

#![forbid(unsafe_code)]

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};

pub mod case;
pub mod errors;

pub use case::{KeyCase, UnknownKeyCase};
pub use errors::{ErrorDocument, ErrorObject, ErrorObjectCollection, ErrorSource, DEFAULT_ERROR_STATUS};

/// `{type, id}` reference. Equal iff both parts are equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ResourceIdentifier {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
}

impl ResourceIdentifier {
    pub fn new(kind: impl Into<String>, id: impl Into<String>) -> Self {
        Self { id: id.into(), kind: kind.into() }
    }
}

/// Relationship linkage: `null`, one identifier, or a list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Linkage {
    Empty,
    One(ResourceIdentifier),
    Many(Vec<ResourceIdentifier>),
}

impl Linkage {
    pub fn identifiers(&self) -> &[ResourceIdentifier] {
        match self {
            Linkage::Empty => &[],
            Linkage::One(id) => std::slice::from_ref(id),
            Linkage::Many(ids) => ids,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Relationship {
    pub data: Linkage,
}

/// Ordered relationship map, keyed by wire name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Relationships(Vec<(String, Relationship)>);

impl Relationships {
    pub fn insert(&mut self, name: String, rel: Relationship) {
        match self.0.iter_mut().find(|(k, _)| *k == name) {
            Some(slot) => slot.1 = rel,
            None => self.0.push((name, rel)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Relationship> {
        self.0.iter().find(|(k, _)| k == name).map(|(_, r)| r)
    }

    pub fn is_empty(&self) -> bool { self.0.is_empty() }
    pub fn len(&self) -> usize { self.0.len() }
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Relationship)> {
        self.0.iter().map(|(k, r)| (k.as_str(), r))
    }
}

impl Serialize for Relationships {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (k, v) in &self.0 {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

/// Wire representation of one domain object. Built fresh on every call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResourceObject {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub attributes: Map<String, Value>,
    #[serde(skip_serializing_if = "Relationships::is_empty")]
    pub relationships: Relationships,
}

impl ResourceObject {
    pub fn identifier(&self) -> ResourceIdentifier {
        ResourceIdentifier::new(self.kind.clone(), self.id.clone())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum PrimaryData {
    One(Box<ResourceObject>),
    Many(Vec<ResourceObject>),
}

impl PrimaryData {
    pub fn resources(&self) -> &[ResourceObject] {
        match self {
            PrimaryData::One(r) => std::slice::from_ref(r.as_ref()),
            PrimaryData::Many(rs) => rs,
        }
    }
}

/// Success document. `included` and `meta` are omitted from the wire when empty.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Document {
    pub data: PrimaryData,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub included: Vec<ResourceObject>,
    #[serde(skip_serializing_if = "Map::is_empty")]
    pub meta: Map<String, Value>,
}

impl Document {
    pub fn included_identifiers(&self) -> Vec<ResourceIdentifier> {
        self.included.iter().map(ResourceObject::identifier).collect()
    }

    pub fn to_value(&self) -> Value {
        // String-keyed maps of JSON values only.
        serde_json::to_value(self).expect("document of JSON values always serializes")
    }
}

/// Failures raised by the codec itself.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// A domain type reached the codec without a registered descriptor.
    #[error("unregistered resource type: {0}")]
    UnregisteredType(String),
    #[error("resource type registered twice: {0}")]
    DuplicateRegistration(String),
    #[error("accessor {kind}#{id}.{field} failed: {source}")]
    Accessor {
        kind: String,
        id: String,
        field: String,
        #[source]
        source: anyhow::Error,
    },
    /// The request body is not JSON at all.
    #[error("malformed request body: {0}")]
    MalformedBody(#[from] serde_json::Error),
}

impl CodecError {
    /// Deployment/registration defects and accessor failures, as opposed to
    /// client input problems.
    pub fn is_internal(&self) -> bool {
        !matches!(self, CodecError::MalformedBody(_))
    }

    /// Short label for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            CodecError::UnregisteredType(_) => "unregistered_type",
            CodecError::DuplicateRegistration(_) => "duplicate_registration",
            CodecError::Accessor { .. } => "accessor",
            CodecError::MalformedBody(_) => "malformed_body",
        }
    }
}

pub type CodecResult<T> = Result<T, CodecError>;

pub mod prelude {
    pub use super::{
        CodecError, CodecResult, Document, ErrorObjectCollection, KeyCase, Linkage, PrimaryData,
        Relationship, Relationships, ResourceIdentifier, ResourceObject,
    };
}
