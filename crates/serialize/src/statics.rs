//! Ad-hoc resources that are not registered domain objects, such as fixed
//! enumerations served as a resource list.

#![forbid(unsafe_code)]

use japi_core::{Document, PrimaryData, Relationships, ResourceObject};
use japi_params::RequestContext;
use metrics::counter;
use serde_json::{Map, Value};

#[derive(Debug, Clone, PartialEq)]
pub struct StaticResource {
    pub id: String,
    /// Internal type name.
    pub kind: String,
    pub attributes: Map<String, Value>,
}

impl StaticResource {
    pub fn new(kind: impl Into<String>, id: impl Into<String>) -> Self {
        Self { id: id.into(), kind: kind.into(), attributes: Map::new() }
    }

    pub fn attribute(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }
}

/// `{data: [...], meta: {total: n}}` with wire casing and sparse fields applied.
pub fn serialize_static(items: &[StaticResource], ctx: &RequestContext) -> Document {
    let case = ctx.key_case();
    let data = items
        .iter()
        .map(|item| {
            let fields = ctx.fields().fields_for(&item.kind);
            let attributes = item
                .attributes
                .iter()
                .filter(|(k, _)| fields.allows(k))
                .map(|(k, v)| (case.to_wire(k).into_owned(), v.clone()))
                .collect();
            ResourceObject {
                id: item.id.clone(),
                kind: case.to_wire(&item.kind).into_owned(),
                attributes,
                relationships: Relationships::default(),
            }
        })
        .collect();
    let mut meta = Map::new();
    meta.insert("total".into(), (items.len() as u64).into());
    counter!("jsonapi_documents_total", 1u64, "kind" => "static");
    Document { data: PrimaryData::Many(data), included: Vec::new(), meta }
}
