//! JSON:API document serializer.
//!
//! Turns one domain object or a collection into a compound document. Every
//! relationship always gets linkage; only permitted include paths are walked
//! into `included`. Each `{type, id}` is emitted at most once per document,
//! so cyclic graphs terminate.

#![forbid(unsafe_code)]

use std::time::Instant;

use japi_core::{
    CodecError, CodecResult, Document, KeyCase, Linkage, PrimaryData, Relationship, Relationships,
    ResourceIdentifier, ResourceObject,
};
use japi_params::{IncludeTree, PageMeta, RequestContext};
use japi_registry::{Node, Related, ResourceDescriptor, ResourceTypeRegistry};
use metrics::{counter, histogram};
use rustc_hash::{FxHashMap, FxHashSet};
use serde_json::{Map, Value};
use smallvec::SmallVec;
use tracing::debug;

pub mod statics;

pub use statics::{serialize_static, StaticResource};

/// Primary data handed to the serializer, plus what it knows about paging.
#[derive(Clone)]
pub struct Resources {
    data: Primary,
    total: Option<u64>,
    page: Option<PageMeta>,
}

#[derive(Clone)]
enum Primary {
    One(Node),
    Many(Vec<Node>),
}

impl Resources {
    pub fn one(node: Node) -> Self {
        Self { data: Primary::One(node), total: None, page: None }
    }

    pub fn many<I: IntoIterator<Item = Node>>(nodes: I) -> Self {
        Self { data: Primary::Many(nodes.into_iter().collect()), total: None, page: None }
    }

    /// Total count across all pages, emitted as `meta.total`.
    pub fn with_total(mut self, total: u64) -> Self {
        self.total = Some(total);
        self
    }

    pub fn paginated(mut self, page: PageMeta) -> Self {
        self.page = Some(page);
        self
    }

    fn nodes(&self) -> &[Node] {
        match &self.data {
            Primary::One(n) => std::slice::from_ref(n),
            Primary::Many(ns) => ns,
        }
    }
}

pub struct DocumentSerializer<'r> {
    registry: &'r ResourceTypeRegistry,
}

impl<'r> DocumentSerializer<'r> {
    pub fn new(registry: &'r ResourceTypeRegistry) -> Self { Self { registry } }

    /// Build the full document. Any accessor or registry failure aborts the
    /// whole call; no partial document is returned.
    pub fn serialize(&self, input: &Resources, ctx: &RequestContext, meta: Map<String, Value>) -> CodecResult<Document> {
        let started = Instant::now();
        let mut walk = Walk::new(self.registry, ctx);
        let result = walk.document(input, meta);
        match &result {
            Ok(doc) => {
                counter!("jsonapi_documents_total", 1u64, "kind" => "data");
                counter!("jsonapi_included_resources_total", doc.included.len() as u64);
                counter!("jsonapi_dedup_hits_total", walk.dedup_hits);
                histogram!("jsonapi_serialize_ms", started.elapsed().as_secs_f64() * 1000.0);
                debug!(
                    primary = doc.data.resources().len(),
                    included = doc.included.len(),
                    dedup_hits = walk.dedup_hits,
                    key_case = %ctx.key_case(),
                    "serialized document"
                );
            }
            Err(e) => {
                counter!("jsonapi_codec_failures_total", 1u64, "kind" => e.kind());
            }
        }
        result
    }
}

/// Relationship targets already fetched for one emitted object.
struct Entry<'r> {
    descriptor: &'r ResourceDescriptor,
    related: Vec<SmallVec<[Node; 4]>>,
}

/// State of one serialization call.
struct Walk<'r, 'c> {
    registry: &'r ResourceTypeRegistry,
    ctx: &'c RequestContext,
    entries: Vec<Entry<'r>>,
    /// Internal identifier -> entry index.
    seen: FxHashMap<ResourceIdentifier, usize>,
    /// `(entry, include path)` pairs already expanded.
    walked: FxHashSet<(usize, String)>,
    dedup_hits: u64,
}

impl<'r, 'c> Walk<'r, 'c> {
    fn new(registry: &'r ResourceTypeRegistry, ctx: &'c RequestContext) -> Self {
        Self {
            registry,
            ctx,
            entries: Vec::new(),
            seen: FxHashMap::default(),
            walked: FxHashSet::default(),
            dedup_hits: 0,
        }
    }

    fn document(&mut self, input: &Resources, meta: Map<String, Value>) -> CodecResult<Document> {
        let mut data: Vec<ResourceObject> = Vec::with_capacity(input.nodes().len());
        let mut data_index: FxHashMap<usize, usize> = FxHashMap::default();
        for node in input.nodes() {
            let (descriptor, ident) = self.registry.identify(node.as_ref())?;
            match self.seen.get(&ident) {
                // Same object listed twice as primary data: repeat it, don't refetch.
                Some(entry) => data.push(data[data_index[entry]].clone()),
                None => {
                    let (entry, obj) = self.emit(node, descriptor, ident)?;
                    data_index.insert(entry, data.len());
                    data.push(obj);
                }
            }
        }

        let mut included = Vec::new();
        let tree = IncludeTree::from_paths(self.ctx.includes());
        if !tree.is_empty() {
            for entry in 0..self.entries.len() {
                self.walk(entry, &tree, "", &mut included)?;
            }
        }

        let data = match input.data {
            Primary::One(_) => PrimaryData::One(Box::new(data.remove(0))),
            Primary::Many(_) => PrimaryData::Many(data),
        };
        Ok(Document { data, included, meta: build_meta(meta, input, self.ctx.key_case()) })
    }

    /// Serialize one object and remember it under `ident`.
    fn emit(&mut self, node: &Node, descriptor: &'r ResourceDescriptor, ident: ResourceIdentifier) -> CodecResult<(usize, ResourceObject)> {
        let obj = node.as_ref();
        let case = self.ctx.key_case();
        let fields = self.ctx.fields().fields_for(descriptor.kind());

        let mut attributes = Map::new();
        for attr in descriptor.attributes() {
            if !fields.allows(attr.name()) {
                continue;
            }
            let value = attr.read(obj, self.ctx).map_err(|e| accessor_error(descriptor, &ident.id, attr.name(), e))?;
            attributes.insert(case.to_wire(attr.name()).into_owned(), value);
        }

        let mut relationships = Relationships::default();
        let mut related = Vec::with_capacity(descriptor.relationships().len());
        for rel in descriptor.relationships() {
            let targets = rel.read(obj, self.ctx).map_err(|e| accessor_error(descriptor, &ident.id, rel.name(), e))?;
            let mut ids = Vec::with_capacity(targets.nodes().len());
            for target in targets.nodes() {
                let (_, target_ident) = self.registry.identify(target.as_ref())?;
                ids.push(wire_identifier(target_ident, case));
            }
            let (data, nodes): (Linkage, SmallVec<[Node; 4]>) = match targets {
                Related::One(n) => (ids.pop().map(Linkage::One).unwrap_or(Linkage::Empty), n.into_iter().collect()),
                Related::Many(ns) => (Linkage::Many(ids), SmallVec::from_vec(ns)),
            };
            relationships.insert(case.to_wire(rel.name()).into_owned(), Relationship { data });
            related.push(nodes);
        }

        let obj = ResourceObject {
            id: ident.id.clone(),
            kind: case.to_wire(descriptor.kind()).into_owned(),
            attributes,
            relationships,
        };
        let entry = self.entries.len();
        self.entries.push(Entry { descriptor, related });
        self.seen.insert(ident, entry);
        Ok((entry, obj))
    }

    /// Follow `tree` from an emitted object, appending first sightings to
    /// `included`. Already-emitted objects are still traversed for deeper
    /// segments.
    fn walk(&mut self, entry: usize, tree: &IncludeTree, prefix: &str, included: &mut Vec<ResourceObject>) -> CodecResult<()> {
        let descriptor = self.entries[entry].descriptor;
        for (name, sub) in tree.children() {
            let Some(pos) = descriptor.relationships().iter().position(|r| r.name() == name) else {
                continue;
            };
            let targets = self.entries[entry].related[pos].clone();
            let path = if prefix.is_empty() { name.to_string() } else { format!("{prefix}.{name}") };
            for target in &targets {
                let (target_descriptor, ident) = self.registry.identify(target.as_ref())?;
                let idx = match self.seen.get(&ident) {
                    Some(&idx) => {
                        self.dedup_hits += 1;
                        idx
                    }
                    None => {
                        let (idx, obj) = self.emit(target, target_descriptor, ident)?;
                        included.push(obj);
                        idx
                    }
                };
                if !sub.is_empty() && self.walked.insert((idx, path.clone())) {
                    self.walk(idx, sub, &path, included)?;
                }
            }
        }
        Ok(())
    }
}

fn wire_identifier(ident: ResourceIdentifier, case: KeyCase) -> ResourceIdentifier {
    ResourceIdentifier { kind: case.to_wire(&ident.kind).into_owned(), id: ident.id }
}

fn accessor_error(descriptor: &ResourceDescriptor, id: &str, field: &str, source: anyhow::Error) -> CodecError {
    CodecError::Accessor { kind: descriptor.kind().to_string(), id: id.to_string(), field: field.to_string(), source }
}

fn build_meta(meta: Map<String, Value>, input: &Resources, case: KeyCase) -> Map<String, Value> {
    let mut out = case.keys_to_wire(meta);
    if let Some(page) = input.page {
        out.insert("total".into(), page.total.into());
        out.insert(case.to_wire("current_page").into_owned(), page.current_page.into());
        out.insert(case.to_wire("total_pages").into_owned(), page.total_pages.into());
    }
    if let Some(total) = input.total {
        out.insert("total".into(), total.into());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use japi_params::{PageParams, SparseFields};
    use japi_registry::node;
    use serde_json::json;

    struct Tag {
        id: u32,
        label: &'static str,
    }

    fn registry() -> ResourceTypeRegistry {
        ResourceTypeRegistry::new()
            .with(
                ResourceDescriptor::builder::<Tag, _>("skill_tags", |t| t.id.to_string())
                    .field("label", |t| t.label)
                    .field("label_length", |t| t.label.len())
                    .build(),
            )
            .unwrap()
    }

    #[test]
    fn single_object_has_no_included_or_meta() {
        let reg = registry();
        let doc = DocumentSerializer::new(&reg)
            .serialize(&Resources::one(node(Tag { id: 1, label: "rust" })), &RequestContext::default(), Map::new())
            .unwrap();
        assert_eq!(
            doc.to_value(),
            json!({
                "data": {
                    "id": "1",
                    "type": "skill-tags",
                    "attributes": { "label": "rust", "label-length": 4 }
                }
            })
        );
    }

    #[test]
    fn underscore_mode_keeps_keys() {
        let reg = registry();
        let ctx = RequestContext::builder().key_case(KeyCase::Underscore).build();
        let doc = DocumentSerializer::new(&reg)
            .serialize(&Resources::many([node(Tag { id: 1, label: "go" })]), &ctx, Map::new())
            .unwrap();
        let v = doc.to_value();
        assert_eq!(v["data"][0]["type"], "skill_tags");
        assert_eq!(v["data"][0]["attributes"]["label_length"], 2);
    }

    #[test]
    fn sparse_fields_use_internal_type_name() {
        let reg = registry();
        let ctx = RequestContext::builder().fields(SparseFields::parse([("skill_tags", "label")])).build();
        let doc = DocumentSerializer::new(&reg)
            .serialize(&Resources::one(node(Tag { id: 1, label: "c" })), &ctx, Map::new())
            .unwrap();
        assert_eq!(doc.to_value()["data"]["attributes"], json!({ "label": "c" }));
    }

    #[test]
    fn meta_keys_are_transformed_and_paging_added() {
        let reg = registry();
        let mut meta = Map::new();
        meta.insert("search_term".into(), json!("ru"));
        let page = PageMeta::new(21, PageParams { number: 2, size: 10 });
        let input = Resources::many([node(Tag { id: 1, label: "rust" })]).paginated(page);
        let doc = DocumentSerializer::new(&reg).serialize(&input, &RequestContext::default(), meta).unwrap();
        let v = doc.to_value();
        assert_eq!(v["meta"], json!({ "search-term": "ru", "total": 21, "current-page": 2, "total-pages": 3 }));
        // Paging travels in meta only.
        assert!(v.get("links").is_none());
    }

    #[test]
    fn explicit_total_without_paging() {
        let reg = registry();
        let input = Resources::many(Vec::new()).with_total(0);
        let doc = DocumentSerializer::new(&reg).serialize(&input, &RequestContext::default(), Map::new()).unwrap();
        assert_eq!(doc.to_value(), json!({ "data": [], "meta": { "total": 0 } }));
    }

    #[test]
    fn duplicate_primary_objects_are_repeated_in_order() {
        let reg = registry();
        let a = node(Tag { id: 1, label: "a" });
        let b = node(Tag { id: 2, label: "b" });
        let input = Resources::many([a.clone(), b, a]);
        let doc = DocumentSerializer::new(&reg).serialize(&input, &RequestContext::default(), Map::new()).unwrap();
        let ids: Vec<_> = doc.data.resources().iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "2", "1"]);
    }

    #[test]
    fn unregistered_primary_is_fatal() {
        let reg = registry();
        let err = DocumentSerializer::new(&reg)
            .serialize(&Resources::one(node(42u8)), &RequestContext::default(), Map::new())
            .unwrap_err();
        assert!(matches!(err, CodecError::UnregisteredType(ref name) if name == "u8"));
        assert!(err.is_internal());
    }
}
