//! JSON:API codec façade (in-process).
//!
//! Ties the process-wide registry and configuration to the per-request
//! pieces. Transports (HTTP frameworks, test harnesses) call into `Codec` and
//! get back a status plus a JSON body that is either a data document or an
//! error document, never both.

#![forbid(unsafe_code)]

use std::sync::Arc;
use std::time::Instant;

use japi_core::CodecError;
use metrics::counter;
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, error, info};

pub use japi_core::{Document, ErrorDocument, ErrorObject, ErrorObjectCollection, ErrorSource, KeyCase};
pub use japi_deserialize::DeserializedBody;
pub use japi_params::{Actor, Caller, CodecConfig, PageMeta, PageParams, RequestContext, RequestParts};
pub use japi_registry::{node, Node, ResourceDescriptor, ResourceTypeRegistry};
pub use japi_serialize::{Resources, StaticResource};

/// Rendered response: HTTP status plus JSON body.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Response {
    pub status: u16,
    pub body: Value,
}

impl Response {
    pub fn is_error(&self) -> bool { self.status >= 400 }

    /// Same body under another success status (e.g. 201 after a create).
    /// Error responses keep their status.
    pub fn with_status(mut self, status: u16) -> Self {
        if !self.is_error() {
            self.status = status;
        }
        self
    }

    fn data(doc: &Document) -> Self {
        Self { status: 200, body: doc.to_value() }
    }

    fn errors(status: u16, doc: &ErrorDocument) -> Self {
        let body = serde_json::to_value(doc).expect("error document of JSON values always serializes");
        Self { status, body }
    }
}

/// Status and code an error document gets for a codec failure.
fn classify(err: &CodecError) -> (u16, &'static str) {
    if err.is_internal() {
        (500, "internal_error")
    } else {
        (400, "malformed_body")
    }
}

pub struct Codec {
    registry: Arc<ResourceTypeRegistry>,
    config: CodecConfig,
}

impl Codec {
    pub fn new(registry: Arc<ResourceTypeRegistry>, config: CodecConfig) -> Self { Self { registry, config } }

    /// Configuration from `JAPI_*` environment variables.
    pub fn from_env(registry: Arc<ResourceTypeRegistry>) -> Self { Self::new(registry, CodecConfig::from_env()) }

    pub fn registry(&self) -> &ResourceTypeRegistry { &self.registry }
    pub fn config(&self) -> &CodecConfig { &self.config }

    /// Resolve the per-request context. `allowed_includes` is the endpoint's
    /// include allow-list.
    pub fn context<I, S>(&self, parts: &RequestParts, allowed_includes: I, caller: Caller<'_>) -> RequestContext
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        japi_params::negotiate(parts, &self.config, allowed_includes, caller)
    }

    /// Page params for a collection endpoint; defaults apply when the request
    /// carried none.
    pub fn page(&self, ctx: &RequestContext) -> PageParams {
        ctx.page().unwrap_or_else(|| PageParams::from_query(None, None, &self.config))
    }

    pub fn render(&self, input: &Resources, ctx: &RequestContext, meta: Map<String, Value>) -> Response {
        let t0 = Instant::now();
        match japi_serialize::DocumentSerializer::new(&self.registry).serialize(input, ctx, meta) {
            Ok(doc) => {
                info!(took_ms = %t0.elapsed().as_millis(), "api: render ok");
                Response::data(&doc)
            }
            Err(e) => self.failure(e, ctx.key_case()),
        }
    }

    pub fn render_static(&self, items: &[StaticResource], ctx: &RequestContext) -> Response {
        let t0 = Instant::now();
        let doc = japi_serialize::serialize_static(items, ctx);
        info!(count = items.len(), took_ms = %t0.elapsed().as_millis(), "api: render_static ok");
        Response::data(&doc)
    }

    /// Error document for failures reported by the domain layer. The status
    /// is the first error's.
    pub fn render_errors(&self, errors: &ErrorObjectCollection, ctx: &RequestContext) -> Response {
        counter!("jsonapi_documents_total", 1u64, "kind" => "errors");
        info!(count = errors.len(), status = errors.status(), "api: render_errors ok");
        Response::errors(errors.status(), &errors.to_document(ctx.key_case()))
    }

    /// Flatten a request body. A body that is not JSON comes back as a ready
    /// 400 response.
    pub fn parse(&self, body: &[u8], ctx: &RequestContext) -> Result<DeserializedBody, Response> {
        japi_deserialize::deserialize(body, ctx.key_case()).map_err(|e| self.failure(e, ctx.key_case()))
    }

    fn failure(&self, err: CodecError, case: KeyCase) -> Response {
        let (status, code) = classify(&err);
        let detail = if err.is_internal() {
            error!(error = %err, kind = err.kind(), "api: internal codec failure");
            "internal server error".to_string()
        } else {
            debug!(error = %err, "api: rejected request body");
            err.to_string()
        };
        let mut errors = ErrorObjectCollection::new();
        errors.push(ErrorObject::new(status, detail).with_code(code));
        counter!("jsonapi_documents_total", 1u64, "kind" => "errors");
        Response::errors(status, &errors.to_document(case))
    }
}
