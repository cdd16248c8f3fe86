//! Build a `RequestContext` from raw request parts.
//!
//! Headers and query pairs are read here exactly once; everything downstream
//! works off the resolved context.

#![forbid(unsafe_code)]

use japi_core::KeyCase;
use tracing::{debug, warn};

use crate::{include, Actor, CodecConfig, PageParams, RequestContext, SparseFields};

pub const KEY_TRANSFORM_HEADER: &str = "X-API-KEY-TRANSFORM";
pub const LOCALE_HEADER: &str = "X-API-LOCALE";
pub const INCLUDE_HEADER: &str = "X-API-INCLUDE";

/// Transport-agnostic view of the parts of a request the codec consumes.
#[derive(Debug, Clone, Default)]
pub struct RequestParts {
    headers: Vec<(String, String)>,
    query: Vec<(String, String)>,
}

impl RequestParts {
    pub fn new() -> Self { Self::default() }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn with_query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((name.into(), value.into()));
        self
    }

    /// First header with this name, case-insensitive.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.iter().find(|(k, _)| k.eq_ignore_ascii_case(name)).map(|(_, v)| v.as_str())
    }

    pub fn query(&self, name: &str) -> Option<&str> {
        self.query.iter().find(|(k, _)| k == name).map(|(_, v)| v.as_str())
    }

    /// `fields[<type>]` pairs as `(type, list)`.
    pub fn field_params(&self) -> impl Iterator<Item = (&str, &str)> {
        self.query.iter().filter_map(|(k, v)| {
            let kind = k.strip_prefix("fields[")?.strip_suffix(']')?;
            Some((kind, v.as_str()))
        })
    }
}

/// Who is asking, as far as the codec cares.
#[derive(Clone, Default)]
pub struct Caller<'a> {
    pub actor: Option<Actor>,
    /// The actor's stored locale preference.
    pub locale: Option<&'a str>,
}

/// Resolve key case, locale, includes, sparse fields and paging for one
/// request. `allowed_includes` is the endpoint's allow-list in internal casing.
pub fn negotiate<I, S>(parts: &RequestParts, cfg: &CodecConfig, allowed_includes: I, caller: Caller<'_>) -> RequestContext
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let key_case = KeyCase::resolve(parts.header(KEY_TRANSFORM_HEADER), cfg.default_key_case);
    let locale = resolve_locale(parts.header(LOCALE_HEADER), caller.locale, cfg);

    let raw_include = parts.query("include").or_else(|| parts.header(INCLUDE_HEADER));
    let includes = include::resolve(raw_include, allowed_includes, key_case);
    let fields = SparseFields::parse_with_case(parts.field_params(), key_case);

    let mut builder = RequestContext::builder()
        .locale(locale)
        .key_case(key_case)
        .includes(includes)
        .fields(fields);
    if parts.query("page[number]").is_some() || parts.query("page[size]").is_some() {
        builder = builder.page(PageParams::from_query(parts.query("page[number]"), parts.query("page[size]"), cfg));
    }
    if let Some(actor) = caller.actor {
        builder = builder.actor(actor);
    }
    let ctx = builder.build();
    debug!(key_case = %ctx.key_case(), locale = ctx.locale(), includes = ?ctx.includes(), "negotiated request context");
    ctx
}

fn resolve_locale(header: Option<&str>, actor_locale: Option<&str>, cfg: &CodecConfig) -> String {
    if let Some(raw) = header {
        let raw = raw.trim();
        if cfg.is_available_locale(raw) {
            return raw.to_string();
        }
        warn!(locale = raw, "requested locale is not available; using default");
        return cfg.default_locale.clone();
    }
    match actor_locale {
        Some(l) if cfg.is_available_locale(l) => l.to_string(),
        _ => cfg.default_locale.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    const JOB_INCLUDES: [&str; 4] = ["owner", "company", "job_skills", "job_skills.skill"];

    fn caller() -> Caller<'static> { Caller::default() }

    #[test]
    fn defaults_without_headers() {
        let ctx = negotiate(&RequestParts::new(), &CodecConfig::default(), JOB_INCLUDES, caller());
        assert_eq!(ctx.key_case(), KeyCase::Dash);
        assert_eq!(ctx.locale(), "en");
        assert!(ctx.includes().is_empty());
        assert!(ctx.page().is_none());
    }

    #[test]
    fn key_transform_header_is_case_insensitive() {
        let parts = RequestParts::new().with_header("x-api-key-transform", "underscore");
        let ctx = negotiate(&parts, &CodecConfig::default(), JOB_INCLUDES, caller());
        assert_eq!(ctx.key_case(), KeyCase::Underscore);
    }

    #[test]
    fn include_query_wins_over_header() {
        let parts = RequestParts::new()
            .with_query("include", "owner,secret")
            .with_header(INCLUDE_HEADER, "company");
        let ctx = negotiate(&parts, &CodecConfig::default(), JOB_INCLUDES, caller());
        assert_eq!(ctx.includes(), ["owner".to_string()]);

        let parts = RequestParts::new().with_header(INCLUDE_HEADER, "job-skills.skill");
        let ctx = negotiate(&parts, &CodecConfig::default(), JOB_INCLUDES, caller());
        assert_eq!(ctx.includes(), ["job_skills".to_string(), "job_skills.skill".to_string()]);
    }

    #[test]
    fn sparse_fields_from_query() {
        let parts = RequestParts::new()
            .with_query("fields[jobs]", "name,job-date")
            .with_query("fieldsjobs", "ignored");
        let ctx = negotiate(&parts, &CodecConfig::default(), JOB_INCLUDES, caller());
        assert!(ctx.fields().fields_for("jobs").allows("job_date"));
        assert!(!ctx.fields().fields_for("jobs").allows("hours"));
    }

    #[test]
    fn locale_resolution_order() {
        let cfg = CodecConfig::default();
        let with_actor = |parts: &RequestParts| {
            negotiate(parts, &cfg, JOB_INCLUDES, Caller { actor: Some(Arc::new(1u32)), locale: Some("sv") })
        };
        assert_eq!(with_actor(&RequestParts::new()).locale(), "sv");
        assert_eq!(with_actor(&RequestParts::new().with_header(LOCALE_HEADER, "ar")).locale(), "ar");
        assert_eq!(with_actor(&RequestParts::new().with_header(LOCALE_HEADER, "xx")).locale(), "en");
        assert_eq!(with_actor(&RequestParts::new()).actor_as::<u32>(), Some(&1));
    }

    #[test]
    fn page_params_only_when_requested() {
        let parts = RequestParts::new().with_query("page[number]", "2");
        let ctx = negotiate(&parts, &CodecConfig::default(), JOB_INCLUDES, caller());
        assert_eq!(ctx.page(), Some(PageParams { number: 2, size: 10 }));
    }
}
