//! Per-request context threaded through every serialize/deserialize call.

#![forbid(unsafe_code)]

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use japi_core::KeyCase;

use crate::{PageParams, SparseFields};

/// Opaque current actor. Accessors downcast it to the concrete user type.
pub type Actor = Arc<dyn Any + Send + Sync>;

/// Immutable once built; created fresh per request.
#[derive(Clone)]
pub struct RequestContext {
    actor: Option<Actor>,
    locale: String,
    key_case: KeyCase,
    includes: Vec<String>,
    fields: SparseFields,
    page: Option<PageParams>,
}

impl RequestContext {
    pub fn builder() -> RequestContextBuilder { RequestContextBuilder::default() }

    pub fn actor(&self) -> Option<&Actor> { self.actor.as_ref() }

    /// The actor as `T`, if present and of that type.
    pub fn actor_as<T: Any>(&self) -> Option<&T> {
        self.actor.as_deref().and_then(|a| a.downcast_ref::<T>())
    }

    pub fn locale(&self) -> &str { &self.locale }
    pub fn key_case(&self) -> KeyCase { self.key_case }
    /// Permitted include paths, internal casing.
    pub fn includes(&self) -> &[String] { &self.includes }
    pub fn fields(&self) -> &SparseFields { &self.fields }
    pub fn page(&self) -> Option<PageParams> { self.page }
}

impl Default for RequestContext {
    fn default() -> Self { RequestContext::builder().build() }
}

impl fmt::Debug for RequestContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestContext")
            .field("actor", &self.actor.as_ref().map(|_| "<actor>"))
            .field("locale", &self.locale)
            .field("key_case", &self.key_case)
            .field("includes", &self.includes)
            .field("fields", &self.fields)
            .field("page", &self.page)
            .finish()
    }
}

#[derive(Default)]
pub struct RequestContextBuilder {
    actor: Option<Actor>,
    locale: Option<String>,
    key_case: KeyCase,
    includes: Vec<String>,
    fields: SparseFields,
    page: Option<PageParams>,
}

impl RequestContextBuilder {
    pub fn actor(mut self, actor: Actor) -> Self {
        self.actor = Some(actor);
        self
    }

    pub fn locale(mut self, locale: impl Into<String>) -> Self {
        self.locale = Some(locale.into());
        self
    }

    pub fn key_case(mut self, key_case: KeyCase) -> Self {
        self.key_case = key_case;
        self
    }

    /// Already-permitted include paths in internal casing.
    pub fn includes<I, S>(mut self, includes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.includes = includes.into_iter().map(Into::into).collect();
        self
    }

    pub fn fields(mut self, fields: SparseFields) -> Self {
        self.fields = fields;
        self
    }

    pub fn page(mut self, page: PageParams) -> Self {
        self.page = Some(page);
        self
    }

    pub fn build(self) -> RequestContext {
        RequestContext {
            actor: self.actor,
            locale: self.locale.unwrap_or_else(|| "en".to_string()),
            key_case: self.key_case,
            includes: self.includes,
            fields: self.fields,
            page: self.page,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct User {
        name: &'static str,
    }

    #[test]
    fn defaults() {
        let ctx = RequestContext::default();
        assert!(ctx.actor().is_none());
        assert_eq!(ctx.locale(), "en");
        assert_eq!(ctx.key_case(), KeyCase::Dash);
        assert!(ctx.includes().is_empty());
        assert!(ctx.fields().is_empty());
        assert!(ctx.page().is_none());
    }

    #[test]
    fn actor_downcast() {
        let ctx = RequestContext::builder().actor(Arc::new(User { name: "jane" })).build();
        assert_eq!(ctx.actor_as::<User>().map(|u| u.name), Some("jane"));
        assert!(ctx.actor_as::<String>().is_none());
        assert!(format!("{ctx:?}").contains("<actor>"));
    }
}
