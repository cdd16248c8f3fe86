//! Error objects and their wire document.
//!
//! Errors are produced outside the codec (validation, authorization) and only
//! rendered here. The collection keeps insertion order and never deduplicates.

#![forbid(unsafe_code)]

use serde::Serialize;

use crate::KeyCase;

/// Status used when an error is added without one.
pub const DEFAULT_ERROR_STATUS: u16 = 422;

/// What an error points at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorSource {
    /// Internal attribute name; rendered as `/data/attributes/<wire name>`.
    Attribute(String),
    /// JSON pointer, rendered verbatim.
    Pointer(String),
}

impl ErrorSource {
    /// Strings starting with `/` are pointers, anything else names an attribute.
    pub fn parse(raw: &str) -> Self {
        if raw.starts_with('/') {
            ErrorSource::Pointer(raw.to_string())
        } else {
            ErrorSource::Attribute(raw.to_string())
        }
    }

    fn pointer(&self, case: KeyCase) -> String {
        match self {
            ErrorSource::Attribute(attr) => format!("/data/attributes/{}", case.to_wire(attr)),
            ErrorSource::Pointer(p) => p.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorObject {
    pub status: u16,
    pub code: Option<String>,
    pub detail: String,
    pub source: Option<ErrorSource>,
}

impl ErrorObject {
    pub fn new(status: u16, detail: impl Into<String>) -> Self {
        Self { status, code: None, detail: detail.into(), source: None }
    }

    /// Validation failure on a single attribute (status 422).
    pub fn invalid(attribute: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::new(DEFAULT_ERROR_STATUS, detail).with_source(ErrorSource::Attribute(attribute.into()))
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    pub fn with_source(mut self, source: ErrorSource) -> Self {
        self.source = Some(source);
        self
    }

    pub fn to_wire(&self, case: KeyCase) -> WireError {
        WireError {
            status: self.status,
            code: self.code.clone(),
            detail: self.detail.clone(),
            source: self.source.as_ref().map(|s| WireSource { pointer: s.pointer(case) }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WireSource {
    pub pointer: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WireError {
    pub status: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    pub detail: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<WireSource>,
}

/// `{"errors": [...]}`. The key is always present, even when empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorDocument {
    pub errors: Vec<WireError>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorObjectCollection {
    errors: Vec<ErrorObject>,
}

impl ErrorObjectCollection {
    pub fn new() -> Self { Self::default() }

    /// Append one error. `source` is either a JSON pointer (leading `/`) or an
    /// attribute name.
    pub fn add(&mut self, status: u16, detail: impl Into<String>, code: Option<&str>, source: Option<&str>) {
        let mut err = ErrorObject::new(status, detail);
        err.code = code.map(str::to_string);
        err.source = source.map(ErrorSource::parse);
        self.errors.push(err);
    }

    pub fn push(&mut self, err: ErrorObject) { self.errors.push(err); }

    /// One 422 error per `(attribute, message)` pair, in input order.
    pub fn from_field_errors<I, A, M>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (A, M)>,
        A: Into<String>,
        M: Into<String>,
    {
        Self { errors: pairs.into_iter().map(|(a, m)| ErrorObject::invalid(a, m)).collect() }
    }

    pub fn len(&self) -> usize { self.errors.len() }
    pub fn is_empty(&self) -> bool { self.errors.is_empty() }
    pub fn iter(&self) -> std::slice::Iter<'_, ErrorObject> { self.errors.iter() }

    /// Response status for the whole document: the first error's status.
    pub fn status(&self) -> u16 {
        self.errors.first().map(|e| e.status).unwrap_or(DEFAULT_ERROR_STATUS)
    }

    pub fn to_document(&self, case: KeyCase) -> ErrorDocument {
        ErrorDocument { errors: self.errors.iter().map(|e| e.to_wire(case)).collect() }
    }
}

impl Extend<ErrorObject> for ErrorObjectCollection {
    fn extend<T: IntoIterator<Item = ErrorObject>>(&mut self, iter: T) {
        self.errors.extend(iter);
    }
}

impl<'a> IntoIterator for &'a ErrorObjectCollection {
    type Item = &'a ErrorObject;
    type IntoIter = std::slice::Iter<'a, ErrorObject>;
    fn into_iter(self) -> Self::IntoIter { self.errors.iter() }
}
