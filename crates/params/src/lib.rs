//! JSON:API request parameters.
//!
//! Turns the raw inputs of one request (headers, `include`, `fields[..]`,
//! `page[..]`) into an immutable `RequestContext`.

#![forbid(unsafe_code)]

pub mod config;
pub mod context;
pub mod fields;
pub mod include;
pub mod negotiate;
pub mod page;

pub use config::CodecConfig;
pub use context::{Actor, RequestContext, RequestContextBuilder};
pub use fields::{FieldSet, SparseFields};
pub use include::IncludeTree;
pub use negotiate::{negotiate, Caller, RequestParts, INCLUDE_HEADER, KEY_TRANSFORM_HEADER, LOCALE_HEADER};
pub use page::{PageMeta, PageParams};
