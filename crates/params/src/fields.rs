//! Sparse fieldsets (`fields[type]=a,b,c`).
//!
//! Restrictions are keyed by internal type name and apply to every occurrence
//! of that type, primary or included. Names that match no registered
//! attribute are ignored.

#![forbid(unsafe_code)]

use japi_core::KeyCase;
use rustc_hash::{FxHashMap, FxHashSet};

/// Attribute names eligible for one type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldSet<'a> {
    All,
    Only(&'a FxHashSet<String>),
}

impl FieldSet<'_> {
    pub fn allows(&self, attribute: &str) -> bool {
        match self {
            FieldSet::All => true,
            FieldSet::Only(set) => set.contains(attribute),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SparseFields {
    by_type: FxHashMap<String, FxHashSet<String>>,
}

impl SparseFields {
    /// No restriction for any type.
    pub fn all() -> Self { Self::default() }

    /// Parse `type => "a,b,c"` pairs as given.
    pub fn parse<I, K, V>(raw: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        Self::parse_with_case(raw, KeyCase::Underscore)
    }

    /// Parse pairs whose type and attribute tokens are in wire casing.
    /// Repeated entries for one type are merged.
    pub fn parse_with_case<I, K, V>(raw: I, case: KeyCase) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut by_type: FxHashMap<String, FxHashSet<String>> = FxHashMap::default();
        for (kind, list) in raw {
            let kind = kind.as_ref().trim();
            if kind.is_empty() {
                continue;
            }
            let set = by_type.entry(case.from_wire(kind).into_owned()).or_default();
            for attr in list.as_ref().split(',').map(str::trim).filter(|s| !s.is_empty()) {
                set.insert(case.from_wire(attr).into_owned());
            }
        }
        Self { by_type }
    }

    pub fn fields_for(&self, kind: &str) -> FieldSet<'_> {
        match self.by_type.get(kind) {
            Some(set) => FieldSet::Only(set),
            None => FieldSet::All,
        }
    }

    pub fn is_empty(&self) -> bool { self.by_type.is_empty() }
}
