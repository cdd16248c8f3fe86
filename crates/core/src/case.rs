//! Wire key casing.
//!
//! Internal names are snake_case. On the wire they are either dash-case
//! (the default) or left untouched, negotiated once per request.

#![forbid(unsafe_code)]

use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::warn;

/// Key-case mode negotiated per request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyCase {
    /// `job_date` <-> `job-date`
    #[default]
    Dash,
    /// Identity.
    Underscore,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown key transform: {0:?}")]
pub struct UnknownKeyCase(pub String);

impl FromStr for KeyCase {
    type Err = UnknownKeyCase;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "dash" => Ok(KeyCase::Dash),
            "underscore" => Ok(KeyCase::Underscore),
            _ => Err(UnknownKeyCase(s.to_string())),
        }
    }
}

impl fmt::Display for KeyCase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl KeyCase {
    pub fn as_str(self) -> &'static str {
        match self {
            KeyCase::Dash => "dash",
            KeyCase::Underscore => "underscore",
        }
    }

    /// Resolve the mode from a raw header value, falling back when the value
    /// is absent or unrecognised.
    pub fn resolve(raw: Option<&str>, fallback: KeyCase) -> KeyCase {
        match raw {
            None => fallback,
            Some(v) => v.parse().unwrap_or_else(|e: UnknownKeyCase| {
                warn!(error = %e, fallback = %fallback, "ignoring key transform header");
                fallback
            }),
        }
    }

    /// Internal name -> wire name.
    pub fn to_wire(self, key: &str) -> Cow<'_, str> {
        match self {
            KeyCase::Dash if key.contains('_') => Cow::Owned(key.replace('_', "-")),
            _ => Cow::Borrowed(key),
        }
    }

    /// Wire name -> internal name.
    pub fn from_wire(self, key: &str) -> Cow<'_, str> {
        match self {
            KeyCase::Dash if key.contains('-') => Cow::Owned(key.replace('-', "_")),
            _ => Cow::Borrowed(key),
        }
    }

    /// Rename the top-level keys of `map`. Values are left untouched.
    pub fn keys_to_wire(self, map: Map<String, Value>) -> Map<String, Value> {
        if self == KeyCase::Underscore {
            return map;
        }
        map.into_iter().map(|(k, v)| (self.to_wire(&k).into_owned(), v)).collect()
    }

    pub fn keys_from_wire(self, map: Map<String, Value>) -> Map<String, Value> {
        if self == KeyCase::Underscore {
            return map;
        }
        map.into_iter().map(|(k, v)| (self.from_wire(&k).into_owned(), v)).collect()
    }
}
