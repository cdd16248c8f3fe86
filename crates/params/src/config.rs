//! Process-wide codec settings, read once at startup.

#![forbid(unsafe_code)]

use japi_core::KeyCase;
use serde::{Deserialize, Serialize};
use tracing::warn;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodecConfig {
    /// Mode used when the request does not pick one.
    pub default_key_case: KeyCase,
    pub default_locale: String,
    pub available_locales: Vec<String>,
    pub default_per_page: u64,
    pub max_per_page: u64,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            default_key_case: KeyCase::Dash,
            default_locale: "en".to_string(),
            available_locales: vec!["en".to_string(), "sv".to_string(), "ar".to_string()],
            default_per_page: 10,
            max_per_page: 50,
        }
    }
}

impl CodecConfig {
    /// Read `JAPI_*` environment variables, keeping defaults for anything
    /// missing or unparsable.
    pub fn from_env() -> Self {
        Self::from_lookup(|k| std::env::var(k).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let d = Self::default();
        let default_key_case = match lookup("JAPI_KEY_TRANSFORM") {
            Some(raw) => raw.parse().unwrap_or_else(|_| {
                warn!(value = %raw, "invalid JAPI_KEY_TRANSFORM; expected dash|underscore");
                d.default_key_case
            }),
            None => d.default_key_case,
        };
        let default_locale = lookup("JAPI_DEFAULT_LOCALE")
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or(d.default_locale);
        let available_locales = lookup("JAPI_AVAILABLE_LOCALES")
            .map(|s| s.split(',').map(str::trim).filter(|l| !l.is_empty()).map(str::to_string).collect::<Vec<_>>())
            .filter(|v| !v.is_empty())
            .unwrap_or(d.available_locales);
        let max_per_page = lookup("JAPI_MAX_PER_PAGE")
            .and_then(|s| s.trim().parse::<u64>().ok())
            .filter(|n| *n > 0)
            .unwrap_or(d.max_per_page);
        let default_per_page = lookup("JAPI_DEFAULT_PER_PAGE")
            .and_then(|s| s.trim().parse::<u64>().ok())
            .filter(|n| *n > 0)
            .unwrap_or(d.default_per_page)
            .min(max_per_page);
        Self { default_key_case, default_locale, available_locales, default_per_page, max_per_page }
    }

    pub fn is_available_locale(&self, locale: &str) -> bool {
        self.available_locales.iter().any(|l| l == locale)
    }
}
