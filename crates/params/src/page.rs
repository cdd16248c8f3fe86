//! Page parameters and pagination meta.

#![forbid(unsafe_code)]

use serde::{Deserialize, Serialize};

use crate::CodecConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageParams {
    /// 1-based.
    pub number: u64,
    pub size: u64,
}

impl PageParams {
    /// `page[number]` and `page[size]` as raw query values. Unparsable values
    /// fall back to defaults; sizes are clamped to `1..=max_per_page`.
    pub fn from_query(number: Option<&str>, size: Option<&str>, cfg: &CodecConfig) -> Self {
        let number = number.and_then(|s| s.trim().parse::<u64>().ok()).unwrap_or(1).max(1);
        let size = size
            .and_then(|s| s.trim().parse::<u64>().ok())
            .unwrap_or(cfg.default_per_page)
            .clamp(1, cfg.max_per_page.max(1));
        Self { number, size }
    }

    /// Number of records to skip.
    pub fn offset(&self) -> u64 { self.number.saturating_sub(1).saturating_mul(self.size) }
}

/// Pagination facts a paginated collection exposes to the serializer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageMeta {
    pub total: u64,
    pub current_page: u64,
    pub total_pages: u64,
}

impl PageMeta {
    pub fn new(total: u64, page: PageParams) -> Self {
        let size = page.size.max(1);
        Self { total, current_page: page.number, total_pages: total.div_ceil(size) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_and_clamping() {
        let cfg = CodecConfig::default();
        assert_eq!(PageParams::from_query(None, None, &cfg), PageParams { number: 1, size: 10 });
        assert_eq!(PageParams::from_query(Some("0"), Some("500"), &cfg), PageParams { number: 1, size: 50 });
        assert_eq!(PageParams::from_query(Some("3"), Some("0"), &cfg), PageParams { number: 3, size: 1 });
        assert_eq!(PageParams::from_query(Some("x"), Some("-2"), &cfg), PageParams { number: 1, size: 10 });
    }

    #[test]
    fn offset_and_total_pages() {
        let page = PageParams { number: 3, size: 10 };
        assert_eq!(page.offset(), 20);
        assert_eq!(PageMeta::new(21, page), PageMeta { total: 21, current_page: 3, total_pages: 3 });
        assert_eq!(PageMeta::new(20, page).total_pages, 2);
        assert_eq!(PageMeta::new(0, page).total_pages, 0);
    }
}
