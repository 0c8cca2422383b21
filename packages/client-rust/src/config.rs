//! Row cache tuning.

use std::time::Duration;

/// Configuration of a [`RowCache`](crate::RowCache) and its loader.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowCacheConfig {
    /// Fetch windows are widened to multiples of this many rows.
    pub page_size: u64,
    /// Row-count ceiling: larger totals are reported as this value and rows
    /// past it are never fetched.
    pub max_rows: u64,
    /// Quiescence required before a typed search term is applied.
    pub debounce: Duration,
}

impl Default for RowCacheConfig {
    fn default() -> Self {
        Self {
            page_size: 100,
            max_rows: 50_000,
            debounce: Duration::from_millis(300),
        }
    }
}
