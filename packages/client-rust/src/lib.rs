//! `lcadash` client: a virtualized row cache over the list-query endpoint.
//!
//! - [`RowCache`]: synchronous cache state machine keyed by query
//! - [`RowLoader`]: runs the cache's fetches on tokio
//! - [`PageSource`] / [`HttpPageSource`]: where pages come from
//! - [`DebouncedInput`]: pending-input timer for search boxes

pub mod cache;
pub mod config;
pub mod debounce;
pub mod error;
pub mod loader;
pub mod source;

pub use cache::{
    CacheState, FetchOutcome, FetchRequest, FetchTicket, RowCache, RowSlot, Window,
};
pub use config::RowCacheConfig;
pub use debounce::DebouncedInput;
pub use error::FetchError;
pub use loader::RowLoader;
pub use source::{HttpPageSource, PageSource};
