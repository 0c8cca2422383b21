/// Why a page fetch failed.
///
/// Mirrors the three failure classes of the list-query endpoint. The cache
/// treats all of them alike: back to idle, cached rows untouched, no retry.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    #[error("bad request: {0}")]
    Query(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("backend failure: {0}")]
    Backend(String),
}
