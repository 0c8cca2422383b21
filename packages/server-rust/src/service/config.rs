/// Paging limits of the list-query service.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// `take` applied when a request omits it.
    pub default_page_size: u64,
    /// Upper bound on `take`; larger requests are clamped.
    pub max_page_size: u64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            default_page_size: 100,
            max_page_size: 1000,
        }
    }
}
