use crate::query::QueryError;

/// Errors returned by the domain services.
///
/// The three variants map to distinct HTTP outcomes so callers can tell a
/// bad request from a missing row from an upstream failure.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error(transparent)]
    Query(#[from] QueryError),
    #[error("{resource} {id} not found")]
    NotFound { resource: String, id: String },
    #[error("row store failure: {0:#}")]
    Backend(anyhow::Error),
}

impl ServiceError {
    pub(crate) fn not_found(resource: &str, id: impl ToString) -> Self {
        Self::NotFound {
            resource: resource.to_string(),
            id: id.to_string(),
        }
    }
}
