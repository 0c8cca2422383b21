use lcadash_core::WireError;

/// Malformed or unrecognized list-query descriptor.
///
/// Surfaced to callers as a client error and never retried.
#[derive(Debug, thiserror::Error)]
pub enum QueryError {
    #[error("unknown resource: {resource}")]
    UnknownResource { resource: String },
    #[error("unknown column {column:?} on resource {resource}")]
    UnknownColumn { resource: String, column: String },
    #[error("invalid parameter {name}: {reason}")]
    InvalidParameter { name: &'static str, reason: String },
    #[error(transparent)]
    Wire(#[from] WireError),
}
