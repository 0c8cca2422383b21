//! HTTP mapping of [`ServiceError`].

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use lcadash_core::{ErrorCode, ErrorPayload};

use crate::service::ServiceError;

impl ServiceError {
    /// Status code and wire error code for this failure class.
    #[must_use]
    pub fn classify(&self) -> (StatusCode, ErrorCode) {
        match self {
            Self::Query(_) => (StatusCode::BAD_REQUEST, ErrorCode::BadRequest),
            Self::NotFound { .. } => (StatusCode::NOT_FOUND, ErrorCode::NotFound),
            Self::Backend(_) => (StatusCode::BAD_GATEWAY, ErrorCode::UpstreamFailure),
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let (status, code) = self.classify();
        (status, Json(ErrorPayload::new(code, self.to_string()))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::QueryError;

    #[test]
    fn each_failure_class_has_its_own_status() {
        let query = ServiceError::from(QueryError::UnknownResource {
            resource: "users".to_string(),
        });
        let missing = ServiceError::not_found("buildings", 7);
        let backend = ServiceError::Backend(anyhow::anyhow!("pool timed out"));

        assert_eq!(
            query.classify(),
            (StatusCode::BAD_REQUEST, ErrorCode::BadRequest)
        );
        assert_eq!(missing.classify(), (StatusCode::NOT_FOUND, ErrorCode::NotFound));
        assert_eq!(
            backend.classify(),
            (StatusCode::BAD_GATEWAY, ErrorCode::UpstreamFailure)
        );
    }

    #[tokio::test]
    async fn response_body_is_an_error_payload() {
        let response = ServiceError::Backend(anyhow::anyhow!("pool timed out")).into_response();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let payload: ErrorPayload = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(payload.error.code, ErrorCode::UpstreamFailure);
        assert_eq!(payload.error.message, "row store failure: pool timed out");
    }
}
