//! Where pages come from.

use async_trait::async_trait;
use lcadash_core::{ErrorPayload, ListQueryParams, Page, QueryDescriptor};
use reqwest::StatusCode;

use crate::FetchError;

/// Fetches one page for a descriptor.
///
/// Used as `Arc<dyn PageSource>` by the [`RowLoader`](crate::RowLoader).
#[async_trait]
pub trait PageSource: Send + Sync {
    async fn fetch(&self, descriptor: &QueryDescriptor) -> Result<Page, FetchError>;
}

/// [`PageSource`] over the HTTP list-query endpoint.
#[derive(Debug, Clone)]
pub struct HttpPageSource {
    client: reqwest::Client,
    base_url: String,
}

impl HttpPageSource {
    /// `base_url` is the server root, e.g. `http://localhost:8000`.
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    #[must_use]
    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Builds the `GET /api/{resource}?...` request for a descriptor.
    fn request(&self, descriptor: &QueryDescriptor) -> reqwest::RequestBuilder {
        let url = format!("{}/api/{}", self.base_url, descriptor.resource);
        self.client
            .get(url)
            .query(&ListQueryParams::from(descriptor))
    }
}

/// Maps a non-2xx status to the failure class the cache reports.
fn classify(status: StatusCode, message: String) -> FetchError {
    match status {
        StatusCode::BAD_REQUEST => FetchError::Query(message),
        StatusCode::NOT_FOUND => FetchError::NotFound(message),
        _ => FetchError::Backend(message),
    }
}

#[async_trait]
impl PageSource for HttpPageSource {
    async fn fetch(&self, descriptor: &QueryDescriptor) -> Result<Page, FetchError> {
        let response = self
            .request(descriptor)
            .send()
            .await
            .map_err(|e| FetchError::Backend(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return response
                .json::<Page>()
                .await
                .map_err(|e| FetchError::Backend(e.to_string()));
        }

        let message = match response.json::<ErrorPayload>().await {
            Ok(payload) => payload.error.message,
            Err(_) => status.to_string(),
        };
        Err(classify(status, message))
    }
}
