use async_trait::async_trait;
use wikirpc_core::{Credentials, SearchResult, WikiError};

/// The wire side of one remote wiki. Implementations perform the actual
/// request/response exchange; correlation, routing and cancellation live in
/// [`crate::WikiClient`] and above.
#[async_trait]
pub trait WikiTransport: Send + Sync {
    /// Fetch the rendered HTML of one page.
    async fn page_html(
        &self,
        credentials: Option<&Credentials>,
        page: &str,
    ) -> Result<String, WikiError>;

    /// Run a full-text search. The query is passed through verbatim,
    /// including any wildcard syntax the caller wrapped it in.
    async fn search(
        &self,
        credentials: Option<&Credentials>,
        query: &str,
    ) -> Result<Vec<SearchResult>, WikiError>;

    /// Attempt a login. `Ok(false)` means the server rejected the
    /// credentials; transport-level failures are errors.
    async fn login(&self, credentials: &Credentials) -> Result<bool, WikiError>;
}
