use crate::transport::WikiTransport;
use crate::ClientConfig;
use anyhow::Context;
use async_trait::async_trait;
use reqwest::{Client as HttpClient, StatusCode};
use serde_json::{json, Value};
use tracing::{debug, trace};
use wikirpc_core::{Credentials, SearchResult, WikiError};

/// HTTP implementation of [`WikiTransport`], speaking a small JSON call
/// encoding against the wiki's RPC endpoint. Credentials travel as HTTP
/// Basic auth on every request that has them.
pub struct HttpTransport {
    http: HttpClient,
    endpoint: String,
}

impl HttpTransport {
    pub fn new(base_url: &str, config: &ClientConfig) -> anyhow::Result<Self> {
        let http = HttpClient::builder()
            .timeout(std::time::Duration::from_millis(config.timeout_ms))
            .user_agent(config.user_agent.clone())
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            http,
            endpoint: format!("{}/lib/rpc", base_url.trim_end_matches('/')),
        })
    }

    async fn call(
        &self,
        credentials: Option<&Credentials>,
        method: &str,
        params: Value,
    ) -> Result<Value, WikiError> {
        debug!(method, "sending rpc request to {}", self.endpoint);

        let mut request = self
            .http
            .post(&self.endpoint)
            .json(&json!({ "method": method, "params": params }));
        if let Some(creds) = credentials {
            request = request.basic_auth(&creds.username, Some(&creds.password));
        }

        let response = request
            .send()
            .await
            .map_err(|e| WikiError::transport(format!("request failed: {}", e)))?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(WikiError::Auth);
        }

        let text = response
            .text()
            .await
            .map_err(|e| WikiError::transport(format!("failed to read response body: {}", e)))?;

        if !status.is_success() {
            return Err(WikiError::transport(format!("HTTP error {}: {}", status, text)));
        }

        trace!("response body:\n{}", text);

        let value: Value = serde_json::from_str(&text)
            .map_err(|e| WikiError::malformed(format!("unparseable response: {}", e)))?;

        if let Some(error) = value.get("error") {
            let message = error
                .get("message")
                .and_then(|m| m.as_str())
                .unwrap_or("unknown server error");
            return Err(WikiError::transport(format!("server error: {}", message)));
        }

        value
            .get("result")
            .cloned()
            .ok_or_else(|| WikiError::malformed("response carries neither result nor error"))
    }
}

#[async_trait]
impl WikiTransport for HttpTransport {
    async fn page_html(
        &self,
        credentials: Option<&Credentials>,
        page: &str,
    ) -> Result<String, WikiError> {
        let result = self
            .call(credentials, "wiki.getPageHTML", json!([page]))
            .await?;
        result
            .as_str()
            .map(str::to_owned)
            .ok_or_else(|| WikiError::malformed("page result is not a string"))
    }

    async fn search(
        &self,
        credentials: Option<&Credentials>,
        query: &str,
    ) -> Result<Vec<SearchResult>, WikiError> {
        let result = self.call(credentials, "wiki.search", json!([query])).await?;
        Ok(serde_json::from_value(result)?)
    }

    async fn login(&self, credentials: &Credentials) -> Result<bool, WikiError> {
        let result = self
            .call(
                None,
                "wiki.login",
                json!([credentials.username, credentials.password]),
            )
            .await?;
        result
            .as_bool()
            .ok_or_else(|| WikiError::malformed("login result is not a boolean"))
    }
}
