// HTTP client for the CDR backend
//
// One reqwest client is shared by the poller, the filter controller and the
// signup flow. Every call maps failures onto the typed errors callers expect
// instead of letting reqwest errors escape.

use super::{CdrFeed, FetchError, FilteredQuery};
use crate::auth::TokenPair;
use crate::model::Cdr;
use crate::signup::{SignupBackend, SignupError};
use async_trait::async_trait;
use std::time::Duration;

#[derive(Clone)]
pub struct BackendClient {
    client: reqwest::Client,
    base_url: String,
}

impl BackendClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| FetchError::Transport(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Send an authenticated GET and decode a CDR array
    async fn get_cdrs(
        &self,
        path: &str,
        token: &str,
        params: &[(&str, &str)],
    ) -> Result<Vec<Cdr>, FetchError> {
        let response = self
            .client
            .get(self.url(path))
            .bearer_auth(token)
            .query(params)
            .send()
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(FetchError::Status {
                status: status.as_u16(),
                body,
            });
        }

        response
            .json::<Vec<Cdr>>()
            .await
            .map_err(|e| FetchError::Decode(e.to_string()))
    }
}

#[async_trait]
impl CdrFeed for BackendClient {
    async fn fetch_all(&self, token: &str) -> Result<Vec<Cdr>, FetchError> {
        let records = self.get_cdrs("/api/cdrs", token, &[]).await?;
        tracing::debug!("Fetched {} CDRs", records.len());
        Ok(records)
    }

    async fn fetch_filtered(
        &self,
        token: &str,
        query: &FilteredQuery,
    ) -> Result<Vec<Cdr>, FetchError> {
        let params = query.params();
        let records = self.get_cdrs("/api/cdrs/filtered", token, &params).await?;
        tracing::debug!("Fetched {} filtered CDRs ({:?})", records.len(), params);
        Ok(records)
    }
}

#[async_trait]
impl SignupBackend for BackendClient {
    async fn register(&self, username: &str, password: &str) -> Result<TokenPair, SignupError> {
        let response = self
            .client
            .post(self.url("/api/signup"))
            .json(&serde_json::json!({
                "username": username,
                "password": password,
            }))
            .send()
            .await
            .map_err(|e| SignupError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            // Body is the server's own message, shown verbatim
            let text = response
                .text()
                .await
                .map_err(|e| SignupError::Transport(e.to_string()))?;
            return Err(SignupError::Rejected(text));
        }

        response
            .json::<TokenPair>()
            .await
            .map_err(|e| SignupError::Transport(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trailing_slash_is_trimmed() {
        let client = BackendClient::new("http://localhost:8082/", Duration::from_secs(5)).unwrap();
        assert_eq!(client.base_url(), "http://localhost:8082");
        assert_eq!(client.url("/api/cdrs"), "http://localhost:8082/api/cdrs");
    }
}
