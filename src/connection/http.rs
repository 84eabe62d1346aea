use super::FabricTransport;
use crate::core::{FabricError, RequestParams, Result};
use async_trait::async_trait;
use std::time::Duration;
use tracing::{Level, event};

/// `FabricTransport` over HTTP(S) using reqwest.
#[derive(Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    /// Creates a transport with reqwest defaults (no request timeout).
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }

    /// Creates a transport whose requests fail after `timeout`.
    pub fn with_timeout(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| FabricError::Config(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self { client })
    }

    /// Wraps an existing client (shared connection pool, custom TLS, auth headers).
    pub fn from_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl Default for HttpTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FabricTransport for HttpTransport {
    async fn post(&self, url: &str, params: &RequestParams) -> Result<serde_json::Value> {
        event!(Level::DEBUG, url = %url, params = params.len(), "fabric http post");

        let response = self
            .client
            .post(url)
            .form(params)
            .send()
            .await
            .map_err(|e| FabricError::Transport(format!("POST {} failed: {}", url, e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(FabricError::Transport(format!(
                "POST {} returned HTTP {}: {}",
                url,
                status.as_u16(),
                body.chars().take(200).collect::<String>()
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| FabricError::Transport(format!("reading {} failed: {}", url, e)))?;
        serde_json::from_str(&body).map_err(|e| {
            FabricError::MalformedResponse(format!("{} did not return JSON: {}", url, e))
        })
    }
}
