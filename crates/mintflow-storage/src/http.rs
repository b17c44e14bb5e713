//! HTTP upload gateway client
//!
//! `PUT {base_url}/upload?name=<display name>` with the raw bytes as body.
//! The gateway answers `{"uri": "..."}` with the permanent locator.

use async_trait::async_trait;
use mintflow_core::{ContentStore, Locator, StorageError};
use reqwest::{header, Client};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Gateway connection settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpStoreConfig {
    pub base_url: String,
    /// Sent as a bearer token when set
    pub api_key: Option<String>,
    pub timeout_secs: u64,
}

impl Default for HttpStoreConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_string(),
            api_key: None,
            timeout_secs: 60,
        }
    }
}

/// Gateway answer to an upload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadReceipt {
    pub uri: String,
}

/// Content store backed by an HTTP upload gateway
#[derive(Debug, Clone)]
pub struct HttpContentStore {
    config: HttpStoreConfig,
    client: Client,
}

impl HttpContentStore {
    /// Build the client
    ///
    /// # Errors
    /// `Transport` if the API key is not a valid header value or the client
    /// cannot be built
    pub fn new(config: HttpStoreConfig) -> Result<Self, StorageError> {
        let mut headers = header::HeaderMap::new();
        if let Some(api_key) = &config.api_key {
            let value = header::HeaderValue::from_str(&format!("Bearer {api_key}"))
                .map_err(|e| StorageError::Transport(format!("invalid api key: {e}")))?;
            headers.insert(header::AUTHORIZATION, value);
        }

        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| StorageError::Transport(e.to_string()))?;

        Ok(Self { config, client })
    }

    #[inline]
    #[must_use]
    pub fn config(&self) -> &HttpStoreConfig {
        &self.config
    }

    fn upload_url(&self) -> String {
        format!("{}/upload", self.config.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl ContentStore for HttpContentStore {
    async fn upload(&self, bytes: &[u8], name: &str) -> Result<Locator, StorageError> {
        let response = self
            .client
            .put(self.upload_url())
            .query(&[("name", name)])
            .header(header::CONTENT_TYPE, "application/octet-stream")
            .body(bytes.to_vec())
            .send()
            .await
            .map_err(|e| StorageError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(StorageError::Server {
                status: status.as_u16(),
                message,
            });
        }

        let receipt: UploadReceipt = response
            .json()
            .await
            .map_err(|e| StorageError::InvalidResponse(e.to_string()))?;
        if receipt.uri.is_empty() {
            return Err(StorageError::InvalidResponse("empty uri in upload receipt".into()));
        }

        tracing::debug!(name, uri = %receipt.uri, "Gateway accepted upload");
        Ok(Locator::new(receipt.uri))
    }
}
