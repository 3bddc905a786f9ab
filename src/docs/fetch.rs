use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use super::types::SourceRef;
use crate::error::{RagError, Result};
use crate::retry::RetryPolicy;

/// Raw bytes of one source plus the server's content type, if any.
#[derive(Debug, Clone)]
pub struct Fetched {
    pub bytes: Vec<u8>,
    pub content_type: Option<String>,
}

/// Anything that can retrieve the raw bytes behind a [`SourceRef`].
#[async_trait]
pub trait SourceFetcher: Send + Sync {
    async fn fetch(&self, source: &SourceRef) -> Result<Fetched>;
}

/// HTTP(S) fetcher with a request timeout and optional retry.
pub struct HttpFetcher {
    client: reqwest::Client,
    retry: RetryPolicy,
}

impl HttpFetcher {
    pub fn new(timeout: Duration, retry: RetryPolicy) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RagError::config(format!("failed to create HTTP client: {}", e)))?;
        Ok(Self { client, retry })
    }

    async fn fetch_once(&self, source: &SourceRef) -> Result<Fetched> {
        let resp = self
            .client
            .get(source.as_str())
            .send()
            .await
            .map_err(|e| RagError::fetch(source.as_str(), e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(RagError::fetch(source.as_str(), format!("HTTP {}", status)));
        }

        let content_type = resp
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let bytes = resp
            .bytes()
            .await
            .map_err(|e| RagError::fetch(source.as_str(), format!("reading body: {}", e)))?;

        debug!(source = %source, size = bytes.len(), ?content_type, "fetched");
        Ok(Fetched {
            bytes: bytes.to_vec(),
            content_type,
        })
    }
}

#[async_trait]
impl SourceFetcher for HttpFetcher {
    async fn fetch(&self, source: &SourceRef) -> Result<Fetched> {
        self.retry
            .run(source.as_str(), || self.fetch_once(source))
            .await
    }
}
