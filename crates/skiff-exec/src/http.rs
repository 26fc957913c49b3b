//! Remote file fetching over HTTP(S).
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use skiff_core::resolve::{RemoteFetcher, ResolveError};
use skiff_model::FileUri;

use crate::ExecError;

/// [`RemoteFetcher`] for `http://` and `https://` URIs.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> Result<Self, ExecError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ExecError::Http(e.to_string()))?;
        Ok(Self { client })
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    fn supports(uri: &FileUri) -> bool {
        uri.has_scheme("http") || uri.has_scheme("https")
    }
}

#[async_trait]
impl RemoteFetcher for HttpFetcher {
    async fn copy_to(&self, uri: &FileUri, out: &mut tokio::fs::File) -> Result<u64, ResolveError> {
        if !Self::supports(uri) {
            return Err(ResolveError::UnsupportedScheme(uri.to_string()));
        }
        let fetch_err = |reason: String| ResolveError::Fetch {
            uri: uri.to_string(),
            reason,
        };

        let mut resp = self
            .client
            .get(uri.as_str())
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| fetch_err(e.to_string()))?;

        let mut copied = 0u64;
        while let Some(chunk) = resp.chunk().await.map_err(|e| fetch_err(e.to_string()))? {
            out.write_all(&chunk).await?;
            copied += chunk.len() as u64;
        }
        debug!(%uri, bytes = copied, "remote file fetched");
        Ok(copied)
    }
}
