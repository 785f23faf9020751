use anyhow::{bail, Context};
use async_trait::async_trait;
use bytes::Bytes;
use tracing::debug;

use crate::ObjectStore;

/// Storage client for an HTTP object gateway.
///
/// `fetch` GETs any absolute http(s) URI (e.g. a presigned download URL);
/// `store` PUTs under `{base_url}/{key}` and returns that URL as the
/// object's external reference.
pub struct HttpStore {
    base_url: String,
    client: reqwest::Client,
}

impl HttpStore {
    pub fn new(base_url: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(60))
            .build()
            .unwrap_or_default();
        Self { base_url: base_url.into(), client }
    }

    fn object_url(&self, key: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            key.trim_start_matches('/')
        )
    }
}

#[async_trait]
impl ObjectStore for HttpStore {
    async fn fetch(&self, uri: &str) -> anyhow::Result<Bytes> {
        debug!(uri = %uri, "fetching source object");
        let response = self
            .client
            .get(uri)
            .send()
            .await
            .with_context(|| format!("fetching {uri}"))?;
        let status = response.status();
        if !status.is_success() {
            bail!("storage returned {status} for {uri}");
        }
        response.bytes().await.context("reading object body")
    }

    async fn store(&self, key: &str, bytes: Bytes) -> anyhow::Result<String> {
        let url = self.object_url(key);
        debug!(key = %key, len = bytes.len(), "storing object");
        let response = self
            .client
            .put(&url)
            .body(bytes)
            .send()
            .await
            .with_context(|| format!("uploading {key}"))?;
        let status = response.status();
        if !status.is_success() {
            bail!("storage returned {status} for {key}");
        }
        Ok(url)
    }
}
