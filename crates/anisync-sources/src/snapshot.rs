use async_trait::async_trait;
use reqwest::Client;
use tracing::info;

use crate::error::SourceError;
use crate::traits::SnapshotSource;

/// Downloads the anime cross-reference XML over HTTP
pub struct HttpSnapshotSource {
    client: Client,
}

impl HttpSnapshotSource {
    pub fn new() -> Result<Self, SourceError> {
        let client = Client::builder()
            .user_agent(concat!("anisync/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| SourceError::http("<client>", e))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl SnapshotSource for HttpSnapshotSource {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, SourceError> {
        info!("Downloading cross-reference snapshot from {}", url);
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| SourceError::http(url, e))?;

        if !response.status().is_success() {
            return Err(SourceError::Response {
                url: url.to_string(),
                message: format!("status {}", response.status()),
            });
        }

        let bytes = response.bytes().await.map_err(|e| SourceError::http(url, e))?;
        info!("Downloaded {} bytes of cross-reference data", bytes.len());
        Ok(bytes.to_vec())
    }
}
