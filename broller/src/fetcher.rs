use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, USER_AGENT};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio_stream::StreamExt;

use crate::cache::{ArtifactStore, CacheKey};
use crate::error::{Error, Result};
use crate::selector::StreamDescriptor;

const DEFAULT_USER_AGENT: &str = concat!("b-roller/", env!("CARGO_PKG_VERSION"));

/// Downloads remote streams straight into the cache.
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: reqwest::Client
}

impl Fetcher {
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| Error::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client })
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &reqwest::Client {
        &self.client
    }

    /// Fetches `stream` into the entry for `key`. An existing entry is reused
    /// without touching the network; a failed download leaves no entry.
    pub async fn fetch<S: ArtifactStore + ?Sized>(
        &self,
        store: &S,
        stream: &StreamDescriptor,
        key: &CacheKey
    ) -> Result<CacheKey> {
        if store.has(key) {
            tracing::info!("Using cached {} ({})", key.stage(), key);
            return Ok(key.clone());
        }

        tracing::info!("Downloading {} stream {} into {}", stream.kind, stream.tag, key);
        let staging = store.staging_path(key);
        if let Some(parent) = staging.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| Error::io(parent, e))?;
        }

        let result = match self.download_to(stream, &staging).await {
            Ok(bytes) => {
                tracing::debug!("Downloaded {} bytes from {}", bytes, stream.url);
                store.commit(key).await
            }
            Err(e) => Err(e)
        };

        if let Err(e) = result {
            store.discard(key).await;
            return Err(e);
        }
        Ok(key.clone())
    }

    async fn download_to(&self, stream: &StreamDescriptor, path: &std::path::Path) -> Result<u64> {
        let response = self
            .client
            .get(&stream.url)
            .headers(request_headers(stream)?)
            .send()
            .await
            .map_err(|e| Error::download(&stream.url, e))?;

        if !response.status().is_success() {
            return Err(Error::download(
                &stream.url,
                format!("HTTP {}", response.status())
            ));
        }

        let mut file = fs::File::create(path)
            .await
            .map_err(|e| Error::io(path, e))?;
        let mut body = response.bytes_stream();
        let mut written = 0u64;

        while let Some(chunk) = body.next().await {
            let chunk = chunk.map_err(|e| Error::download(&stream.url, e))?;
            file.write_all(&chunk)
                .await
                .map_err(|e| Error::io(path, e))?;
            written += chunk.len() as u64;
        }
        file.flush().await.map_err(|e| Error::io(path, e))?;

        Ok(written)
    }
}

fn request_headers(stream: &StreamDescriptor) -> Result<HeaderMap> {
    let mut headers = HeaderMap::new();
    headers.insert(USER_AGENT, HeaderValue::from_static(DEFAULT_USER_AGENT));
    for (name, value) in &stream.headers {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| Error::download(&stream.url, e))?;
        let value = HeaderValue::from_str(value)
            .map_err(|e| Error::download(&stream.url, e))?;
        headers.insert(name, value);
    }
    Ok(headers)
}
