use async_trait::async_trait;
use reqwest::header::{ACCEPT, AUTHORIZATION};
use serde::Deserialize;
use url::Url;

use super::{fetch_json, Catalog, Mode, Platform, PlatformKind};
use crate::error::{Error, Result};
use crate::publisher::slugify;
use crate::resolver::ContentReference;
use crate::selector::{SelectionPolicy, StreamDescriptor, StreamKind};

const API_BASE: &str = "https://api.iconfinder.com";

#[derive(Debug, Deserialize)]
struct Icon {
    icon_id: u64,
    #[serde(default)]
    tags: Vec<String>,
    iconset: Iconset,
    #[serde(default)]
    vector_sizes: Vec<VectorSize>
}

#[derive(Debug, Deserialize)]
struct Iconset {
    name: String
}

#[derive(Debug, Deserialize)]
struct VectorSize {
    #[serde(default)]
    formats: Vec<VectorFormat>
}

#[derive(Debug, Deserialize)]
struct VectorFormat {
    format: String,
    download_url: String
}

pub struct Iconfinder {
    client: reqwest::Client,
    api_key: String,
    base_url: String
}

impl Iconfinder {
    pub fn new(client: reqwest::Client, api_key: String) -> Self {
        Self::with_base_url(client, api_key, API_BASE)
    }

    pub fn with_base_url(client: reqwest::Client, api_key: String, base_url: impl Into<String>) -> Self {
        Self {
            client,
            api_key,
            base_url: base_url.into()
        }
    }

    fn bearer(&self) -> String {
        format!("Bearer {}", self.api_key)
    }

    // Download urls may be relative to the API host.
    fn absolute(&self, link: &str) -> Result<String> {
        let base = Url::parse(&self.base_url).map_err(|e| Error::catalog(self.kind(), e))?;
        base.join(link)
            .map(String::from)
            .map_err(|e| Error::catalog(self.kind(), e))
    }
}

#[async_trait]
impl Platform for Iconfinder {
    fn kind(&self) -> PlatformKind {
        PlatformKind::Iconfinder
    }

    async fn catalog(&self, reference: &ContentReference) -> Result<Catalog> {
        let request = self
            .client
            .get(format!("{}/v4/icons/{}", self.base_url, reference.id))
            .header(ACCEPT, "application/json")
            .header(AUTHORIZATION, self.bearer());
        let icon: Icon = fetch_json(self.kind(), request).await?;

        let svg = icon
            .vector_sizes
            .first()
            .and_then(|size| size.formats.iter().find(|f| f.format == "svg"))
            .ok_or_else(|| Error::catalog(self.kind(), "icon has no svg rendition"))?;
        let stream = StreamDescriptor::new("svg", StreamKind::Vector, "image/svg+xml", self.absolute(&svg.download_url)?)
            .with_header("Authorization", self.bearer());

        let base_name = [icon.icon_id.to_string(), slugify(&icon.iconset.name)]
            .into_iter()
            .chain(icon.tags.iter().map(|tag| slugify(tag)))
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join("-");

        Ok(Catalog {
            id: reference.id.clone(),
            title: icon.iconset.name,
            attribution_url: reference.url.clone(),
            base_name,
            streams: vec![stream]
        })
    }

    fn policy(&self, _kind: StreamKind) -> SelectionPolicy {
        SelectionPolicy::new("image/svg+xml")
    }

    fn wanted(&self, _mode: Mode, _catalog: &Catalog) -> Vec<StreamKind> {
        vec![StreamKind::Vector]
    }
}
