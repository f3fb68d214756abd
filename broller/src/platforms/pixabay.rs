use std::collections::HashMap;

use async_trait::async_trait;
use serde::Deserialize;

use super::pexels::sized_name;
use super::{fetch_json, with_download_flag, Catalog, Mode, Platform, PlatformKind};
use crate::error::{Error, Result};
use crate::publisher::slugify;
use crate::resolver::ContentReference;
use crate::selector::{SelectionPolicy, StreamDescriptor, StreamKind};

const API_BASE: &str = "https://pixabay.com";
const SIZES: [&str; 4] = ["large", "medium", "small", "tiny"];

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    hits: Vec<Hit>
}

#[derive(Debug, Deserialize)]
struct Hit {
    #[serde(default)]
    tags: String,
    #[serde(default)]
    user: Option<String>,
    #[serde(default)]
    videos: HashMap<String, Rendition>
}

#[derive(Debug, Deserialize)]
struct Rendition {
    #[serde(default)]
    url: String,
    #[serde(default)]
    width: Option<u32>,
    #[serde(default)]
    height: Option<u32>
}

pub struct Pixabay {
    client: reqwest::Client,
    api_key: String,
    base_url: String
}

impl Pixabay {
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
}

#[async_trait]
impl Platform for Pixabay {
    fn kind(&self) -> PlatformKind {
        PlatformKind::Pixabay
    }

    async fn catalog(&self, reference: &ContentReference) -> Result<Catalog> {
        let request = self
            .client
            .get(format!("{}/api/videos/", self.base_url))
            .query(&[("key", self.api_key.as_str()), ("id", reference.id.as_str())]);
        let response: SearchResponse = fetch_json(self.kind(), request).await?;
        let hit = response
            .hits
            .into_iter()
            .next()
            .ok_or_else(|| Error::catalog(self.kind(), format!("no video with id {}", reference.id)))?;

        let tags: Vec<&str> = hit
            .tags
            .split(',')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .collect();
        let slugs: Vec<String> = tags
            .iter()
            .map(|tag| slugify(tag))
            .filter(|slug| !slug.is_empty())
            .collect();
        let stem = if slugs.is_empty() {
            reference.slug.clone().unwrap_or_else(|| "pixabay".to_string())
        } else {
            slugs.join("-")
        };

        let streams = hit
            .videos
            .iter()
            .filter(|(_, rendition)| !rendition.url.is_empty())
            .map(|(size, rendition)| {
                let stream = StreamDescriptor::new(
                    size,
                    StreamKind::Video,
                    "video/mp4",
                    with_download_flag(&rendition.url)
                );
                match (rendition.width, rendition.height) {
                    (Some(w), Some(h)) => stream.with_dimensions(w, h),
                    _ => stream
                }
            })
            .collect();

        let title = match &hit.user {
            Some(user) => format!("{} by {user}", tags.join(", ")),
            None => tags.join(", ")
        };

        Ok(Catalog {
            id: reference.id.clone(),
            title,
            attribution_url: reference.url.clone(),
            base_name: format!("{stem}-{}", reference.id),
            streams
        })
    }

    fn policy(&self, _kind: StreamKind) -> SelectionPolicy {
        SelectionPolicy::new("video/mp4").with_priority(SIZES)
    }

    fn wanted(&self, _mode: Mode, _catalog: &Catalog) -> Vec<StreamKind> {
        vec![StreamKind::Video]
    }

    fn output_name(&self, catalog: &Catalog, stream: &StreamDescriptor) -> String {
        sized_name(catalog, stream)
    }
}
