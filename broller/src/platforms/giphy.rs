use std::collections::HashMap;

use async_trait::async_trait;
use serde::Deserialize;

use super::{fetch_json, Catalog, Mode, Platform, PlatformKind};
use crate::error::Result;
use crate::resolver::ContentReference;
use crate::selector::{SelectionPolicy, StreamDescriptor, StreamKind};

const API_BASE: &str = "https://api.giphy.com";
const MEDIA_BASE: &str = "https://media.giphy.com";
const RENDITIONS: [&str; 2] = ["hd", "original"];

#[derive(Debug, Deserialize)]
struct GifResponse {
    data: Gif
}

#[derive(Debug, Deserialize)]
struct Gif {
    #[serde(default)]
    title: String,
    #[serde(default)]
    images: HashMap<String, Image>
}

#[derive(Debug, Deserialize)]
struct Image {
    #[serde(default)]
    mp4: Option<String>,
    #[serde(default)]
    width: Option<String>,
    #[serde(default)]
    height: Option<String>
}

/// Gifs as mp4 through the API, or the public source gif without a key.
pub struct Giphy {
    client: reqwest::Client,
    api_key: Option<String>,
    api_base: String,
    media_base: String
}

impl Giphy {
    pub fn new(client: reqwest::Client, api_key: Option<String>) -> Self {
        Self::with_base_urls(client, api_key, API_BASE, MEDIA_BASE)
    }

    pub fn with_base_urls(
        client: reqwest::Client,
        api_key: Option<String>,
        api_base: impl Into<String>,
        media_base: impl Into<String>
    ) -> Self {
        Self {
            client,
            api_key,
            api_base: api_base.into(),
            media_base: media_base.into()
        }
    }

    fn source_gif(&self, reference: &ContentReference) -> StreamDescriptor {
        StreamDescriptor::new(
            "source",
            StreamKind::Image,
            "image/gif",
            format!("{}/media/{}/source.gif", self.media_base, reference.id)
        )
    }
}

#[async_trait]
impl Platform for Giphy {
    fn kind(&self) -> PlatformKind {
        PlatformKind::Giphy
    }

    async fn catalog(&self, reference: &ContentReference) -> Result<Catalog> {
        let slug = reference.slug.clone().unwrap_or_else(|| "giphy".to_string());
        let mut catalog = Catalog {
            id: reference.id.clone(),
            title: slug.replace('-', " "),
            attribution_url: reference.url.clone(),
            base_name: format!("{slug}-{}", reference.id),
            streams: Vec::new()
        };

        let Some(api_key) = &self.api_key else {
            catalog.streams.push(self.source_gif(reference));
            return Ok(catalog);
        };

        let request = self
            .client
            .get(format!("{}/v1/gifs/{}", self.api_base, reference.id))
            .query(&[("api_key", api_key.as_str())]);
        let response: GifResponse = fetch_json(self.kind(), request).await?;

        if !response.data.title.trim().is_empty() {
            catalog.title = response.data.title.trim().to_string();
        }
        for (name, image) in &response.data.images {
            let Some(mp4) = image.mp4.as_deref().filter(|u| !u.is_empty()) else {
                continue;
            };
            let mut stream = StreamDescriptor::new(name, StreamKind::Video, "video/mp4", mp4);
            let width = image.width.as_deref().and_then(|w| w.parse().ok());
            let height = image.height.as_deref().and_then(|h| h.parse().ok());
            if let (Some(w), Some(h)) = (width, height) {
                stream = stream.with_dimensions(w, h);
            }
            catalog.streams.push(stream);
        }
        Ok(catalog)
    }

    fn policy(&self, kind: StreamKind) -> SelectionPolicy {
        match kind {
            StreamKind::Image => SelectionPolicy::new("image/gif"),
            _ => SelectionPolicy::new("video/mp4").with_priority(RENDITIONS)
        }
    }

    fn wanted(&self, _mode: Mode, _catalog: &Catalog) -> Vec<StreamKind> {
        if self.api_key.is_some() {
            vec![StreamKind::Video]
        } else {
            vec![StreamKind::Image]
        }
    }
}
