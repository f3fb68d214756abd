use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;
use serde::Deserialize;

use super::{fetch_json, title_from_slug, with_download_flag, Catalog, Mode, Platform, PlatformKind};
use crate::error::Result;
use crate::resolver::ContentReference;
use crate::selector::{SelectionPolicy, StreamDescriptor, StreamKind};

const API_BASE: &str = "https://api.pexels.com";

#[derive(Debug, Deserialize)]
struct VideoResponse {
    user: User,
    #[serde(default)]
    video_files: Vec<VideoFile>
}

#[derive(Debug, Deserialize)]
struct User {
    name: String
}

#[derive(Debug, Deserialize)]
struct VideoFile {
    id: u64,
    #[serde(default)]
    file_type: Option<String>,
    #[serde(default)]
    width: Option<u32>,
    #[serde(default)]
    height: Option<u32>,
    link: String
}

pub struct Pexels {
    client: reqwest::Client,
    api_key: String,
    base_url: String
}

impl Pexels {
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
impl Platform for Pexels {
    fn kind(&self) -> PlatformKind {
        PlatformKind::Pexels
    }

    async fn catalog(&self, reference: &ContentReference) -> Result<Catalog> {
        let request = self
            .client
            .get(format!("{}/videos/videos/{}", self.base_url, reference.id))
            .header(AUTHORIZATION, &self.api_key);
        let video: VideoResponse = fetch_json(self.kind(), request).await?;

        let slug = reference.slug.clone().unwrap_or_else(|| "pexels".to_string());
        let streams = video
            .video_files
            .iter()
            .map(|file| {
                let stream = StreamDescriptor::new(
                    file.id.to_string(),
                    StreamKind::Video,
                    file.file_type.as_deref().unwrap_or("video/mp4"),
                    with_download_flag(&file.link)
                );
                match (file.width, file.height) {
                    (Some(w), Some(h)) => stream.with_dimensions(w, h),
                    _ => stream
                }
            })
            .collect();

        Ok(Catalog {
            id: reference.id.clone(),
            title: format!("{} by {}", title_from_slug(&slug), video.user.name),
            attribution_url: reference.url.clone(),
            base_name: format!("{slug}-{}", reference.id),
            streams
        })
    }

    fn policy(&self, _kind: StreamKind) -> SelectionPolicy {
        SelectionPolicy::new("video/mp4")
    }

    fn wanted(&self, _mode: Mode, _catalog: &Catalog) -> Vec<StreamKind> {
        vec![StreamKind::Video]
    }

    fn output_name(&self, catalog: &Catalog, stream: &StreamDescriptor) -> String {
        sized_name(catalog, stream)
    }
}

/// `<slug>-<w>x<h>-<id>`, or the base name when the size is unknown.
pub(super) fn sized_name(catalog: &Catalog, stream: &StreamDescriptor) -> String {
    let Some(stem) = catalog.base_name.strip_suffix(&format!("-{}", catalog.id)) else {
        return catalog.base_name.clone();
    };
    match (stream.width, stream.height) {
        (Some(w), Some(h)) => format!("{stem}-{w}x{h}-{}", catalog.id),
        _ => catalog.base_name.clone()
    }
}
