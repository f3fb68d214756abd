use std::collections::HashMap;

use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;
use serde::Deserialize;

use super::{fetch_json, Catalog, Mode, Platform, PlatformKind};
use crate::error::Result;
use crate::publisher::slugify;
use crate::resolver::ContentReference;
use crate::selector::{SelectionPolicy, StreamDescriptor, StreamKind};

const API_BASE: &str = "https://api.unsplash.com";
const SIZES: [&str; 5] = ["raw", "full", "regular", "small", "thumb"];
const NAME_TAGS: usize = 4;

#[derive(Debug, Deserialize)]
struct Photo {
    #[serde(default)]
    urls: HashMap<String, String>,
    #[serde(default)]
    tags: Vec<Tag>,
    #[serde(default)]
    user: Option<User>
}

#[derive(Debug, Deserialize)]
struct Tag {
    #[serde(default)]
    title: Option<String>
}

#[derive(Debug, Deserialize)]
struct User {
    name: String
}

pub struct Unsplash {
    client: reqwest::Client,
    access_key: String,
    base_url: String
}

impl Unsplash {
    pub fn new(client: reqwest::Client, access_key: String) -> Self {
        Self::with_base_url(client, access_key, API_BASE)
    }

    pub fn with_base_url(client: reqwest::Client, access_key: String, base_url: impl Into<String>) -> Self {
        Self {
            client,
            access_key,
            base_url: base_url.into()
        }
    }
}

#[async_trait]
impl Platform for Unsplash {
    fn kind(&self) -> PlatformKind {
        PlatformKind::Unsplash
    }

    async fn catalog(&self, reference: &ContentReference) -> Result<Catalog> {
        let request = self
            .client
            .get(format!("{}/photos/{}", self.base_url, reference.id))
            .header(AUTHORIZATION, format!("Client-ID {}", self.access_key));
        let photo: Photo = fetch_json(self.kind(), request).await?;

        let tags: Vec<String> = photo
            .tags
            .iter()
            .filter_map(|tag| tag.title.as_deref())
            .map(slugify)
            .filter(|tag| !tag.is_empty())
            .take(NAME_TAGS)
            .collect();
        let base_name = std::iter::once(reference.id.clone())
            .chain(tags)
            .collect::<Vec<_>>()
            .join("-");

        let streams = photo
            .urls
            .iter()
            .map(|(size, url)| StreamDescriptor::new(size, StreamKind::Image, "image/jpeg", url))
            .collect();

        let title = match photo.user {
            Some(user) => format!("Photo by {} on Unsplash", user.name),
            None => format!("Unsplash photo {}", reference.id)
        };

        Ok(Catalog {
            id: reference.id.clone(),
            title,
            attribution_url: reference.url.clone(),
            base_name,
            streams
        })
    }

    fn policy(&self, _kind: StreamKind) -> SelectionPolicy {
        SelectionPolicy::new("image/jpeg").with_priority(SIZES)
    }

    fn wanted(&self, _mode: Mode, _catalog: &Catalog) -> Vec<StreamKind> {
        vec![StreamKind::Image]
    }
}
