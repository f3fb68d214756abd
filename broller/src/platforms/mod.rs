//! One [`Platform`] per supported site. The resolver detects the platform and
//! the registry hands out the matching implementation.

mod giphy;
mod iconfinder;
mod pexels;
mod pixabay;
mod unsplash;
mod youtube;

use std::collections::HashMap;
use std::fmt;

use async_trait::async_trait;
use serde::de::DeserializeOwned;

pub use giphy::Giphy;
pub use iconfinder::Iconfinder;
pub use pexels::Pexels;
pub use pixabay::Pixabay;
pub use unsplash::Unsplash;
pub use youtube::YouTube;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::resolver::ContentReference;
use crate::selector::{SelectionPolicy, StreamDescriptor, StreamKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PlatformKind {
    YouTube,
    Pexels,
    Pixabay,
    Giphy,
    Unsplash,
    Iconfinder
}

impl PlatformKind {
    pub const ALL: [PlatformKind; 6] = [
        Self::YouTube,
        Self::Pexels,
        Self::Pixabay,
        Self::Giphy,
        Self::Unsplash,
        Self::Iconfinder
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::YouTube => "YouTube",
            Self::Pexels => "Pexels",
            Self::Pixabay => "Pixabay",
            Self::Giphy => "Giphy",
            Self::Unsplash => "Unsplash",
            Self::Iconfinder => "Iconfinder"
        }
    }
}

impl fmt::Display for PlatformKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which parts of a timed asset the user wants.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum Mode {
    #[default]
    Both,
    Audio,
    Video
}

/// Everything a platform knows about one piece of content.
#[derive(Debug, Clone)]
pub struct Catalog {
    pub id: String,
    pub title: String,
    pub attribution_url: String,
    /// Content based name used for cache keys and as the default output name.
    pub base_name: String,
    pub streams: Vec<StreamDescriptor>
}

#[async_trait]
pub trait Platform: Send + Sync {
    fn kind(&self) -> PlatformKind;

    /// Looks up the remote catalog for `reference`.
    async fn catalog(&self, reference: &ContentReference) -> Result<Catalog>;

    fn policy(&self, kind: StreamKind) -> SelectionPolicy;

    /// Stream kinds to fetch, in fetch order.
    fn wanted(&self, mode: Mode, catalog: &Catalog) -> Vec<StreamKind>;

    fn output_name(&self, catalog: &Catalog, _stream: &StreamDescriptor) -> String {
        catalog.base_name.clone()
    }

    fn watermark_text(&self, _catalog: &Catalog) -> Option<String> {
        None
    }
}

enum Slot {
    Enabled(Box<dyn Platform>),
    Disabled { variable: &'static str }
}

#[derive(Default)]
pub struct PlatformRegistry {
    slots: HashMap<PlatformKind, Slot>
}

impl PlatformRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers every platform. The ones whose API key is missing are
    /// disabled up front and answer with [`Error::CredentialMissing`].
    pub fn from_config(config: &Config, client: &reqwest::Client) -> Self {
        let mut registry = Self::new();
        let keys = &config.keys;

        registry.register(Box::new(YouTube::from_config(config)));
        registry.register(Box::new(Giphy::new(client.clone(), keys.giphy.clone())));
        if keys.giphy.is_none() {
            tracing::warn!("GIPHY_API_KEY is not set, Giphy downloads fall back to the source gif");
        }

        match &keys.pexels {
            Some(key) => registry.register(Box::new(Pexels::new(client.clone(), key.clone()))),
            None => registry.disable(PlatformKind::Pexels, "PEXELS_API_KEY")
        }
        match &keys.pixabay {
            Some(key) => registry.register(Box::new(Pixabay::new(client.clone(), key.clone()))),
            None => registry.disable(PlatformKind::Pixabay, "PIXABAY_API_KEY")
        }
        match &keys.unsplash {
            Some(key) => registry.register(Box::new(Unsplash::new(client.clone(), key.clone()))),
            None => registry.disable(PlatformKind::Unsplash, "UNSPLASH_ACCESS_KEY")
        }
        match &keys.iconfinder {
            Some(key) => registry.register(Box::new(Iconfinder::new(client.clone(), key.clone()))),
            None => registry.disable(PlatformKind::Iconfinder, "ICONFINDER_API_KEY")
        }

        registry
    }

    pub fn register(&mut self, platform: Box<dyn Platform>) {
        self.slots.insert(platform.kind(), Slot::Enabled(platform));
    }

    pub fn disable(&mut self, kind: PlatformKind, variable: &'static str) {
        tracing::warn!("There is no API key for {}, set {} to enable it", kind, variable);
        self.slots.insert(kind, Slot::Disabled { variable });
    }

    pub fn get(&self, kind: PlatformKind) -> Result<&dyn Platform> {
        match self.slots.get(&kind) {
            Some(Slot::Enabled(platform)) => Ok(platform.as_ref()),
            Some(Slot::Disabled { variable }) => Err(Error::CredentialMissing {
                platform: kind,
                variable: *variable
            }),
            None => Err(Error::UnrecognizedSource(format!("{kind} links")))
        }
    }

    /// Every known platform with the variable that would enable it, if any.
    pub fn status(&self) -> Vec<(PlatformKind, Option<&'static str>)> {
        PlatformKind::ALL
            .iter()
            .filter_map(|kind| match self.slots.get(kind)? {
                Slot::Enabled(_) => Some((*kind, None)),
                Slot::Disabled { variable } => Some((*kind, Some(*variable)))
            })
            .collect()
    }
}

async fn fetch_json<T: DeserializeOwned>(
    platform: PlatformKind,
    request: reqwest::RequestBuilder
) -> Result<T> {
    let response = request
        .send()
        .await
        .map_err(|e| Error::catalog(platform, e))?;
    let status = response.status();
    if !status.is_success() {
        return Err(Error::catalog(platform, format!("HTTP {status}")));
    }
    response
        .json::<T>()
        .await
        .map_err(|e| Error::catalog(platform, e))
}

/// Asks the media host for an attachment instead of an inline preview.
fn with_download_flag(link: &str) -> String {
    match url::Url::parse(link) {
        Ok(mut url) => {
            url.query_pairs_mut().append_pair("download", "1");
            url.to_string()
        }
        Err(_) => link.to_string()
    }
}

/// `ocean-waves` becomes `Ocean Waves`.
fn title_from_slug(slug: &str) -> String {
    slug.split('-')
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            chars.next().map_or_else(String::new, |first| {
                first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect()
            })
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ApiKeys;

    #[test]
    fn test_missing_keys_disable_platforms() {
        let config = Config {
            keys: ApiKeys {
                pexels: Some("key".to_string()),
                ..ApiKeys::default()
            },
            ..Config::default()
        };
        let registry = PlatformRegistry::from_config(&config, &reqwest::Client::new());

        assert!(registry.get(PlatformKind::YouTube).is_ok());
        assert!(registry.get(PlatformKind::Pexels).is_ok());
        assert!(registry.get(PlatformKind::Giphy).is_ok());
        assert!(matches!(
            registry.get(PlatformKind::Unsplash),
            Err(Error::CredentialMissing {
                variable: "UNSPLASH_ACCESS_KEY",
                ..
            })
        ));

        let disabled: Vec<_> = registry
            .status()
            .into_iter()
            .filter_map(|(kind, variable)| variable.map(|_| kind))
            .collect();
        assert_eq!(
            disabled,
            vec![PlatformKind::Pixabay, PlatformKind::Unsplash, PlatformKind::Iconfinder]
        );
    }

    #[test]
    fn test_unregistered_platform_is_unrecognized() {
        let registry = PlatformRegistry::new();
        assert!(matches!(
            registry.get(PlatformKind::Pexels),
            Err(Error::UnrecognizedSource(_))
        ));
    }

    #[test]
    fn test_helpers() {
        assert_eq!(title_from_slug("ocean-waves-at-dusk"), "Ocean Waves At Dusk");
        assert_eq!(
            with_download_flag("https://videos.pexels.com/video-files/1/file.mp4"),
            "https://videos.pexels.com/video-files/1/file.mp4?download=1"
        );
        assert_eq!(
            with_download_flag("https://cdn.pixabay.com/v.mp4?token=abc"),
            "https://cdn.pixabay.com/v.mp4?token=abc&download=1"
        );
    }
}
