//! One request from link to published file.

use std::path::PathBuf;
use std::sync::Arc;

use media_tools::{Ffmpeg, TrimBounds};

use crate::cache::{ArtifactStore, CacheKey, DiskCache, Stage};
use crate::config::Config;
use crate::credits::CreditsLedger;
use crate::error::{Error, Result};
use crate::fetcher::Fetcher;
use crate::platforms::{Catalog, Mode, PlatformRegistry};
use crate::processor::{MediaTool, Processor};
use crate::publisher::publish;
use crate::resolver::resolve_reference;
use crate::selector::{select, StreamDescriptor, StreamKind};
use crate::timecode::normalize_time;

#[derive(Debug, Clone, Default)]
pub struct Request {
    pub url: String,
    pub mode: Mode,
    pub start: Option<String>,
    pub end: Option<String>,
    pub name: Option<String>,
    pub output_dir: Option<PathBuf>
}

impl Request {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone)]
pub struct Outcome {
    pub output: PathBuf,
    pub title: String,
    pub source_url: String,
    /// A processing step was skipped and a less processed artifact was published.
    pub degraded: bool,
    pub credited: bool
}

pub struct Pipeline {
    registry: PlatformRegistry,
    store: Arc<dyn ArtifactStore>,
    fetcher: Fetcher,
    tool: Arc<dyn MediaTool>,
    ledger: CreditsLedger,
    output_dir: PathBuf,
    watermark: bool
}

impl Pipeline {
    pub fn new(
        registry: PlatformRegistry,
        store: Arc<dyn ArtifactStore>,
        fetcher: Fetcher,
        tool: Arc<dyn MediaTool>,
        ledger: CreditsLedger,
        output_dir: impl Into<PathBuf>
    ) -> Self {
        Self {
            registry,
            store,
            fetcher,
            tool,
            ledger,
            output_dir: output_dir.into(),
            watermark: true
        }
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        let fetcher = Fetcher::new()?;
        let registry = PlatformRegistry::from_config(config, fetcher.client());
        let pipeline = Self::new(
            registry,
            Arc::new(DiskCache::new(&config.cache_dir)),
            fetcher,
            Arc::new(Ffmpeg::with_binary(&config.ffmpeg_path)),
            CreditsLedger::new(&config.credits_file),
            &config.output_dir
        );
        Ok(pipeline.with_watermark(config.watermark))
    }

    #[must_use]
    pub fn with_watermark(mut self, enabled: bool) -> Self {
        self.watermark = enabled;
        self
    }

    pub fn registry(&self) -> &PlatformRegistry {
        &self.registry
    }

    pub async fn run(&self, request: &Request) -> Result<Outcome> {
        let bounds = TrimBounds::new(
            normalize_time(request.start.as_deref())?,
            normalize_time(request.end.as_deref())?
        );
        let reference = resolve_reference(&request.url)
            .ok_or_else(|| Error::UnrecognizedSource(request.url.clone()))?;
        let platform = self.registry.get(reference.platform)?;

        tracing::info!("Looking up {} content {}", reference.platform, reference.id);
        let catalog = platform.catalog(&reference).await?;

        // Every stream is selected before anything is downloaded.
        let selected = platform
            .wanted(request.mode, &catalog)
            .into_iter()
            .map(|kind| select(&catalog.streams, kind, &platform.policy(kind)))
            .collect::<Result<Vec<_>>>()?;
        let Some(primary) = selected.last() else {
            return Err(nothing_selected());
        };

        let processor = Processor::new(self.tool.as_ref(), self.store.as_ref());
        let mut degraded = false;
        let mut audio = None;
        let mut video = None;
        let mut asset = None;

        for stream in &selected {
            let base = platform.output_name(&catalog, stream);
            match stream.kind {
                StreamKind::Audio => {
                    let key = CacheKey::new(&base, Stage::AudioRaw, stream.extension());
                    audio = Some(self.fetcher.fetch(self.store.as_ref(), stream, &key).await?);
                }
                StreamKind::Video => {
                    let text = platform.watermark_text(&catalog).filter(|_| self.watermark);
                    let key = self
                        .video(&processor, &base, stream, text.as_deref(), &mut degraded)
                        .await?;
                    video = Some(key);
                }
                StreamKind::Image | StreamKind::Vector => {
                    let key = CacheKey::new(&base, Stage::Asset, stream.extension());
                    asset = Some(self.fetcher.fetch(self.store.as_ref(), stream, &key).await?);
                }
            }
        }

        let result = match (audio, video, asset) {
            (_, _, Some(asset)) => asset,
            (Some(audio), Some(video), None) => {
                let merged = fallback(processor.merge(&audio, &video).await, &video, "Merging", &mut degraded)?;
                fallback(processor.trim(&merged, &bounds, true).await, &merged, "Trimming", &mut degraded)?
            }
            (Some(audio), None, None) => {
                let repackaged = fallback(processor.repackage(&audio).await, &audio, "Repackaging", &mut degraded)?;
                fallback(processor.trim(&repackaged, &bounds, false).await, &repackaged, "Trimming", &mut degraded)?
            }
            (None, Some(video), None) => {
                fallback(processor.trim(&video, &bounds, true).await, &video, "Trimming", &mut degraded)?
            }
            (None, None, None) => return Err(nothing_selected())
        };

        let default_name = platform.output_name(&catalog, primary);
        let output_dir = request.output_dir.as_ref().unwrap_or(&self.output_dir);
        let output = publish(
            self.store.as_ref(),
            &result,
            output_dir,
            request.name.as_deref(),
            &default_name
        )
        .await?;
        tracing::info!("Saved {}", output.display());

        Ok(Outcome {
            credited: self.credit(&catalog).await,
            output,
            title: catalog.title,
            source_url: catalog.attribution_url,
            degraded
        })
    }

    /// Raw video, or its watermarked version when `text` is given. A cached
    /// watermarked entry means the raw stream is not fetched at all.
    async fn video(
        &self,
        processor: &Processor<'_, dyn MediaTool, dyn ArtifactStore>,
        base: &str,
        stream: &StreamDescriptor,
        text: Option<&str>,
        degraded: &mut bool
    ) -> Result<CacheKey> {
        let raw = CacheKey::new(base, Stage::VideoRaw, stream.extension());
        let Some(text) = text else {
            return self.fetcher.fetch(self.store.as_ref(), stream, &raw).await;
        };

        let watermarked = CacheKey::new(base, Stage::VideoWatermarked, stream.extension());
        if self.store.has(&watermarked) {
            tracing::info!("Using watermarked cached video");
            return Ok(watermarked);
        }

        let raw = self.fetcher.fetch(self.store.as_ref(), stream, &raw).await?;
        match processor.watermark(base, &raw, text).await {
            Ok(key) => Ok(key),
            Err(e) => {
                tracing::warn!("Watermark skipped: {}", e);
                *degraded = true;
                Ok(raw)
            }
        }
    }

    async fn credit(&self, catalog: &Catalog) -> bool {
        match self.ledger.record(&catalog.attribution_url, &catalog.title).await {
            Ok(written) => written,
            Err(e) => {
                tracing::warn!("Could not update {}: {}", self.ledger.path().display(), e);
                false
            }
        }
    }
}

fn nothing_selected() -> Error {
    Error::NoMatchingStream {
        kind: StreamKind::Video,
        container: "any".to_string()
    }
}

/// Falls back to `input` when the media tool is missing. Other failures abort
/// the request.
fn fallback(result: Result<CacheKey>, input: &CacheKey, step: &str, degraded: &mut bool) -> Result<CacheKey> {
    match result {
        Err(Error::ToolUnavailable(reason)) => {
            tracing::warn!("{} skipped, {}", step, reason);
            *degraded = true;
            Ok(input.clone())
        }
        other => other
    }
}
