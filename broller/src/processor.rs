//! Post-processing on cached artifacts. Every operation maps input keys and
//! parameters to an output key and skips the tool when that entry exists.

use std::path::Path;

use async_trait::async_trait;
use media_tools::{Ffmpeg, TrimBounds};

use crate::cache::{ArtifactStore, CacheKey, Stage};
use crate::error::Result;

#[async_trait]
pub trait MediaTool: Send + Sync {
    async fn merge(&self, audio: &Path, video: &Path, output: &Path) -> media_tools::Result<()>;

    async fn trim(
        &self,
        input: &Path,
        output: &Path,
        bounds: &TrimBounds,
        has_video: bool
    ) -> media_tools::Result<()>;

    async fn repackage(&self, input: &Path, output: &Path) -> media_tools::Result<()>;

    async fn watermark(&self, input: &Path, output: &Path, text: &str) -> media_tools::Result<()>;
}

#[async_trait]
impl MediaTool for Ffmpeg {
    async fn merge(&self, audio: &Path, video: &Path, output: &Path) -> media_tools::Result<()> {
        Ffmpeg::merge(self, audio, video, output).await
    }

    async fn trim(
        &self,
        input: &Path,
        output: &Path,
        bounds: &TrimBounds,
        has_video: bool
    ) -> media_tools::Result<()> {
        Ffmpeg::trim(self, input, output, bounds, has_video).await
    }

    async fn repackage(&self, input: &Path, output: &Path) -> media_tools::Result<()> {
        Ffmpeg::repackage(self, input, output).await
    }

    async fn watermark(&self, input: &Path, output: &Path, text: &str) -> media_tools::Result<()> {
        Ffmpeg::watermark(self, input, output, text).await
    }
}

/// Container used for repackaged audio. The track is copied, not re-encoded.
pub const REPACKAGED_AUDIO_EXTENSION: &str = "m4a";

pub struct Processor<'a, T: ?Sized, S: ?Sized> {
    tool: &'a T,
    store: &'a S
}

impl<'a, T, S> Processor<'a, T, S>
where
    T: MediaTool + ?Sized,
    S: ArtifactStore + ?Sized
{
    pub fn new(tool: &'a T, store: &'a S) -> Self {
        Self { tool, store }
    }

    pub async fn merge(&self, audio: &CacheKey, video: &CacheKey) -> Result<CacheKey> {
        let output = video.derive(Stage::Merged, None, "mp4");
        if self.reuse(&output) {
            return Ok(output);
        }

        tracing::info!("Merging audio and video");
        let staging = self.store.staging_path(&output);
        let result = self
            .tool
            .merge(&self.store.path_for(audio), &self.store.path_for(video), &staging)
            .await;
        self.finish(&output, result).await
    }

    /// Cuts `[start, end)` out of `input`. With both bounds open the input is
    /// returned as is and nothing is written.
    pub async fn trim(&self, input: &CacheKey, bounds: &TrimBounds, has_video: bool) -> Result<CacheKey> {
        if bounds.is_open() {
            return Ok(input.clone());
        }

        let detail = trim_detail(bounds);
        let output = input.derive(Stage::Trimmed, Some(&detail), input.extension());
        if self.reuse(&output) {
            return Ok(output);
        }

        tracing::info!(
            "Trimming from {} to {}",
            bounds.start.as_deref().unwrap_or("-"),
            bounds.end.as_deref().unwrap_or("-")
        );
        tracing::debug!("Original: {}", input);
        let staging = self.store.staging_path(&output);
        let result = self
            .tool
            .trim(&self.store.path_for(input), &staging, bounds, has_video)
            .await;
        self.finish(&output, result).await
    }

    pub async fn repackage(&self, input: &CacheKey) -> Result<CacheKey> {
        let output = input.derive(Stage::Repackaged, None, REPACKAGED_AUDIO_EXTENSION);
        if self.reuse(&output) {
            return Ok(output);
        }

        tracing::info!("Repackaging audio");
        let staging = self.store.staging_path(&output);
        let result = self.tool.repackage(&self.store.path_for(input), &staging).await;
        self.finish(&output, result).await
    }

    /// Overlays `text` on a raw video. The entry is keyed by content, not by
    /// text, so changing the text needs a cache clear.
    pub async fn watermark(&self, base: &str, input: &CacheKey, text: &str) -> Result<CacheKey> {
        let output = CacheKey::new(base, Stage::VideoWatermarked, input.extension());
        if self.reuse(&output) {
            return Ok(output);
        }

        tracing::info!("Adding watermark");
        let staging = self.store.staging_path(&output);
        let result = self
            .tool
            .watermark(&self.store.path_for(input), &staging, text)
            .await;
        self.finish(&output, result).await
    }

    fn reuse(&self, output: &CacheKey) -> bool {
        let hit = self.store.has(output);
        if hit {
            tracing::info!("Using cached {} ({})", output.stage(), output);
        }
        hit
    }

    async fn finish(&self, output: &CacheKey, result: media_tools::Result<()>) -> Result<CacheKey> {
        match result {
            Ok(()) => {
                self.store.commit(output).await?;
                Ok(output.clone())
            }
            Err(e) => {
                self.store.discard(output).await;
                Err(e.into())
            }
        }
    }
}

fn trim_detail(bounds: &TrimBounds) -> String {
    let compact = |value: Option<&str>, open: &str| {
        value.map_or_else(|| open.to_string(), |v| v.replace(':', ""))
    };
    format!(
        "{}-{}",
        compact(bounds.start.as_deref(), "start"),
        compact(bounds.end.as_deref(), "end")
    )
}
