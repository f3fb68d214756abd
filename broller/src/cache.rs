//! Content addressed artifact cache.
//!
//! A [`CacheKey`] deterministically names one artifact. The presence of the
//! file is the cache hit; there is no index. Entries are written once through
//! a staging file and an atomic rename, so a visible entry is always complete.

use std::fmt;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    AudioRaw,
    VideoRaw,
    VideoWatermarked,
    Merged,
    Trimmed,
    Repackaged,
    Asset
}

impl Stage {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::AudioRaw => "audio-raw",
            Self::VideoRaw => "video-raw",
            Self::VideoWatermarked => "video-watermarked",
            Self::Merged => "merged",
            Self::Trimmed => "trimmed",
            Self::Repackaged => "repackaged",
            Self::Asset => "asset"
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    stem: String,
    stage: Stage,
    extension: String
}

impl CacheKey {
    /// Key for a first-stage artifact of the content named `base`. The name
    /// is reduced to a single file name component inside the cache root.
    pub fn new(base: &str, stage: Stage, extension: &str) -> Self {
        Self {
            stem: format!("{}_{stage}", path_component(base)),
            stage,
            extension: extension.to_string()
        }
    }

    /// Key for an artifact produced from `self`. The parent's name is kept so
    /// different lineages never share an entry; `detail` separates variants of
    /// the same stage such as different trim bounds.
    #[must_use]
    pub fn derive(&self, stage: Stage, detail: Option<&str>, extension: &str) -> Self {
        let stem = match detail {
            Some(detail) => format!("{}_{stage}-{}", self.stem, path_component(detail)),
            None => format!("{}_{stage}", self.stem)
        };
        Self {
            stem,
            stage,
            extension: path_component(extension)
        }
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn extension(&self) -> &str {
        &self.extension
    }

    pub fn file_name(&self) -> String {
        format!("{}.{}", self.stem, self.extension)
    }
}

// One path component: no separators and no leading dot.
fn path_component(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            _ => c
        })
        .collect::<String>()
        .trim_start_matches('.')
        .to_string()
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.file_name())
    }
}

/// Storage for cached artifacts. Producers write to [`ArtifactStore::staging_path`]
/// and publish with [`ArtifactStore::commit`].
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    fn path_for(&self, key: &CacheKey) -> PathBuf;

    fn has(&self, key: &CacheKey) -> bool;

    fn staging_path(&self, key: &CacheKey) -> PathBuf;

    async fn commit(&self, key: &CacheKey) -> Result<PathBuf>;

    async fn discard(&self, key: &CacheKey);

    async fn write(&self, key: &CacheKey, bytes: &[u8]) -> Result<PathBuf>;

    async fn read(&self, key: &CacheKey) -> Result<Vec<u8>>;

    /// Removes every entry. Maintenance only, never called by the pipeline.
    async fn clear(&self) -> Result<usize>;
}

#[derive(Debug, Clone)]
pub struct DiskCache {
    root: PathBuf
}

const STAGING_PREFIX: &str = ".partial.";

impl DiskCache {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub async fn ensure_root(&self) -> Result<()> {
        fs::create_dir_all(&self.root)
            .await
            .map_err(|e| Error::io(&self.root, e))
    }
}

#[async_trait]
impl ArtifactStore for DiskCache {
    fn path_for(&self, key: &CacheKey) -> PathBuf {
        self.root.join(key.file_name())
    }

    fn has(&self, key: &CacheKey) -> bool {
        self.path_for(key).is_file()
    }

    // The staging name keeps the extension so tools can infer the container.
    fn staging_path(&self, key: &CacheKey) -> PathBuf {
        self.root.join(format!("{STAGING_PREFIX}{}", key.file_name()))
    }

    async fn commit(&self, key: &CacheKey) -> Result<PathBuf> {
        let staging = self.staging_path(key);
        let target = self.path_for(key);
        fs::rename(&staging, &target)
            .await
            .map_err(|e| Error::io(&target, e))?;
        tracing::debug!("Committed cache entry {}", target.display());
        Ok(target)
    }

    async fn discard(&self, key: &CacheKey) {
        let staging = self.staging_path(key);
        if let Err(e) = fs::remove_file(&staging).await {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!("Failed to remove staging file {}: {}", staging.display(), e);
            }
        }
    }

    async fn write(&self, key: &CacheKey, bytes: &[u8]) -> Result<PathBuf> {
        self.ensure_root().await?;
        let staging = self.staging_path(key);
        let result = async {
            let mut file = fs::File::create(&staging).await?;
            file.write_all(bytes).await?;
            file.flush().await
        }
        .await;

        if let Err(e) = result {
            self.discard(key).await;
            return Err(Error::io(staging, e));
        }
        self.commit(key).await
    }

    async fn read(&self, key: &CacheKey) -> Result<Vec<u8>> {
        let path = self.path_for(key);
        fs::read(&path).await.map_err(|e| Error::io(path, e))
    }

    async fn clear(&self) -> Result<usize> {
        let mut entries = match fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(Error::io(&self.root, e))
        };

        let mut removed = 0;
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| Error::io(&self.root, e))?
        {
            let path = entry.path();
            if path.is_file() {
                fs::remove_file(&path).await.map_err(|e| Error::io(&path, e))?;
                removed += 1;
            }
        }

        tracing::info!("Removed {} cache entries from {}", removed, self.root.display());
        Ok(removed)
    }
}
