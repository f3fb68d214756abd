//! Picks the best stream out of a remote catalog.

use std::cmp::Reverse;
use std::fmt;

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StreamKind {
    Audio,
    Video,
    Image,
    Vector
}

impl StreamKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Audio => "audio",
            Self::Video => "video",
            Self::Image => "image",
            Self::Vector => "vector"
        }
    }

    /// Audio and video can be trimmed; still images cannot.
    pub fn is_timed(self) -> bool {
        matches!(self, Self::Audio | Self::Video)
    }
}

impl fmt::Display for StreamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One downloadable representation of a piece of content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamDescriptor {
    pub tag: String,
    pub kind: StreamKind,
    pub mime_type: String,
    /// Resolution (pixels or height) or bitrate; only compared within a kind.
    pub quality: u64,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub url: String,
    pub headers: Vec<(String, String)>
}

impl StreamDescriptor {
    pub fn new(
        tag: impl Into<String>,
        kind: StreamKind,
        mime_type: impl Into<String>,
        url: impl Into<String>
    ) -> Self {
        Self {
            tag: tag.into(),
            kind,
            mime_type: mime_type.into(),
            quality: 0,
            width: None,
            height: None,
            url: url.into(),
            headers: Vec::new()
        }
    }

    #[must_use]
    pub fn with_quality(mut self, quality: u64) -> Self {
        self.quality = quality;
        self
    }

    #[must_use]
    pub fn with_dimensions(mut self, width: u32, height: u32) -> Self {
        self.width = Some(width);
        self.height = Some(height);
        self.quality = u64::from(width) * u64::from(height);
        self
    }

    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// File extension that matches the container.
    pub fn extension(&self) -> &str {
        match self.mime_type.as_str() {
            "audio/mp4" => "m4a",
            "image/jpeg" => "jpg",
            "image/svg+xml" => "svg",
            other => other.rsplit('/').next().unwrap_or("bin")
        }
    }
}

/// Which container is acceptable and which encoding tags are preferred, in
/// order. Tags not in the list rank after all listed ones.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionPolicy {
    pub container: String,
    pub priority: Vec<String>
}

impl SelectionPolicy {
    pub fn new(container: impl Into<String>) -> Self {
        Self {
            container: container.into(),
            priority: Vec::new()
        }
    }

    #[must_use]
    pub fn with_priority<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>
    {
        self.priority = tags.into_iter().map(Into::into).collect();
        self
    }

    fn rank<'a>(&self, stream: &'a StreamDescriptor) -> (usize, Reverse<u64>, &'a str) {
        let position = self
            .priority
            .iter()
            .position(|tag| *tag == stream.tag)
            .unwrap_or(usize::MAX);
        (position, Reverse(stream.quality), stream.url.as_str())
    }
}

/// Returns the top ranked stream of `kind` in the policy's container.
///
/// Listed tags win by list position regardless of quality. Unlisted tags are
/// ordered by quality, highest first, so the result is deterministic.
pub fn select<'a>(
    catalog: &'a [StreamDescriptor],
    kind: StreamKind,
    policy: &SelectionPolicy
) -> Result<&'a StreamDescriptor> {
    catalog
        .iter()
        .filter(|stream| stream.kind == kind && stream.mime_type == policy.container)
        .min_by(|a, b| policy.rank(a).cmp(&policy.rank(b)))
        .ok_or_else(|| Error::NoMatchingStream {
            kind,
            container: policy.container.clone()
        })
}
