use async_trait::async_trait;
use media_tools::{Format, VideoInfo, YtDlp};

use super::{Catalog, Mode, Platform, PlatformKind};
use crate::config::{Config, StreamPreferences};
use crate::error::Result;
use crate::publisher::slugify;
use crate::resolver::ContentReference;
use crate::selector::{SelectionPolicy, StreamDescriptor, StreamKind};

/// Video platform backed by yt-dlp for metadata and the stream catalog.
pub struct YouTube {
    ytdlp: YtDlp,
    preferences: StreamPreferences
}

impl YouTube {
    pub fn new(ytdlp: YtDlp, preferences: StreamPreferences) -> Self {
        Self { ytdlp, preferences }
    }

    pub fn from_config(config: &Config) -> Self {
        let mut ytdlp = YtDlp::with_binary(&config.ytdlp_path);
        ytdlp.set_cookies_file(config.cookies_file.clone());
        Self::new(ytdlp, config.preferences.clone())
    }
}

#[async_trait]
impl Platform for YouTube {
    fn kind(&self) -> PlatformKind {
        PlatformKind::YouTube
    }

    async fn catalog(&self, reference: &ContentReference) -> Result<Catalog> {
        let info = self.ytdlp.get_video_info(&reference.url).await?;
        Ok(catalog_from_info(&info, &reference.id))
    }

    fn policy(&self, kind: StreamKind) -> SelectionPolicy {
        match kind {
            StreamKind::Audio => {
                SelectionPolicy::new("audio/mp4").with_priority(self.preferences.audio_tags.iter().cloned())
            }
            _ => SelectionPolicy::new("video/mp4").with_priority(self.preferences.video_tags.iter().cloned())
        }
    }

    fn wanted(&self, mode: Mode, _catalog: &Catalog) -> Vec<StreamKind> {
        match mode {
            Mode::Both => vec![StreamKind::Audio, StreamKind::Video],
            Mode::Audio => vec![StreamKind::Audio],
            Mode::Video => vec![StreamKind::Video]
        }
    }

    fn watermark_text(&self, catalog: &Catalog) -> Option<String> {
        Some(format!("youtu.be/{} - {}", catalog.id, catalog.title))
    }
}

fn catalog_from_info(info: &VideoInfo, id: &str) -> Catalog {
    let streams = info.downloadable_formats().filter_map(stream_from_format).collect();
    Catalog {
        id: id.to_string(),
        title: info.title.clone(),
        attribution_url: format!("https://www.youtube.com/watch?v={id}"),
        base_name: format!("{}__{}", slugify(&info.title), id),
        streams
    }
}

// Muxed formats are skipped, audio and video are always fetched separately.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn stream_from_format(format: &Format) -> Option<StreamDescriptor> {
    let kind = if format.is_audio_only() {
        StreamKind::Audio
    } else if format.is_video_only() {
        StreamKind::Video
    } else {
        return None;
    };
    let url = format.url.as_deref()?;
    let mime_type = format.mime_type()?;

    let mut stream = StreamDescriptor::new(&format.format_id, kind, mime_type, url);
    stream = match (kind, format.width, format.height) {
        (StreamKind::Video, Some(w), Some(h)) => stream.with_dimensions(w, h),
        _ => {
            let kbps = format.abr.or(format.tbr).unwrap_or(0.0).max(0.0);
            stream.with_quality(kbps.round() as u64)
        }
    };

    let mut headers: Vec<_> = format.http_headers.iter().collect();
    headers.sort();
    for (name, value) in headers {
        stream = stream.with_header(name, value);
    }
    Some(stream)
}
