use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// The subset of `yt-dlp --dump-json` output the catalog lookup needs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoInfo {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub uploader: Option<String>,
    #[serde(default)]
    pub duration: Option<f64>,
    #[serde(default)]
    pub webpage_url: Option<String>,
    #[serde(default)]
    pub formats: Vec<Format>,
    #[serde(default)]
    pub extractor_key: Option<String>
}

impl VideoInfo {
    /// Formats that can be fetched directly over HTTP(S).
    pub fn downloadable_formats(&self) -> impl Iterator<Item = &Format> {
        self.formats.iter().filter(|f| f.is_direct_download())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Format {
    pub format_id: String,
    #[serde(default)]
    pub format_note: Option<String>,
    #[serde(default)]
    pub ext: Option<String>,
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
    #[serde(default)]
    pub fps: Option<f64>,
    #[serde(default)]
    pub vcodec: Option<String>,
    #[serde(default)]
    pub acodec: Option<String>,
    #[serde(default)]
    pub abr: Option<f64>,
    #[serde(default)]
    pub vbr: Option<f64>,
    #[serde(default)]
    pub tbr: Option<f64>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub protocol: Option<String>,
    #[serde(default)]
    pub http_headers: HashMap<String, String>
}

impl Format {
    pub fn has_video(&self) -> bool {
        self.vcodec.as_ref().is_some_and(|v| v != "none")
    }

    pub fn has_audio(&self) -> bool {
        self.acodec.as_ref().is_some_and(|a| a != "none")
    }

    pub fn is_video_only(&self) -> bool {
        self.has_video() && !self.has_audio()
    }

    pub fn is_audio_only(&self) -> bool {
        self.has_audio() && !self.has_video()
    }

    /// Manifest and storyboard formats have no single fetchable URL.
    pub fn is_direct_download(&self) -> bool {
        self.url.is_some()
            && self
                .protocol
                .as_deref()
                .is_none_or(|p| p == "https" || p == "http")
    }

    /// MIME type of the container, e.g. `video/mp4` or `audio/mp4`.
    pub fn mime_type(&self) -> Option<String> {
        let ext = self.ext.as_deref()?;
        let container = match ext {
            "m4a" => "mp4",
            other => other
        };
        if self.is_audio_only() {
            Some(format!("audio/{container}"))
        } else if self.has_video() {
            Some(format!("video/{container}"))
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> Format {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_mime_type_for_split_streams() {
        let video = parse(r#"{"format_id": "137", "ext": "mp4", "vcodec": "avc1.640028", "acodec": "none", "height": 1080}"#);
        let audio = parse(r#"{"format_id": "140", "ext": "m4a", "vcodec": "none", "acodec": "mp4a.40.2", "abr": 129.5}"#);
        let webm = parse(r#"{"format_id": "251", "ext": "webm", "vcodec": "none", "acodec": "opus"}"#);

        assert_eq!(video.mime_type().as_deref(), Some("video/mp4"));
        assert_eq!(audio.mime_type().as_deref(), Some("audio/mp4"));
        assert_eq!(webm.mime_type().as_deref(), Some("audio/webm"));
        assert!(video.is_video_only());
        assert!(audio.is_audio_only());
    }

    #[test]
    fn test_storyboard_has_no_mime_type() {
        let sb = parse(r#"{"format_id": "sb0", "ext": "mhtml", "vcodec": "none", "acodec": "none", "protocol": "mhtml"}"#);
        assert_eq!(sb.mime_type(), None);
        assert!(!sb.is_direct_download());
    }

    #[test]
    fn test_video_info_downloadable_formats() {
        let json = r#"{
            "id": "e7e9rVKCZyI",
            "title": "Some Title",
            "formats": [
                {"format_id": "233", "ext": "mp4", "protocol": "m3u8_native", "url": "https://manifest"},
                {"format_id": "140", "ext": "m4a", "protocol": "https", "url": "https://cdn/140",
                 "vcodec": "none", "acodec": "mp4a.40.2",
                 "http_headers": {"User-Agent": "Mozilla/5.0"}}
            ]
        }"#;
        let info: VideoInfo = serde_json::from_str(json).unwrap();
        let formats: Vec<_> = info.downloadable_formats().collect();
        assert_eq!(formats.len(), 1);
        assert_eq!(formats[0].format_id, "140");
        assert_eq!(formats[0].http_headers.get("User-Agent").map(String::as_str), Some("Mozilla/5.0"));
    }
}
