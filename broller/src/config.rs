use std::path::PathBuf;

use crate::error::{Error, Result};

pub const DEFAULT_VIDEO_TAGS: &[&str] = &["137", "136", "135", "134", "133", "160"];
pub const DEFAULT_AUDIO_TAGS: &[&str] = &["140", "139"];

#[derive(Debug, Clone, Default)]
pub struct ApiKeys {
    pub pexels: Option<String>,
    pub pixabay: Option<String>,
    pub giphy: Option<String>,
    pub unsplash: Option<String>,
    pub iconfinder: Option<String>
}

/// Ordered encoding-tag preferences for the video platform, most preferred
/// first. These track the platform's current itag ladder.
#[derive(Debug, Clone)]
pub struct StreamPreferences {
    pub video_tags: Vec<String>,
    pub audio_tags: Vec<String>
}

impl Default for StreamPreferences {
    fn default() -> Self {
        Self {
            video_tags: DEFAULT_VIDEO_TAGS.iter().map(ToString::to_string).collect(),
            audio_tags: DEFAULT_AUDIO_TAGS.iter().map(ToString::to_string).collect()
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub cache_dir: PathBuf,
    pub output_dir: PathBuf,
    pub credits_file: PathBuf,
    pub ffmpeg_path: PathBuf,
    pub ytdlp_path: PathBuf,
    pub cookies_file: Option<PathBuf>,
    pub watermark: bool,
    pub keys: ApiKeys,
    pub preferences: StreamPreferences
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cache_dir: default_cache_dir(),
            output_dir: PathBuf::from("."),
            credits_file: PathBuf::from("credits.tsv"),
            ffmpeg_path: PathBuf::from("ffmpeg"),
            ytdlp_path: PathBuf::from("yt-dlp"),
            cookies_file: None,
            watermark: true,
            keys: ApiKeys::default(),
            preferences: StreamPreferences::default()
        }
    }
}

fn default_cache_dir() -> PathBuf {
    dirs::cache_dir()
        .map_or_else(|| PathBuf::from(".cache"), |dir| dir.join("b-roller"))
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary variable source. Empty
    /// values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let mut config = Self::default();

        if let Some(dir) = get("BROLLER_CACHE_DIR") {
            config.cache_dir = PathBuf::from(dir);
        }
        if let Some(file) = get("BROLLER_CREDITS_FILE") {
            config.credits_file = PathBuf::from(file);
        }
        if let Some(path) = get("FFMPEG_PATH") {
            config.ffmpeg_path = PathBuf::from(path);
        }
        if let Some(path) = get("YTDLP_PATH") {
            config.ytdlp_path = PathBuf::from(path);
        }
        config.cookies_file = get("YTDLP_COOKIES").map(PathBuf::from);

        if let Some(value) = get("BROLLER_WATERMARK") {
            config.watermark = parse_bool("BROLLER_WATERMARK", &value)?;
        }
        if let Some(value) = get("BROLLER_VIDEO_ITAGS") {
            config.preferences.video_tags = parse_tags("BROLLER_VIDEO_ITAGS", &value)?;
        }
        if let Some(value) = get("BROLLER_AUDIO_ITAGS") {
            config.preferences.audio_tags = parse_tags("BROLLER_AUDIO_ITAGS", &value)?;
        }

        config.keys = ApiKeys {
            pexels: get("PEXELS_API_KEY"),
            pixabay: get("PIXABAY_API_KEY"),
            giphy: get("GIPHY_API_KEY"),
            unsplash: get("UNSPLASH_ACCESS_KEY"),
            iconfinder: get("ICONFINDER_API_KEY")
        };

        Ok(config)
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(Error::Config(format!("{key} must be a boolean, got {value:?}")))
    }
}

fn parse_tags(key: &str, value: &str) -> Result<Vec<String>> {
    let tags: Vec<String> = value
        .split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(String::from)
        .collect();
    if tags.is_empty() {
        return Err(Error::Config(format!("{key} must list at least one tag")));
    }
    Ok(tags)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config_from(vars: &[(&str, &str)]) -> Result<Config> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]).unwrap();
        assert!(config.watermark);
        assert_eq!(config.credits_file, PathBuf::from("credits.tsv"));
        assert_eq!(config.preferences.video_tags[0], "137");
        assert_eq!(config.preferences.audio_tags, vec!["140", "139"]);
        assert!(config.keys.pexels.is_none());
    }

    #[test]
    fn test_overrides_and_empty_values() {
        let config = config_from(&[
            ("BROLLER_CACHE_DIR", "/tmp/broller"),
            ("BROLLER_WATERMARK", "off"),
            ("BROLLER_VIDEO_ITAGS", "22, 18"),
            ("PEXELS_API_KEY", "secret"),
            ("PIXABAY_API_KEY", "   ")
        ])
        .unwrap();
        assert_eq!(config.cache_dir, PathBuf::from("/tmp/broller"));
        assert!(!config.watermark);
        assert_eq!(config.preferences.video_tags, vec!["22", "18"]);
        assert_eq!(config.keys.pexels.as_deref(), Some("secret"));
        assert!(config.keys.pixabay.is_none());
    }

    #[test]
    fn test_invalid_values_are_config_errors() {
        let err = config_from(&[("BROLLER_WATERMARK", "maybe")]).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
        assert!(!err.is_recoverable());

        let err = config_from(&[("BROLLER_AUDIO_ITAGS", " , ")]).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
