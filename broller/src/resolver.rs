//! Turns user supplied links into a platform specific content reference.

use url::Url;

use crate::platforms::PlatformKind;

/// A resolved (platform, id) pair. Derived once from a URL and never changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentReference {
    pub platform: PlatformKind,
    pub id: String,
    pub slug: Option<String>,
    pub url: String
}

impl ContentReference {
    fn new(platform: PlatformKind, id: impl Into<String>, slug: Option<String>, url: &Url) -> Self {
        Self {
            platform,
            id: id.into(),
            slug: slug.filter(|s| !s.is_empty()),
            url: url.to_string()
        }
    }
}

/// Resolves `input` into a [`ContentReference`], or `None` when the host or
/// the path shape is not one we know how to fetch. Never fails loudly.
pub fn resolve_reference(input: &str) -> Option<ContentReference> {
    let url = Url::parse(input.trim()).ok()?;
    let host = url.host_str()?;
    let host = host.strip_prefix("www.").unwrap_or(host);
    let segments: Vec<&str> = url
        .path_segments()
        .map(|s| s.filter(|part| !part.is_empty()).collect())
        .unwrap_or_default();

    match host {
        "youtube.com" => youtube_watch(&url, &segments),
        "youtu.be" => youtube_short(&url, &segments),
        "pexels.com" => pexels(&url, &segments),
        "pixabay.com" => pixabay(&url, &segments),
        "giphy.com" => giphy(&url, &segments),
        "unsplash.com" => unsplash(&url, &segments),
        "iconfinder.com" => iconfinder(&url, &segments),
        _ => None
    }
}

/// Like [`resolve_reference`], but also accepts a bare video id.
pub fn resolve_video(input: &str) -> Option<ContentReference> {
    let input = input.trim();
    if is_video_id(input) {
        let url = Url::parse(&format!("https://www.youtube.com/watch?v={input}")).ok()?;
        return Some(ContentReference::new(PlatformKind::YouTube, input, None, &url));
    }
    resolve_reference(input).filter(|r| r.platform == PlatformKind::YouTube)
}

fn is_video_id(value: &str) -> bool {
    value.len() == 11
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

fn youtube_watch(url: &Url, segments: &[&str]) -> Option<ContentReference> {
    if segments != ["watch"] {
        return None;
    }
    let id = url
        .query_pairs()
        .find(|(key, _)| key == "v")
        .map(|(_, value)| value.into_owned())
        .filter(|id| !id.is_empty())?;
    Some(ContentReference::new(PlatformKind::YouTube, id, None, url))
}

fn youtube_short(url: &Url, segments: &[&str]) -> Option<ContentReference> {
    match segments {
        [id] => Some(ContentReference::new(PlatformKind::YouTube, *id, None, url)),
        _ => None
    }
}

/// Splits `some-slug-1234` into (`some-slug`, `1234`).
fn split_slug_id(segment: &str) -> (Option<String>, &str) {
    match segment.rsplit_once('-') {
        Some((slug, id)) => (Some(slug.to_string()), id),
        None => (None, segment)
    }
}

fn pexels(url: &Url, segments: &[&str]) -> Option<ContentReference> {
    let ["video", last, ..] = segments else {
        return None;
    };
    let (slug, id) = split_slug_id(last);
    if id.is_empty() || !id.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    Some(ContentReference::new(PlatformKind::Pexels, id, slug, url))
}

fn pixabay(url: &Url, segments: &[&str]) -> Option<ContentReference> {
    let last = segments.last()?;
    let digits = last.len() - last.trim_end_matches(|c: char| c.is_ascii_digit()).len();
    if digits == 0 {
        return None;
    }
    let (head, id) = last.split_at(last.len() - digits);
    let slug = head.trim_end_matches('-').to_string();
    Some(ContentReference::new(PlatformKind::Pixabay, id, Some(slug), url))
}

fn giphy(url: &Url, segments: &[&str]) -> Option<ContentReference> {
    let last = segments.last()?;
    let (slug, id) = split_slug_id(last);
    if id.is_empty() {
        return None;
    }
    Some(ContentReference::new(PlatformKind::Giphy, id, slug, url))
}

fn unsplash(url: &Url, segments: &[&str]) -> Option<ContentReference> {
    let ["photos", id] = segments else {
        return None;
    };
    Some(ContentReference::new(PlatformKind::Unsplash, *id, None, url))
}

fn iconfinder(url: &Url, segments: &[&str]) -> Option<ContentReference> {
    let position = segments.iter().position(|s| *s == "icons")?;
    let id = segments.get(position + 1)?;
    if !id.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let slug = segments.get(position + 2).map(ToString::to_string);
    Some(ContentReference::new(PlatformKind::Iconfinder, *id, slug, url))
}
