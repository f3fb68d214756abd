//! Copies finished artifacts out of the cache.

use std::path::{Path, PathBuf};

use tokio::fs;

use crate::cache::{ArtifactStore, CacheKey};
use crate::error::{Error, Result};

/// Copies the entry for `key` to `<target_dir>/<name>.<ext>`, where the
/// extension is the entry's own. `name` falls back to `default_name`. An
/// existing file at the destination is replaced.
pub async fn publish<S: ArtifactStore + ?Sized>(
    store: &S,
    key: &CacheKey,
    target_dir: &Path,
    name: Option<&str>,
    default_name: &str
) -> Result<PathBuf> {
    let name = name
        .map(sanitize_filename)
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| sanitize_filename(default_name));
    let target = target_dir.join(format!("{name}.{}", key.extension()));

    fs::create_dir_all(target_dir)
        .await
        .map_err(|e| Error::io(target_dir, e))?;

    let source = store.path_for(key);
    tracing::debug!("Copying {} to {}", source.display(), target.display());
    fs::copy(&source, &target)
        .await
        .map_err(|e| Error::io(&source, e))?;

    Ok(target)
}

fn sanitize_filename(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            _ => c
        })
        .collect::<String>()
        .trim()
        .to_string()
}

/// Lowercase ASCII slug with single dashes between words, used for derived
/// names such as `never-gonna-give-you-up__dQw4w9WgXcQ`.
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    for c in text.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    slug
}
