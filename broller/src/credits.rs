//! Attribution ledger: `title<TAB>url` rows, unique by url.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;

use crate::error::{Error, Result};

#[derive(Debug, Clone)]
pub struct CreditsLedger {
    path: PathBuf
}

impl CreditsLedger {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Creates an empty ledger unless one exists. Returns whether it created one.
    pub async fn init(&self) -> Result<bool> {
        if fs::try_exists(&self.path).await.unwrap_or(false) {
            return Ok(false);
        }
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| Error::io(parent, e))?;
        }
        fs::write(&self.path, b"")
            .await
            .map_err(|e| Error::io(&self.path, e))?;
        Ok(true)
    }

    /// Urls already in the ledger. A missing ledger is empty.
    pub async fn urls(&self) -> Result<HashSet<String>> {
        let contents = match fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(HashSet::new()),
            Err(e) => return Err(Error::io(&self.path, e))
        };

        Ok(contents
            .lines()
            .filter_map(|line| line.rsplit_once('\t'))
            .map(|(_, url)| url.trim().to_string())
            .filter(|url| !url.is_empty())
            .collect())
    }

    /// Appends `(title, url)` unless `url` is already recorded. Returns
    /// whether a row was written.
    pub async fn record(&self, url: &str, title: &str) -> Result<bool> {
        if self.urls().await?.contains(url) {
            tracing::debug!("{} is already credited", url);
            return Ok(false);
        }

        let mut row = String::new();
        if !self.ends_with_newline().await? {
            row.push('\n');
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|e| Error::io(&self.path, e))?;
        row.push_str(&format!("{}\t{}\n", clean_field(title), clean_field(url)));
        file.write_all(row.as_bytes())
            .await
            .map_err(|e| Error::io(&self.path, e))?;
        file.flush().await.map_err(|e| Error::io(&self.path, e))?;

        tracing::info!("Credited \"{}\" in {}", title, self.path.display());
        Ok(true)
    }

    // An empty or missing ledger counts as terminated.
    async fn ends_with_newline(&self) -> Result<bool> {
        match fs::read(&self.path).await {
            Ok(bytes) => Ok(!matches!(bytes.last(), Some(b) if *b != b'\n')),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(true),
            Err(e) => Err(Error::io(&self.path, e))
        }
    }
}

fn clean_field(value: &str) -> String {
    value
        .chars()
        .map(|c| if matches!(c, '\t' | '\n' | '\r') { ' ' } else { c })
        .collect::<String>()
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_same_url_is_recorded_once() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = CreditsLedger::new(dir.path().join("credits.tsv"));

        assert!(ledger.record("https://youtu.be/a", "First").await.unwrap());
        assert!(!ledger.record("https://youtu.be/a", "First again").await.unwrap());
        assert!(ledger.record("https://youtu.be/b", "Second").await.unwrap());

        let contents = std::fs::read_to_string(ledger.path()).unwrap();
        assert_eq!(contents, "First\thttps://youtu.be/a\nSecond\thttps://youtu.be/b\n");
    }

    #[tokio::test]
    async fn test_titles_cannot_break_rows() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = CreditsLedger::new(dir.path().join("credits.tsv"));

        ledger.record("https://x/1", "a\tb\nc").await.unwrap();

        let urls = ledger.urls().await.unwrap();
        assert_eq!(urls.len(), 1);
        assert!(urls.contains("https://x/1"));
    }

    #[tokio::test]
    async fn test_init_keeps_existing_rows() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = CreditsLedger::new(dir.path().join("nested/credits.tsv"));

        assert!(ledger.urls().await.unwrap().is_empty());
        assert!(ledger.init().await.unwrap());
        ledger.record("https://x/1", "One").await.unwrap();
        assert!(!ledger.init().await.unwrap());
        assert_eq!(ledger.urls().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_unterminated_last_row_is_kept_apart() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = CreditsLedger::new(dir.path().join("credits.tsv"));
        std::fs::write(ledger.path(), "Hand written\thttps://x/1").unwrap();

        assert!(ledger.record("https://x/2", "Second").await.unwrap());
        assert!(!ledger.record("https://x/1", "Again").await.unwrap());

        let contents = std::fs::read_to_string(ledger.path()).unwrap();
        assert_eq!(contents, "Hand written\thttps://x/1\nSecond\thttps://x/2\n");
    }
}
