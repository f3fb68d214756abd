use std::collections::HashMap;
use std::path::PathBuf;

use crate::command::CommandBuilder;
use crate::error::Result;
use crate::types::VideoInfo;

#[derive(Debug, Clone)]
pub struct YtDlp {
    binary: PathBuf,
    cookies_file: Option<PathBuf>,
    extra_args: Vec<String>,
    env_vars: HashMap<String, String>
}

impl Default for YtDlp {
    fn default() -> Self {
        Self::new()
    }
}

impl YtDlp {
    pub fn new() -> Self {
        Self::with_binary("yt-dlp")
    }

    pub fn with_binary(path: impl Into<PathBuf>) -> Self {
        Self {
            binary: path.into(),
            cookies_file: None,
            extra_args: Vec::new(),
            env_vars: HashMap::new()
        }
    }

    pub fn set_cookies_file(&mut self, path: Option<PathBuf>) {
        self.cookies_file = path;
    }

    pub fn set_extra_args(&mut self, args: Vec<String>) {
        self.extra_args = args;
    }

    pub fn set_env(&mut self, key: String, value: String) {
        self.env_vars.insert(key, value);
    }

    pub async fn check_binary(&self) -> Result<String> {
        let output = CommandBuilder::new(&self.binary)
            .arg("--version")
            .execute("yt-dlp", &self.env_vars)
            .await?;

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    /// Fetches metadata and the stream catalog without downloading anything.
    pub async fn get_video_info(&self, url: &str) -> Result<VideoInfo> {
        let output = self
            .command()
            .json_output()
            .skip_download()
            .no_playlist()
            .no_warnings()
            .url(url)
            .execute("yt-dlp", &self.env_vars)
            .await?;

        let info: VideoInfo = serde_json::from_slice(&output.stdout)?;
        tracing::debug!("yt-dlp returned {} formats for {}", info.formats.len(), info.id);
        Ok(info)
    }

    fn command(&self) -> CommandBuilder {
        CommandBuilder::new(&self.binary)
            .cookies_file_opt(self.cookies_file.as_ref())
            .args(self.extra_args.iter().map(String::as_str))
    }
}
