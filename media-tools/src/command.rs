use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::{Output, Stdio};

use tokio::process::Command;

use crate::error::{Error, Result};

pub struct CommandBuilder {
    binary: PathBuf,
    args: Vec<String>
}

#[allow(dead_code)]
impl CommandBuilder {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
            args: Vec::new()
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args(mut self, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    fn path_arg(self, path: &Path) -> Self {
        self.arg(path.to_string_lossy().to_string())
    }

    // yt-dlp

    pub fn url(self, url: impl Into<String>) -> Self {
        self.arg(url)
    }

    pub fn json_output(self) -> Self {
        self.arg("--dump-json")
    }

    pub fn skip_download(self) -> Self {
        self.arg("--skip-download")
    }

    pub fn no_playlist(self) -> Self {
        self.arg("--no-playlist")
    }

    pub fn no_warnings(self) -> Self {
        self.arg("--no-warnings")
    }

    pub fn cookies_file(self, path: impl AsRef<Path>) -> Self {
        self.arg("--cookies").path_arg(path.as_ref())
    }

    pub fn cookies_file_opt(self, path: Option<&PathBuf>) -> Self {
        match path {
            Some(p) => self.cookies_file(p),
            None => self
        }
    }

    // ffmpeg

    pub fn overwrite(self) -> Self {
        self.arg("-y")
    }

    pub fn quiet(self) -> Self {
        self.arg("-hide_banner").arg("-loglevel").arg("error")
    }

    pub fn input(self, path: impl AsRef<Path>) -> Self {
        self.arg("-i").path_arg(path.as_ref())
    }

    pub fn map(self, spec: impl Into<String>) -> Self {
        self.arg("-map").arg(spec)
    }

    pub fn copy_codecs(self) -> Self {
        self.arg("-c").arg("copy")
    }

    pub fn copy_audio(self) -> Self {
        self.arg("-c:a").arg("copy")
    }

    pub fn no_video(self) -> Self {
        self.arg("-vn")
    }

    pub fn video_filter(self, filter: impl Into<String>) -> Self {
        self.arg("-vf").arg(filter)
    }

    pub fn audio_filter(self, filter: impl Into<String>) -> Self {
        self.arg("-af").arg(filter)
    }

    pub fn output_file(self, path: impl AsRef<Path>) -> Self {
        self.path_arg(path.as_ref())
    }

    pub fn build_with_env(&self, env_vars: &HashMap<String, String>) -> Command {
        let mut cmd = Command::new(&self.binary);
        cmd.args(&self.args);

        if let Some(path_prepend) = env_vars.get("PATH_PREPEND") {
            let current_path = std::env::var("PATH").unwrap_or_default();
            cmd.env("PATH", format!("{path_prepend}:{current_path}"));
        }

        for (key, value) in env_vars {
            if key != "PATH_PREPEND" {
                cmd.env(key, value);
            }
        }

        cmd
    }

    pub fn get_args(&self) -> &[String] {
        &self.args
    }

    /// Runs the command to completion and fails on a non-zero exit status.
    pub async fn execute(&self, tool: &str, env_vars: &HashMap<String, String>) -> Result<Output> {
        tracing::debug!(
            binary = %self.binary.display(),
            args = ?self.args,
            "spawning {}", tool
        );

        let output = self
            .build_with_env(env_vars)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| Error::from_spawn(&self.binary, e))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(Error::CommandFailed {
                tool: tool.to_string(),
                code: output.status.code().unwrap_or(-1),
                stderr
            });
        }

        Ok(output)
    }
}
