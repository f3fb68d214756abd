use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::command::CommandBuilder;
use crate::error::Result;

/// Trim bounds in canonical `HH:MM:SS` form. `None` leaves that end open.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrimBounds {
    pub start: Option<String>,
    pub end: Option<String>
}

impl TrimBounds {
    pub fn new(start: Option<String>, end: Option<String>) -> Self {
        Self { start, end }
    }

    pub fn is_open(&self) -> bool {
        self.start.is_none() && self.end.is_none()
    }

    fn filter_args(&self) -> Vec<String> {
        let mut args = Vec::new();
        if let Some(start) = self.start.as_deref().and_then(hms_to_seconds) {
            args.push(format!("start={start}"));
        }
        if let Some(end) = self.end.as_deref().and_then(hms_to_seconds) {
            args.push(format!("end={end}"));
        }
        args
    }

    /// `trim`/`atrim` followed by a timestamp reset so the cut starts at zero.
    fn video_filter(&self) -> String {
        format!("trim={},setpts=PTS-STARTPTS", self.filter_args().join(":"))
    }

    fn audio_filter(&self) -> String {
        format!("atrim={},asetpts=PTS-STARTPTS", self.filter_args().join(":"))
    }
}

fn hms_to_seconds(value: &str) -> Option<u64> {
    value
        .split(':')
        .try_fold(0u64, |acc, part| Some(acc * 60 + part.parse::<u64>().ok()?))
}

#[derive(Debug, Clone)]
pub struct Ffmpeg {
    binary: PathBuf,
    env_vars: HashMap<String, String>
}

impl Default for Ffmpeg {
    fn default() -> Self {
        Self::new()
    }
}

impl Ffmpeg {
    pub fn new() -> Self {
        Self::with_binary("ffmpeg")
    }

    pub fn with_binary(path: impl Into<PathBuf>) -> Self {
        Self {
            binary: path.into(),
            env_vars: HashMap::new()
        }
    }

    pub fn set_env(&mut self, key: String, value: String) {
        self.env_vars.insert(key, value);
    }

    pub async fn check_binary(&self) -> Result<String> {
        let output = CommandBuilder::new(&self.binary)
            .arg("-version")
            .execute("ffmpeg", &self.env_vars)
            .await?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        Ok(stdout.lines().next().unwrap_or_default().trim().to_string())
    }

    /// Muxes the first video stream of `video` with the first audio stream of
    /// `audio` without re-encoding.
    pub async fn merge(&self, audio: &Path, video: &Path, output: &Path) -> Result<()> {
        self.command()
            .input(video)
            .input(audio)
            .map("0:v:0")
            .map("1:a:0")
            .copy_codecs()
            .output_file(output)
            .execute("ffmpeg", &self.env_vars)
            .await?;
        Ok(())
    }

    /// Cuts `[start, end)` out of `input`. The output is re-encoded because the
    /// timestamps are reset to start at zero.
    pub async fn trim(
        &self,
        input: &Path,
        output: &Path,
        bounds: &TrimBounds,
        has_video: bool
    ) -> Result<()> {
        let mut builder = self.command().input(input);
        if has_video {
            builder = builder.video_filter(bounds.video_filter());
        }
        builder
            .audio_filter(bounds.audio_filter())
            .output_file(output)
            .execute("ffmpeg", &self.env_vars)
            .await?;
        Ok(())
    }

    /// Moves the audio track into a new container without re-encoding.
    pub async fn repackage(&self, input: &Path, output: &Path) -> Result<()> {
        self.command()
            .input(input)
            .no_video()
            .copy_audio()
            .output_file(output)
            .execute("ffmpeg", &self.env_vars)
            .await?;
        Ok(())
    }

    /// Burns `text` into the bottom-right corner of the video.
    pub async fn watermark(&self, input: &Path, output: &Path, text: &str) -> Result<()> {
        self.command()
            .input(input)
            .video_filter(drawtext_filter(text))
            .copy_audio()
            .output_file(output)
            .execute("ffmpeg", &self.env_vars)
            .await?;
        Ok(())
    }

    fn command(&self) -> CommandBuilder {
        CommandBuilder::new(&self.binary)
            .quiet()
            .overwrite()
    }
}

fn drawtext_filter(text: &str) -> String {
    format!(
        "drawtext=text='{}':expansion=none:fontsize=35:fontcolor=white:\
         shadowcolor=black:shadowx=2:shadowy=2:x=w-tw-20:y=h-th-20",
        sanitize_drawtext(text)
    )
}

// Characters with meaning to the filtergraph parser are dropped rather than
// escaped; the overlay is cosmetic.
fn sanitize_drawtext(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            '\'' | '\\' | ':' | ';' | ',' | '[' | ']' | '%' => ' ',
            c if c.is_control() => ' ',
            c => c
        })
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}
