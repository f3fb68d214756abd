//! Async Rust wrappers for the yt-dlp and ffmpeg command-line tools.
//!
//! `YtDlp` is used purely as a metadata service: it resolves a video page into
//! a `VideoInfo` whose `formats` list is the catalog of downloadable streams.
//! `Ffmpeg` performs the post-processing steps (merge, trim, repackage,
//! watermark) on files that are already on disk.
//!
//! # Example
//!
//! ```no_run
//! use media_tools::{Ffmpeg, YtDlp};
//!
//! #[tokio::main]
//! async fn main() -> media_tools::Result<()> {
//!     let ytdlp = YtDlp::new();
//!     let info = ytdlp.get_video_info("https://www.youtube.com/watch?v=dQw4w9WgXcQ").await?;
//!     println!("{} has {} formats", info.title, info.formats.len());
//!
//!     let ffmpeg = Ffmpeg::new();
//!     println!("ffmpeg version: {}", ffmpeg.check_binary().await?);
//!     ffmpeg.merge("audio.m4a".as_ref(), "video.mp4".as_ref(), "merged.mp4".as_ref()).await?;
//!
//!     Ok(())
//! }
//! ```

mod command;
pub mod error;
mod ffmpeg;
pub mod types;
mod ytdlp;

pub use error::{Error, Result};
pub use ffmpeg::{Ffmpeg, TrimBounds};
pub use types::{Format, VideoInfo};
pub use ytdlp::YtDlp;
