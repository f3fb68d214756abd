use std::path::PathBuf;

use crate::platforms::PlatformKind;
use crate::selector::StreamKind;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("\"{0}\" does not look like a supported link")]
    UnrecognizedSource(String),

    #[error("no {kind} stream matches the preferred container {container}")]
    NoMatchingStream { kind: StreamKind, container: String },

    #[error("download of {url} failed: {reason}")]
    DownloadFailed { url: String, reason: String },

    #[error("\"{0}\" is not a time, use seconds or [[HH:]MM:]SS")]
    InvalidTime(String),

    #[error("media tool unavailable: {0}")]
    ToolUnavailable(String),

    #[error("{platform} needs {variable} to be set, this integration is disabled")]
    CredentialMissing {
        platform: PlatformKind,
        variable: &'static str
    },

    #[error("could not read the {platform} catalog: {reason}")]
    Catalog { platform: PlatformKind, reason: String },

    #[error("media tool failed: {0}")]
    Tool(media_tools::Error),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("{path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error
    }
}

impl Error {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source
        }
    }

    pub fn download(url: impl Into<String>, reason: impl ToString) -> Self {
        Error::DownloadFailed {
            url: url.into(),
            reason: reason.to_string()
        }
    }

    pub fn catalog(platform: PlatformKind, reason: impl ToString) -> Self {
        Error::Catalog {
            platform,
            reason: reason.to_string()
        }
    }

    /// Everything but a startup configuration problem only aborts the
    /// current request.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, Error::Config(_))
    }
}

impl From<media_tools::Error> for Error {
    fn from(err: media_tools::Error) -> Self {
        if err.is_unavailable() {
            Error::ToolUnavailable(err.to_string())
        } else {
            Error::Tool(err)
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
