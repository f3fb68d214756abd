use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("binary not found: {0}")]
    BinaryNotFound(PathBuf),

    #[error("binary not executable: {0}")]
    BinaryNotExecutable(PathBuf),

    #[error("failed to execute tool: {0}")]
    ExecutionFailed(#[from] std::io::Error),

    #[error("{tool} failed with exit code {code}: {stderr}")]
    CommandFailed { tool: String, code: i32, stderr: String },

    #[error("failed to parse JSON output: {0}")]
    JsonParseFailed(#[from] serde_json::Error)
}

impl Error {
    /// True when the tool itself could not be started, as opposed to a run
    /// that started and failed.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Error::BinaryNotFound(_) | Error::BinaryNotExecutable(_))
    }

    pub(crate) fn from_spawn(binary: &std::path::Path, err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => Error::BinaryNotFound(binary.to_path_buf()),
            std::io::ErrorKind::PermissionDenied => Error::BinaryNotExecutable(binary.to_path_buf()),
            _ => Error::ExecutionFailed(err)
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
