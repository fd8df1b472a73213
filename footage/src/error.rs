use std::path::PathBuf;

use thiserror::Error;
use tracklog::TrackLogError;

pub type FootageResult<T> = Result<T, FootageError>;

/// Failure reported by a detection/tracking backend.
pub type TrackerError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Error)]
pub enum FootageError {
    #[error("file not found: {0}")]
    MissingFile(PathBuf),

    #[error("could not open video {0}")]
    CannotOpen(PathBuf),

    #[error("{0} not found in PATH")]
    ToolNotFound(String),

    #[error("{tool} exited with {}: {diagnostics}", describe_status(.status))]
    ExternalTool {
        tool: String,
        status: Option<i32>,
        diagnostics: String,
    },

    #[error("tracker failed on frame {frame}: {source}")]
    Tracker {
        frame: u64,
        #[source]
        source: TrackerError,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("OpenCV error: {0}")]
    OpenCv(#[from] opencv::Error),

    #[error(transparent)]
    Log(#[from] TrackLogError),
}

fn describe_status(status: &Option<i32>) -> String {
    match status {
        Some(code) => format!("status {code}"),
        None => "no status (killed by signal)".to_string(),
    }
}
