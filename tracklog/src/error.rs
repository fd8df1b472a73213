use std::path::PathBuf;

use thiserror::Error;

pub type TrackLogResult<T> = Result<T, TrackLogError>;

#[derive(Debug, Error)]
pub enum TrackLogError {
    #[error("track log not found: {}", .0.display())]
    MissingFile(PathBuf),

    #[error("track log {} has no header row", .0.display())]
    MissingHeader(PathBuf),

    #[error("{}:{line}: malformed row: {reason}", .path.display())]
    MalformedRow {
        path: PathBuf,
        line: usize,
        reason: String,
    },

    #[error("invalid {parameter}: {reason}")]
    Configuration {
        parameter: &'static str,
        reason: String,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl TrackLogError {
    pub fn malformed(path: impl Into<PathBuf>, line: usize, reason: impl Into<String>) -> Self {
        Self::MalformedRow {
            path: path.into(),
            line,
            reason: reason.into(),
        }
    }

    pub fn configuration(parameter: &'static str, reason: impl Into<String>) -> Self {
        Self::Configuration {
            parameter,
            reason: reason.into(),
        }
    }
}
