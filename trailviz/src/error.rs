use thiserror::Error;

pub type VizResult<T> = Result<T, VizError>;

#[derive(Debug, Error)]
pub enum VizError {
    #[error("invalid {parameter}: {reason}")]
    Configuration {
        parameter: &'static str,
        reason: String,
    },

    #[error("OpenCV error: {0}")]
    OpenCv(#[from] opencv::Error),
}

impl VizError {
    pub fn configuration(parameter: &'static str, reason: impl Into<String>) -> Self {
        Self::Configuration {
            parameter,
            reason: reason.into(),
        }
    }
}

/// Why a smooth curve could not be fitted through a track.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FitError {
    #[error("need at least {needed} distinct points, got {got}")]
    TooFewPoints { needed: usize, got: usize },

    #[error("track has zero length")]
    ZeroLength,

    #[error("fit system is not positive definite")]
    NotPositiveDefinite,

    #[error("fit produced non-finite values")]
    NonFinite,
}
