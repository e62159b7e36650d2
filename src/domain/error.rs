//! Domain error types.

/// Top-level error type for tradesim.
#[derive(Debug, thiserror::Error)]
pub enum TradesimError {
    #[error("invalid action {index}: action space has {size} actions")]
    InvalidAction { index: usize, size: usize },

    #[error("invalid transition: {reason}")]
    InvalidTransition { reason: String },

    #[error("price series exhausted: step {step} is past the last step {last}")]
    ExhaustedSeries { step: usize, last: usize },

    #[error("price series mismatch: {bars} bars but {factors} factor rows")]
    SeriesMismatch { bars: usize, factors: usize },

    #[error("price series is empty")]
    EmptySeries,

    #[error("invalid price at step {step}: {reason}")]
    InvalidPrice { step: usize, reason: String },

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("data error: {reason}")]
    Data { reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl TradesimError {
    pub(crate) fn transition(reason: impl Into<String>) -> Self {
        TradesimError::InvalidTransition {
            reason: reason.into(),
        }
    }

    /// Process exit status for this error class.
    pub fn exit_status(&self) -> u8 {
        match self {
            TradesimError::Io(_) => 1,
            TradesimError::ConfigParse { .. }
            | TradesimError::ConfigMissing { .. }
            | TradesimError::ConfigInvalid { .. } => 2,
            TradesimError::Data { .. } => 3,
            TradesimError::InvalidAction { .. } | TradesimError::InvalidTransition { .. } => 4,
            TradesimError::ExhaustedSeries { .. }
            | TradesimError::SeriesMismatch { .. }
            | TradesimError::EmptySeries
            | TradesimError::InvalidPrice { .. } => 5,
        }
    }
}

impl From<&TradesimError> for std::process::ExitCode {
    fn from(err: &TradesimError) -> Self {
        std::process::ExitCode::from(err.exit_status())
    }
}
