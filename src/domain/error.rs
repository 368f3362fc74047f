//! Domain error types.
//!
//! Per-instrument data faults are not errors: they degrade to a non-ok
//! scan status and never abort a weekly run. Only configuration problems,
//! store I/O and state-consistency faults surface here.

/// Top-level error type for trendfolio.
#[derive(Debug, thiserror::Error)]
pub enum TrendfolioError {
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

    #[error("store error: {reason}")]
    Store { reason: String },

    #[error("corrupt portfolio state: {reason}")]
    StateCorrupt { reason: String },

    #[error("period {date} does not advance past last run {last_run}")]
    DuplicatePeriod { date: String, last_run: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<&TrendfolioError> for std::process::ExitCode {
    fn from(err: &TrendfolioError) -> Self {
        let code: u8 = match err {
            TrendfolioError::Io(_) => 1,
            TrendfolioError::ConfigParse { .. }
            | TrendfolioError::ConfigMissing { .. }
            | TrendfolioError::ConfigInvalid { .. } => 2,
            TrendfolioError::Data { .. } | TrendfolioError::Store { .. } => 3,
            TrendfolioError::StateCorrupt { .. } => 4,
            TrendfolioError::DuplicatePeriod { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}
