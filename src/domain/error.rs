//! Domain error types.

/// Top-level error type for btcpulse.
#[derive(Debug, thiserror::Error)]
pub enum PulseError {
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

    #[error("metrics source error: {reason}")]
    MetricsSource { reason: String },

    #[error("unknown metric key '{key}'")]
    UnknownMetric { key: String },

    #[error("non-finite or out-of-range value for {metric}: {value}")]
    NonFiniteMetric { metric: String, value: f64 },

    #[error("indicator catalog is empty")]
    EmptyCatalog,

    #[error("history store error: {reason}")]
    History { reason: String },

    #[error("history query error: {reason}")]
    HistoryQuery { reason: String },

    #[error("insufficient data for {what}: have {have}, need {need}")]
    InsufficientData {
        what: String,
        have: usize,
        need: usize,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<&PulseError> for std::process::ExitCode {
    fn from(err: &PulseError) -> Self {
        let code: u8 = match err {
            PulseError::Io(_) => 1,
            PulseError::ConfigParse { .. }
            | PulseError::ConfigMissing { .. }
            | PulseError::ConfigInvalid { .. } => 2,
            PulseError::History { .. } | PulseError::HistoryQuery { .. } => 3,
            PulseError::MetricsSource { .. }
            | PulseError::UnknownMetric { .. }
            | PulseError::NonFiniteMetric { .. } => 4,
            PulseError::EmptyCatalog | PulseError::InsufficientData { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}
