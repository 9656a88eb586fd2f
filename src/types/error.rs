use thiserror::Error;

/// nanrate error types
#[derive(Error, Debug)]
pub enum NanRateError {
    /// One candidate-period existence check failed
    #[error("probe failed for {period}: {reason}")]
    ProbeFailure { period: String, reason: String },

    /// A source has no dataset for the requested period
    #[error("{source_name} has no dataset for {period}")]
    SourceNotFound { source_name: String, period: String },

    /// Payload could not be parsed or violates the dataset schema
    #[error("parse error: {0}")]
    Parse(String),

    /// Every source, including the global default, failed
    #[error("no data available for {0}")]
    DataUnavailable(String),

    /// A requested period had no resolved dataset at aggregation time
    #[error("aggregation input missing for {0}")]
    AggregationInputMissing(String),

    /// File I/O error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP transport error
    #[error("http error: {0}")]
    Http(String),

    /// Configuration error
    #[error("config error: {0}")]
    Config(String),
}

impl From<serde_json::Error> for NanRateError {
    fn from(err: serde_json::Error) -> Self {
        NanRateError::Parse(err.to_string())
    }
}

impl From<reqwest::Error> for NanRateError {
    fn from(err: reqwest::Error) -> Self {
        NanRateError::Http(err.to_string())
    }
}

/// Result type alias for nanrate
pub type Result<T> = std::result::Result<T, NanRateError>;
