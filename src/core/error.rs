use thiserror::Error;

/// Failures raised by providers and stores. The orchestrator absorbs all of
/// these and degrades to whatever data it still has.
#[derive(Debug, Error)]
pub enum FeedError {
    #[error("request to {provider} timed out")]
    Timeout { provider: String },

    #[error("HTTP error: {status} from {provider}")]
    Status {
        provider: String,
        status: reqwest::StatusCode,
    },

    #[error("request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("failed to parse response: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("malformed record: {0}")]
    Malformed(String),

    #[error("storage error: {0}")]
    Storage(#[from] fjall::Error),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T, E = FeedError> = std::result::Result<T, E>;
