use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid provider URL: {0}")]
    Url(String),

    #[error("Completion response contained no choices")]
    EmptyResponse,

    #[error("Completion choice carried no content")]
    MissingContent,

    #[error("Failed to decode completion payload: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Structured completion failed after {attempts} attempts: {last_error}")]
    StructuredDecoding { attempts: usize, last_error: String },
}

pub type Result<T> = std::result::Result<T, Error>;
