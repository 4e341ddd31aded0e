use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    Url(String),

    #[error("Token acquisition failed: {0}")]
    Auth(String),

    #[error("Unsupported resource type: {0}")]
    UnsupportedResourceType(String),
}

pub type Result<T> = std::result::Result<T, Error>;
