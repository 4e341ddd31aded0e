use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid session ID: {0}")]
    SessionId(uuid::Error),

    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Session not found: {0}")]
    SessionNotFound(String),
}

pub type Result<T> = std::result::Result<T, Error>;
