use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("User not found: {0}")]
    NotFound(String),

    #[error("GitHub rate limit reached ({remaining}/{limit} remaining), resets at {reset}")]
    RateLimited { remaining: u32, limit: u32, reset: i64 },

    #[error("GitHub API error ({status})")]
    Upstream { status: u16 },

    #[error("Request was superseded by a newer one")]
    Cancelled,

    #[error("Unexpected error: {0}")]
    Unexpected(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Invalid header value: {0}")]
    InvalidHeader(#[from] reqwest::header::InvalidHeaderValue),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Coarse classification the presentation layer renders from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    RateLimited,
    Upstream,
    Cancelled,
    Unexpected,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::NotFound(_) => ErrorKind::NotFound,
            Error::RateLimited { .. } => ErrorKind::RateLimited,
            Error::Upstream { .. } => ErrorKind::Upstream,
            Error::Cancelled => ErrorKind::Cancelled,
            _ => ErrorKind::Unexpected,
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self.kind(), ErrorKind::Upstream | ErrorKind::Unexpected)
    }
}
