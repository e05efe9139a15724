use std::io;

use thiserror::Error;

pub type AppResult<T> = Result<T, AppError>;

/// Status the provider uses to reject a stale or revoked bearer token.
const AUTH_FAILURE_STATUS: u16 = 400;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("configuration error: {0}")]
    Config(String),
    #[error("authorization error: {0}")]
    Authorization(String),
    #[error("network error ({status}): {message}")]
    Network { status: u16, message: String },
    #[error("missing data: {0}")]
    MissingData(String),
    #[error("mime parse error: {0}")]
    MimeParse(String),
    #[error("unsupported content: {0}")]
    UnsupportedContent(String),
    #[error("encoding error: {0}")]
    Encoding(String),
    #[error("missing key: {0}")]
    MissingKey(String),
    #[error("crypto error: {0}")]
    Crypto(String),
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("url parse error: {0}")]
    Url(#[from] url::ParseError),
}

impl AppError {
    pub fn network(status: u16, message: impl Into<String>) -> Self {
        Self::Network {
            status,
            message: message.into(),
        }
    }

    /// True when a request failed because its bearer token was rejected.
    pub fn is_auth_failure(&self) -> bool {
        matches!(self, Self::Network { status, .. } if *status == AUTH_FAILURE_STATUS)
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Network { status, .. } => Some(*status),
            Self::Http(err) => err.status().map(|status| status.as_u16()),
            _ => None,
        }
    }
}
