//! Error taxonomy for the proxy.
//!
//! Only [`ValidationError`] and [`UpstreamError`] ever reach a caller; cache
//! failures are logged by the orchestrator and never fail a request.

use thiserror::Error;

/// How the transport layer should report a failed request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    BadRequest,
    ServerError,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("City and country or latitude and longitude are required")]
    MissingLocation,
}

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache connection failed: {0}")]
    Connection(#[source] redis::RedisError),

    #[error("cache command failed: {0}")]
    Command(#[from] redis::RedisError),

    #[error("cache unavailable, waiting to reconnect")]
    Unavailable,
}

#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("request to weather provider failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("weather provider responded with status {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("weather provider returned malformed JSON: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("invalid weather provider configuration: {0}")]
    Configuration(String),
}

/// Error returned by a single proxied weather request.
#[derive(Debug, Error)]
pub enum ProxyError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Upstream(#[from] UpstreamError),
}

impl ProxyError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            ProxyError::Validation(_) => ErrorCategory::BadRequest,
            ProxyError::Upstream(_) => ErrorCategory::ServerError,
        }
    }
}
