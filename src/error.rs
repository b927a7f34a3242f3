//! Router Error Types
//!
//! Every per-request failure is terminal for that request; configuration
//! errors only ever surface while the router is being built.

use crate::admission::RateWindow;
use thiserror::Error;

/// Main error type for routing operations
#[derive(Debug, Error, Clone, PartialEq)]
pub enum RouterError {
    /// No credential was presented, or the header was malformed
    #[error("Missing API key. Send it as `Authorization: Bearer <key>`")]
    MissingCredential,

    /// A credential was presented but is not on the allow-list
    #[error("Invalid API key")]
    InvalidCredential,

    /// The identity is over quota for one of its windows
    #[error("Rate limit exceeded: {window} limit reached, retry after {retry_after_secs} seconds")]
    RateLimitExceeded {
        window: RateWindow,
        retry_after_secs: u64,
    },

    /// Configuration errors (invalid JSON, empty preference tables, etc.)
    #[error("Configuration error: {0}")]
    Config(String),
}

impl RouterError {
    /// HTTP status an upstream handler should answer with
    pub fn status_code(&self) -> u16 {
        match self {
            RouterError::MissingCredential | RouterError::InvalidCredential => 401,
            RouterError::RateLimitExceeded { .. } => 429,
            RouterError::Config(_) => 500,
        }
    }

    /// Seconds the caller should wait before retrying, if any
    pub fn retry_after(&self) -> Option<u64> {
        match self {
            RouterError::RateLimitExceeded {
                retry_after_secs, ..
            } => Some(*retry_after_secs),
            _ => None,
        }
    }

    /// True for "who are you" failures, false for quota and config failures
    pub fn is_auth_failure(&self) -> bool {
        matches!(
            self,
            RouterError::MissingCredential | RouterError::InvalidCredential
        )
    }

    /// Stable machine-readable code for error bodies
    pub fn code(&self) -> &'static str {
        match self {
            RouterError::MissingCredential => "missing_api_key",
            RouterError::InvalidCredential => "invalid_api_key",
            RouterError::RateLimitExceeded { .. } => "rate_limit_exceeded",
            RouterError::Config(_) => "configuration_error",
        }
    }
}

impl From<std::io::Error> for RouterError {
    fn from(err: std::io::Error) -> Self {
        RouterError::Config(format!("IO error: {}", err))
    }
}

impl From<serde_json::Error> for RouterError {
    fn from(err: serde_json::Error) -> Self {
        RouterError::Config(format!("JSON parsing error: {}", err))
    }
}

/// Result type alias for routing operations
pub type Result<T> = std::result::Result<T, RouterError>;
