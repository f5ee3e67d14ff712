// Error types for commit-feed.
// Covers GitHub API failures, fetch timeouts, and configuration problems.

use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum FeedError {
    #[error("GitHub API error: {0}")]
    Api(#[from] reqwest::Error),

    #[error("Authentication failed: invalid or expired token")]
    Unauthorized,

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Repository is empty: {0}")]
    EmptyRepository(String),

    #[error("Rate limit exceeded, resets at {reset_at}")]
    RateLimited { reset_at: String },

    #[error("Missing GitHub token")]
    MissingToken,

    #[error("{operation} timed out after {after:?}")]
    Timeout {
        operation: &'static str,
        after: Duration,
    },

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("{0}")]
    Other(String),
}

impl FeedError {
    /// Whether the failed request is worth retrying after a backoff.
    pub fn is_transient(&self) -> bool {
        match self {
            FeedError::RateLimited { .. } => true,
            FeedError::Api(e) => e.is_timeout() || e.is_connect(),
            _ => false,
        }
    }

    /// Whether the error means "nothing there" rather than a failure.
    pub fn is_empty_result(&self) -> bool {
        matches!(
            self,
            FeedError::NotFound(_) | FeedError::EmptyRepository(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, FeedError>;
