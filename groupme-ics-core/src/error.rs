//! Error types for the GroupMe calendar feed.

use thiserror::Error;

/// Broad classification of a [`FeedError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Missing or invalid settings. Terminal for the request.
    Config,
    /// The GroupMe API failed or returned something unusable.
    Upstream,
    /// A timestamp in an upstream event could not be parsed.
    Parse,
}

/// Errors that can occur while producing the calendar feed.
#[derive(Error, Debug)]
pub enum FeedError {
    #[error("{0} not set")]
    MissingSetting(&'static str),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("GroupMe API returned {status} for group {group_id}")]
    UpstreamStatus { group_id: String, status: u16 },

    #[error("GroupMe request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Unexpected GroupMe response: {0}")]
    UpstreamBody(String),

    #[error("Error loading calendar for group IDs {}", .0.join(", "))]
    NoEvents(Vec<String>),

    #[error("Invalid {field} timestamp '{value}'")]
    Timestamp { field: &'static str, value: String },
}

impl FeedError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            FeedError::MissingSetting(_) | FeedError::Config(_) | FeedError::InvalidUrl { .. } => {
                ErrorKind::Config
            }
            FeedError::UpstreamStatus { .. }
            | FeedError::Http(_)
            | FeedError::UpstreamBody(_)
            | FeedError::NoEvents(_) => ErrorKind::Upstream,
            FeedError::Timestamp { .. } => ErrorKind::Parse,
        }
    }
}

impl From<config::ConfigError> for FeedError {
    fn from(err: config::ConfigError) -> Self {
        FeedError::Config(err.to_string())
    }
}

/// Result type alias for feed operations.
pub type FeedResult<T> = Result<T, FeedError>;
