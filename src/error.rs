//! Error types for mailnav
//!
//! Every failure that comes out of a navigator or store operation
//! carries the attempted action and the mailbox path it was attempted
//! on, since assertion layers report these messages verbatim.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Authentication failed for {target}: {reason}")]
    AuthenticationFailed { target: String, reason: String },

    #[error("{action} '{path}': not found")]
    NotFound { action: String, path: String },

    #[error("{action} '{path}': {reason}")]
    InvalidState {
        action: String,
        path: String,
        reason: String,
    },

    #[error("{action} '{path}' failed: {reason}")]
    RemoteUnavailable {
        action: String,
        path: String,
        reason: String,
    },

    #[error("Invalid argument '{name}': {reason}")]
    InvalidArgument { name: String, reason: String },

    #[error("Assertion failed on '{resource}': {expectation}")]
    AssertionFailed {
        resource: String,
        expectation: String,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub(crate) fn not_found(action: &str, path: &str) -> Self {
        Self::NotFound {
            action: action.to_string(),
            path: path.to_string(),
        }
    }

    pub(crate) fn invalid_state(action: &str, path: &str, reason: impl Into<String>) -> Self {
        Self::InvalidState {
            action: action.to_string(),
            path: path.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn remote(action: &str, path: &str, reason: impl ToString) -> Self {
        Self::RemoteUnavailable {
            action: action.to_string(),
            path: path.to_string(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn invalid_argument(name: &str, reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            name: name.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn assertion(resource: &str, expectation: impl Into<String>) -> Self {
        Self::AssertionFailed {
            resource: resource.to_string(),
            expectation: expectation.into(),
        }
    }

    /// Whether this error reports a missing folder or message.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

pub type Result<T> = std::result::Result<T, Error>;
