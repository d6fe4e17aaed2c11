//! Error types for the assignment API collaborator.

use carequest_core::ValidationError;
use thiserror::Error;

/// Result type for assignment API operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while talking to the assignment API.
#[derive(Error, Debug)]
pub enum Error {
    /// The request never produced a response (connect, DNS, timeout, reset).
    #[error("transport failed: {reason}")]
    Transport { reason: String },

    /// The server refused the write because it conflicts with existing rows.
    #[error("conflict ({status}): {body}")]
    Conflict { status: u16, body: String },

    /// The server answered with any other non-success status.
    #[error("server rejected request ({status}): {body}")]
    Rejected { status: u16, body: String },

    /// A row returned by the server does not satisfy the data model.
    #[error("invalid assignment record: {0}")]
    InvalidRecord(#[from] ValidationError),

    /// Configuration error.
    #[error("configuration error: {reason}")]
    Config { reason: String },

    /// A response arrived but its body could not be read or decoded.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// URL parse error.
    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),
}

impl Error {
    /// Create a transport error.
    pub fn transport(reason: impl Into<String>) -> Self {
        Self::Transport {
            reason: reason.into(),
        }
    }

    /// Create a conflict error.
    pub fn conflict(status: u16, body: impl Into<String>) -> Self {
        Self::Conflict {
            status,
            body: body.into(),
        }
    }

    /// Create a rejected error.
    pub fn rejected(status: u16, body: impl Into<String>) -> Self {
        Self::Rejected {
            status,
            body: body.into(),
        }
    }

    /// Create a config error.
    pub fn config(reason: impl Into<String>) -> Self {
        Self::Config {
            reason: reason.into(),
        }
    }

    /// Whether the server rejected the operation as conflicting.
    pub const fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }

    /// Whether the failure happened below HTTP semantics.
    pub const fn is_transport(&self) -> bool {
        matches!(self, Self::Transport { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conflict_classification() {
        let err = Error::conflict(409, "duplicate");
        assert!(err.is_conflict());
        assert!(!err.is_transport());
        assert!(err.to_string().contains("409"));
    }

    #[test]
    fn test_transport_classification() {
        let err = Error::transport("connection reset");
        assert!(err.is_transport());
        assert!(!err.is_conflict());
    }

    #[test]
    fn test_rejected_is_neither() {
        let err = Error::rejected(500, "boom");
        assert!(!err.is_transport());
        assert!(!err.is_conflict());
    }
}
