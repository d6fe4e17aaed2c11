//! Error types for the reconciler crate.

use carequest_core::{QuestionId, Target, ValidationError};
use thiserror::Error;

use crate::session::SessionState;
use crate::types::{ExecutionReport, FailedOperation, Operation, OperationError};

/// Result type alias for reconciler operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Reconciler error types.
#[derive(Debug, Error)]
pub enum Error {
    /// The desired list or a fetched row is malformed. Nothing was sent.
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// A remote operation never got a response.
    #[error("network failure during '{operation}': {reason}")]
    Network { operation: Operation, reason: String },

    /// The server refused a write as conflicting with existing rows.
    #[error("conflict during '{operation}': {reason}")]
    Conflict {
        operation: Operation,
        question_id: Option<QuestionId>,
        reason: String,
    },

    /// The server rejected a write for another reason.
    #[error("server rejected '{operation}': {reason}")]
    Rejected {
        operation: Operation,
        status: Option<u16>,
        reason: String,
    },

    /// Some operations of a plan took effect and some did not.
    #[error("partial failure: {}", .0.summary())]
    PartialFailure(Box<ExecutionReport>),

    /// Re-reading the authoritative state failed.
    #[error("failed to reload assignments for {target}: {reason}")]
    Resync { target: Target, reason: String },

    /// A call outside plan execution failed.
    #[error("assignment API error: {0}")]
    Api(#[from] carequest_api::Error),

    /// The session is not in a state that allows the call.
    #[error("session is {actual}, expected {expected}")]
    InvalidState {
        expected: &'static str,
        actual: SessionState,
    },

    /// Invalid configuration.
    #[error("invalid configuration: {reason}")]
    InvalidConfig { reason: String },
}

impl From<FailedOperation> for Error {
    fn from(failed: FailedOperation) -> Self {
        let operation = failed.operation;
        match failed.error {
            OperationError::Network { reason } => Self::Network { operation, reason },
            OperationError::Conflict {
                question_id,
                reason,
            } => Self::Conflict {
                operation,
                question_id,
                reason,
            },
            OperationError::Rejected { status, reason } => Self::Rejected {
                operation,
                status,
                reason,
            },
        }
    }
}

impl Error {
    /// Create a resync error.
    pub fn resync(target: Target, reason: impl Into<String>) -> Self {
        Self::Resync {
            target,
            reason: reason.into(),
        }
    }

    /// Create an invalid state error.
    pub const fn invalid_state(expected: &'static str, actual: SessionState) -> Self {
        Self::InvalidState { expected, actual }
    }

    /// Create an invalid config error.
    pub fn invalid_config(reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            reason: reason.into(),
        }
    }

    /// The execution report carried by a partial failure.
    pub fn report(&self) -> Option<&ExecutionReport> {
        match self {
            Self::PartialFailure(report) => Some(report.as_ref()),
            _ => None,
        }
    }

    /// Whether this error was raised before anything was sent.
    pub const fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}

#[cfg(test)]
mod tests {
    use carequest_core::{AssignmentId, Priority, UserId};

    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::invalid_config("assignment API is required");
        assert_eq!(
            err.to_string(),
            "invalid configuration: assignment API is required"
        );

        let err = Error::resync(Target::User(UserId::new(4)), "timed out");
        assert_eq!(
            err.to_string(),
            "failed to reload assignments for user 4: timed out"
        );
    }

    #[test]
    fn test_failed_operation_conversion() {
        let operation = Operation::Create {
            question_id: QuestionId::new(9),
            priority: Priority::FIRST,
        };
        let err = Error::from(FailedOperation {
            operation,
            error: OperationError::Conflict {
                question_id: Some(QuestionId::new(9)),
                reason: "already assigned".to_string(),
            },
        });
        assert!(matches!(
            err,
            Error::Conflict { question_id: Some(q), .. } if q == QuestionId::new(9)
        ));

        let err = Error::from(FailedOperation {
            operation: Operation::Delete {
                id: AssignmentId::new(2),
            },
            error: OperationError::Network {
                reason: "reset".to_string(),
            },
        });
        assert!(err.to_string().contains("delete assignment 2"));
    }

    #[test]
    fn test_partial_failure_exposes_report() {
        let report = ExecutionReport::new(Target::User(UserId::new(1)));
        let err = Error::PartialFailure(Box::new(report));
        assert_eq!(err.report().map(ExecutionReport::total), Some(0));
        assert!(!err.is_validation());
    }
}
