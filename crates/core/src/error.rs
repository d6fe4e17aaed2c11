//! Validation errors for the assignment data model.
//!
//! Every variant is raised before any remote call is issued, so a caller
//! can fix its input and retry without side effects.

use thiserror::Error;

use crate::ids::QuestionId;
use crate::model::Target;

/// Result type for data-model operations.
pub type Result<T> = std::result::Result<T, ValidationError>;

/// Malformed input detected locally.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("question {question_id} appears more than once in the desired list")]
    DuplicateQuestion { question_id: QuestionId },

    #[error("no target selected")]
    NoTarget,

    #[error("desired list is empty but at least one assignment is required")]
    EmptyDesiredList,

    #[error("priority must be at least 1, got {value}")]
    InvalidPriority { value: i64 },

    #[error("assignment belongs to {found}, expected {expected}")]
    TargetMismatch { expected: Target, found: Target },

    #[error("assignment must name exactly one of user or group")]
    AmbiguousTarget,

    #[error("position {position} is outside 1..={len}")]
    InvalidPosition { position: usize, len: usize },

    #[error("question {question_id} is not in the desired list")]
    UnknownQuestion { question_id: QuestionId },
}

impl ValidationError {
    /// Create a duplicate question error.
    pub const fn duplicate_question(question_id: QuestionId) -> Self {
        Self::DuplicateQuestion { question_id }
    }

    /// Create a target mismatch error.
    pub const fn target_mismatch(expected: Target, found: Target) -> Self {
        Self::TargetMismatch { expected, found }
    }

    /// Create an invalid position error.
    pub const fn invalid_position(position: usize, len: usize) -> Self {
        Self::InvalidPosition { position, len }
    }
}
