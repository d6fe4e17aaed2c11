//! # carequest-core
//!
//! Data model for question assignments: who a question is assigned to, in
//! which order, and the operator's desired ordering.
//!
//! This crate performs no I/O. Everything here is plain data plus the
//! validation that must happen before any remote call is issued.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod desired;
pub mod error;
pub mod ids;
pub mod model;

pub use desired::{DesiredAssignmentEntry, DesiredAssignmentList};
pub use error::{Result, ValidationError};
pub use ids::{AssignmentId, CategoryId, GroupId, QuestionId, UserId};
pub use model::{Assignment, Category, Priority, Question, Target, sort_canonical};
