//! Reconciliation of priority-ordered question assignments.
//!
//! The remote store only offers per-row create, update and delete. An
//! operator's whole-list edit is turned into a minimal set of those calls:
//!
//! - **Known state**: the authoritative rows for a target, fetched via
//!   [`AssignmentStateStore`]
//! - **Desired state**: the operator's ordered list of questions
//! - **Diff**: [`diff`] computes a [`Plan`] of creates, updates and deletes
//! - **Execute**: [`OperationExecutor`] applies it, deletes first, and
//!   reports each operation's fate in an [`ExecutionReport`]
//! - **Resync**: [`Resynchronizer`] re-reads the authoritative rows, since
//!   the server issues ids and may have applied only part of the plan
//!
//! [`ReconciliationSession`] ties these into a load, edit, commit cycle.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//!
//! use carequest_api::HttpAssignmentApi;
//! use carequest_core::{QuestionId, Target, UserId};
//! use carequest_reconciler::ReconcilerBuilder;
//!
//! let api = Arc::new(HttpAssignmentApi::with_url("https://care.example.org/api".parse()?)?);
//! let reconciler = ReconcilerBuilder::new().with_api(api).build()?;
//!
//! let mut session = reconciler.session();
//! session.load(Target::User(UserId::new(4))).await?;
//! session.edit(|list| list.with_appended(QuestionId::new(9)))?;
//! let outcome = session.commit().await?;
//! println!("{}", outcome.report.summary());
//! ```

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod bulk;
pub mod error;
pub mod executor;
pub mod planner;
pub mod reconciler;
pub mod resync;
pub mod session;
pub mod store;
pub mod types;

// Re-export main types
pub use bulk::BulkFanoutAssigner;
pub use error::{Error, Result};
pub use executor::{FailurePolicy, OperationExecutor};
pub use planner::{ReconciliationPlanner, diff};
pub use reconciler::{Reconciler, ReconcilerBuilder, ReconcilerConfig};
pub use resync::Resynchronizer;
pub use session::{CommitOutcome, ReconciliationSession, ResyncOutcome, SessionState};
pub use store::AssignmentStateStore;
pub use types::{
    ExecutionReport, FailedOperation, Operation, OperationError, OperationKind, Plan, PlannedCreate,
    PlannedUpdate,
};
