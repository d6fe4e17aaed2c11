//! Plans, operations and execution reports.

use std::fmt;

use carequest_core::{AssignmentId, Priority, QuestionId, Target};
use serde::Serialize;

/// A row to create.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlannedCreate {
    pub question_id: QuestionId,
    pub priority: Priority,
}

/// A row whose priority changes in place.
///
/// `question_id` is carried because the update endpoint takes the full row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlannedUpdate {
    pub id: AssignmentId,
    pub question_id: QuestionId,
    pub priority: Priority,
}

/// Operations that turn known state into desired state for one target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Plan {
    pub target: Target,
    pub to_create: Vec<PlannedCreate>,
    pub to_update: Vec<PlannedUpdate>,
    pub to_delete: Vec<AssignmentId>,
}

impl Plan {
    /// A plan with nothing to do.
    pub const fn empty(target: Target) -> Self {
        Self {
            target,
            to_create: Vec::new(),
            to_update: Vec::new(),
            to_delete: Vec::new(),
        }
    }

    /// Whether the plan has no operations.
    pub fn is_empty(&self) -> bool {
        self.to_create.is_empty() && self.to_update.is_empty() && self.to_delete.is_empty()
    }

    /// Total number of operations.
    pub fn len(&self) -> usize {
        self.to_create
            .len()
            .saturating_add(self.to_update.len())
            .saturating_add(self.to_delete.len())
    }

    /// Operations of one class, in plan order.
    pub fn operations_of(&self, kind: OperationKind) -> Vec<Operation> {
        match kind {
            OperationKind::Delete => self
                .to_delete
                .iter()
                .map(|id| Operation::Delete { id: *id })
                .collect(),
            OperationKind::Update => self
                .to_update
                .iter()
                .map(|u| Operation::Update {
                    id: u.id,
                    question_id: u.question_id,
                    priority: u.priority,
                })
                .collect(),
            OperationKind::Create => self
                .to_create
                .iter()
                .map(|c| Operation::Create {
                    question_id: c.question_id,
                    priority: c.priority,
                })
                .collect(),
        }
    }

    /// All operations in execution order: deletes, updates, creates.
    pub fn operations(&self) -> Vec<Operation> {
        OperationKind::EXECUTION_ORDER
            .iter()
            .flat_map(|kind| self.operations_of(*kind))
            .collect()
    }
}

impl fmt::Display for Plan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "plan for {}: {} delete(s), {} update(s), {} create(s)",
            self.target,
            self.to_delete.len(),
            self.to_update.len(),
            self.to_create.len()
        )?;
        for operation in self.operations() {
            write!(f, "\n  {operation}")?;
        }
        Ok(())
    }
}

/// Class of a single remote write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
    Delete,
    Update,
    Create,
}

impl OperationKind {
    /// Order in which classes are executed.
    pub const EXECUTION_ORDER: [Self; 3] = [Self::Delete, Self::Update, Self::Create];
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Delete => write!(f, "delete"),
            Self::Update => write!(f, "update"),
            Self::Create => write!(f, "create"),
        }
    }
}

/// A single remote write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum Operation {
    #[serde(rename_all = "camelCase")]
    Delete { id: AssignmentId },
    #[serde(rename_all = "camelCase")]
    Update {
        id: AssignmentId,
        question_id: QuestionId,
        priority: Priority,
    },
    #[serde(rename_all = "camelCase")]
    Create {
        question_id: QuestionId,
        priority: Priority,
    },
}

impl Operation {
    /// The class of this operation.
    pub const fn kind(&self) -> OperationKind {
        match self {
            Self::Delete { .. } => OperationKind::Delete,
            Self::Update { .. } => OperationKind::Update,
            Self::Create { .. } => OperationKind::Create,
        }
    }

    /// The question this operation concerns, when known.
    pub const fn question_id(&self) -> Option<QuestionId> {
        match self {
            Self::Delete { .. } => None,
            Self::Update { question_id, .. } | Self::Create { question_id, .. } => {
                Some(*question_id)
            }
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Delete { id } => write!(f, "delete assignment {id}"),
            Self::Update {
                id,
                question_id,
                priority,
            } => write!(
                f,
                "move assignment {id} (question {question_id}) to priority {priority}"
            ),
            Self::Create {
                question_id,
                priority,
            } => write!(f, "assign question {question_id} at priority {priority}"),
        }
    }
}

/// Why a single operation failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum OperationError {
    /// The request never produced a response.
    Network { reason: String },
    /// The server refused the write as conflicting with existing rows.
    #[serde(rename_all = "camelCase")]
    Conflict {
        question_id: Option<QuestionId>,
        reason: String,
    },
    /// The server answered with another non-success status, or the exchange
    /// failed above the transport.
    Rejected { status: Option<u16>, reason: String },
}

impl OperationError {
    /// Classify an API error raised by `operation`.
    pub fn from_api(operation: &Operation, error: &carequest_api::Error) -> Self {
        match error {
            carequest_api::Error::Conflict { .. } => Self::Conflict {
                question_id: operation.question_id(),
                reason: error.to_string(),
            },
            carequest_api::Error::Rejected { status, .. } => Self::Rejected {
                status: Some(*status),
                reason: error.to_string(),
            },
            e if e.is_transport() => Self::Network {
                reason: error.to_string(),
            },
            _ => Self::Rejected {
                status: None,
                reason: error.to_string(),
            },
        }
    }
}

impl fmt::Display for OperationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Network { reason } => write!(f, "network error: {reason}"),
            Self::Conflict { reason, .. } => write!(f, "conflict: {reason}"),
            Self::Rejected { reason, .. } => write!(f, "rejected: {reason}"),
        }
    }
}

/// An operation together with the reason it failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedOperation {
    pub operation: Operation,
    pub error: OperationError,
}

impl fmt::Display for FailedOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} failed: {}", self.operation, self.error)
    }
}

/// What an execution attempt did, operation by operation.
///
/// Nothing here is rolled back: every entry in `succeeded` has taken effect
/// remotely even when other operations failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionReport {
    pub target: Target,
    pub succeeded: Vec<Operation>,
    pub failed: Vec<FailedOperation>,
    pub not_attempted: Vec<Operation>,
}

impl ExecutionReport {
    /// An empty report.
    pub const fn new(target: Target) -> Self {
        Self {
            target,
            succeeded: Vec::new(),
            failed: Vec::new(),
            not_attempted: Vec::new(),
        }
    }

    /// Number of operations in the plan that was applied.
    pub fn total(&self) -> usize {
        self.succeeded
            .len()
            .saturating_add(self.failed.len())
            .saturating_add(self.not_attempted.len())
    }

    /// Whether every planned operation took effect.
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty() && self.not_attempted.is_empty()
    }

    /// Operator-facing outcome, e.g. "2 of 3 changes saved".
    pub fn summary(&self) -> String {
        format!("{} of {} changes saved", self.succeeded.len(), self.total())
    }

    /// Turn an incomplete report into a partial-failure error.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::PartialFailure`] unless the report is complete.
    pub fn into_result(self) -> crate::Result<Self> {
        if self.is_complete() {
            Ok(self)
        } else {
            Err(crate::Error::PartialFailure(Box::new(self)))
        }
    }
}

impl fmt::Display for ExecutionReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.summary())?;
        for failure in &self.failed {
            write!(f, "\n  {failure}")?;
        }
        for operation in &self.not_attempted {
            write!(f, "\n  {operation} not attempted")?;
        }
        Ok(())
    }
}
