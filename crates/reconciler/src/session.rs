//! One operator's editing session for one target.
//!
//! ```text
//! Idle --load--> Loaded --edit--> Editing --commit--> Planning --> Executing --> Resynced --> Loaded
//!   ^                                          |                                    |
//!   |                                          +--validation error--> (unchanged)    |
//!   +------------------------------- resync read failed ---------------------------+
//! ```

use std::fmt;
use std::sync::Arc;

use carequest_api::AssignmentApi;
use carequest_core::{Assignment, DesiredAssignmentList, Target, ValidationError};
use serde::Serialize;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::executor::OperationExecutor;
use crate::planner::ReconciliationPlanner;
use crate::reconciler::ReconcilerConfig;
use crate::resync::Resynchronizer;
use crate::store::AssignmentStateStore;
use crate::types::{ExecutionReport, Plan};

/// Where a session is in its load, edit and commit cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    /// No target selected.
    Idle,
    /// Known state fetched; desired list mirrors it.
    Loaded,
    /// Desired list has local edits.
    Editing,
    /// Commit requested; computing the plan.
    Planning,
    /// Sending operations.
    Executing,
    /// Known state re-read after execution.
    Resynced,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Loaded => "loaded",
            Self::Editing => "editing",
            Self::Planning => "planning",
            Self::Executing => "executing",
            Self::Resynced => "resynced",
        };
        f.write_str(name)
    }
}

/// How the post-execution reload went.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ResyncOutcome {
    /// Authoritative rows for the target, in canonical order.
    Synced { assignments: Vec<Assignment> },
    /// The reload failed; the session went back to idle.
    Failed { reason: String },
}

/// Result of a commit: the plan, what happened to it, and the fresh state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitOutcome {
    pub plan: Plan,
    pub report: ExecutionReport,
    pub resync: ResyncOutcome,
}

impl CommitOutcome {
    /// Whether every operation took effect and the reload succeeded.
    pub fn is_complete(&self) -> bool {
        self.report.is_complete() && matches!(self.resync, ResyncOutcome::Synced { .. })
    }

    /// Rows after the reload, if it succeeded.
    pub fn assignments(&self) -> Option<&[Assignment]> {
        match &self.resync {
            ResyncOutcome::Synced { assignments } => Some(assignments.as_slice()),
            ResyncOutcome::Failed { .. } => None,
        }
    }

    /// Convert an incomplete outcome into an error.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PartialFailure`] if any operation did not take effect,
    /// otherwise [`Error::Resync`] if the reload failed.
    pub fn into_result(self) -> Result<Self> {
        if !self.report.is_complete() {
            return Err(Error::PartialFailure(Box::new(self.report)));
        }
        if let ResyncOutcome::Failed { reason } = &self.resync {
            return Err(Error::resync(self.plan.target, reason.clone()));
        }
        Ok(self)
    }
}

/// Drives load, edit and commit for a single target.
///
/// Every commit ends with a reload, whatever happened during execution, and
/// the desired list is then rebuilt from the reloaded rows. Edits made before
/// the commit are never shown as saved unless the server has them.
pub struct ReconciliationSession {
    store: AssignmentStateStore,
    planner: ReconciliationPlanner,
    executor: OperationExecutor,
    resynchronizer: Resynchronizer,
    desired: Option<DesiredAssignmentList>,
    state: SessionState,
}

impl ReconciliationSession {
    /// Create an idle session.
    pub fn new(api: Arc<dyn AssignmentApi>, config: &ReconcilerConfig) -> Self {
        Self {
            store: AssignmentStateStore::new(api.clone()),
            planner: ReconciliationPlanner::new(config),
            executor: OperationExecutor::new(api.clone(), config.failure_policy),
            resynchronizer: Resynchronizer::new(api),
            desired: None,
            state: SessionState::Idle,
        }
    }

    /// Current state.
    pub const fn state(&self) -> SessionState {
        self.state
    }

    /// Selected target, if any.
    pub const fn target(&self) -> Option<Target> {
        self.store.target()
    }

    /// Last known authoritative rows.
    pub fn known(&self) -> &[Assignment] {
        self.store.snapshot()
    }

    /// The list being edited.
    pub const fn desired(&self) -> Option<&DesiredAssignmentList> {
        self.desired.as_ref()
    }

    /// Select `target` and fetch its assignments. Local edits are discarded.
    ///
    /// Also the way out of a commit that was dropped mid-flight.
    ///
    /// # Errors
    ///
    /// Returns the read error. The session keeps its previous state.
    pub async fn load(&mut self, target: Target) -> Result<&[Assignment]> {
        let rows = self.store.load(target).await?;
        self.desired = Some(DesiredAssignmentList::from_known(target, rows));
        self.transition(SessionState::Loaded);
        Ok(self.store.snapshot())
    }

    /// Apply an edit to the desired list.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::NoTarget`] before a load, and whatever the
    /// edit itself returns. A failed edit leaves the list unchanged.
    pub fn edit<F>(&mut self, edit: F) -> Result<&DesiredAssignmentList>
    where
        F: FnOnce(&DesiredAssignmentList) -> carequest_core::Result<DesiredAssignmentList>,
    {
        let current = self.current_desired()?;
        let next = edit(current)?;
        self.set_desired(next)
    }

    /// Replace the desired list outright.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::NoTarget`] before a load, and
    /// [`ValidationError::TargetMismatch`] if `desired` is for another target.
    pub fn set_desired(&mut self, desired: DesiredAssignmentList) -> Result<&DesiredAssignmentList> {
        self.require_settled()?;
        let target = self.target().ok_or(ValidationError::NoTarget)?;
        if desired.target() != target {
            return Err(ValidationError::target_mismatch(target, desired.target()).into());
        }
        self.transition(SessionState::Editing);
        Ok(&*self.desired.insert(desired))
    }

    /// Preview the plan a commit would execute. Sends nothing.
    ///
    /// # Errors
    ///
    /// Returns a validation error if no target is loaded or the desired list
    /// is invalid.
    pub fn plan(&self) -> Result<Plan> {
        let desired = self.current_desired()?;
        Ok(self.planner.plan(desired, self.store.snapshot())?)
    }

    /// Plan, execute and reload.
    ///
    /// Validation errors are returned before anything is sent, with the
    /// session unchanged. Once execution starts the call always returns an
    /// outcome: per-operation failures are in the report and a failed reload
    /// is in [`CommitOutcome::resync`], leaving the session idle.
    ///
    /// # Errors
    ///
    /// Returns a validation error from planning.
    pub async fn commit(&mut self) -> Result<CommitOutcome> {
        self.require_settled()?;
        let desired = self.current_desired()?.clone();
        let target = desired.target();
        let before = self.state;

        self.transition(SessionState::Planning);
        let plan = match self.planner.plan(&desired, self.store.snapshot()) {
            Ok(plan) => plan,
            Err(e) => {
                self.transition(before);
                return Err(e.into());
            }
        };

        self.transition(SessionState::Executing);
        let report = self.executor.apply(&plan).await;

        let resync = match self.resynchronizer.resync(&mut self.store, target).await {
            Ok(rows) => {
                self.transition(SessionState::Resynced);
                self.desired = Some(DesiredAssignmentList::from_known(target, &rows));
                self.transition(SessionState::Loaded);
                ResyncOutcome::Synced { assignments: rows }
            }
            Err(e) => {
                self.store.clear();
                self.desired = None;
                self.transition(SessionState::Idle);
                ResyncOutcome::Failed {
                    reason: e.to_string(),
                }
            }
        };

        info!(%target, outcome = %report.summary(), "Commit finished");

        Ok(CommitOutcome {
            plan,
            report,
            resync,
        })
    }

    fn current_desired(&self) -> Result<&DesiredAssignmentList> {
        self.desired
            .as_ref()
            .ok_or_else(|| ValidationError::NoTarget.into())
    }

    fn require_settled(&self) -> Result<()> {
        match self.state {
            SessionState::Planning | SessionState::Executing => {
                Err(Error::invalid_state("idle, loaded or editing", self.state))
            }
            _ => Ok(()),
        }
    }

    fn transition(&mut self, next: SessionState) {
        debug!(from = %self.state, to = %next, "Session transition");
        self.state = next;
    }
}
