//! Local snapshot of the authoritative assignments for one target.

use std::sync::Arc;

use carequest_api::AssignmentApi;
use carequest_core::{Assignment, Target, ValidationError, sort_canonical};
use itertools::Itertools;
use tracing::{debug, warn};

use crate::error::Result;

/// Holds the last-known assignments for the selected target.
///
/// The snapshot only ever changes by being replaced wholesale with a fresh
/// read, so readers never observe a half-applied plan.
pub struct AssignmentStateStore {
    api: Arc<dyn AssignmentApi>,
    target: Option<Target>,
    assignments: Vec<Assignment>,
}

impl AssignmentStateStore {
    /// Create an empty store.
    pub fn new(api: Arc<dyn AssignmentApi>) -> Self {
        Self {
            api,
            target: None,
            assignments: Vec::new(),
        }
    }

    /// Fetch every assignment for `target` and make it the current snapshot.
    ///
    /// # Errors
    ///
    /// Returns an API error if the read fails, or a validation error if the
    /// server returns rows for another target. The previous snapshot is kept
    /// on error.
    pub async fn load(&mut self, target: Target) -> Result<&[Assignment]> {
        let rows = fetch_canonical(self.api.as_ref(), target).await?;
        self.replace(target, rows);
        Ok(self.snapshot())
    }

    /// Current rows, sorted by priority then id.
    pub fn snapshot(&self) -> &[Assignment] {
        &self.assignments
    }

    /// The target the snapshot belongs to.
    pub const fn target(&self) -> Option<Target> {
        self.target
    }

    /// Whether a target has been loaded.
    pub const fn is_loaded(&self) -> bool {
        self.target.is_some()
    }

    pub(crate) fn replace(&mut self, target: Target, rows: Vec<Assignment>) {
        self.target = Some(target);
        self.assignments = rows;
    }

    pub(crate) fn clear(&mut self) {
        self.target = None;
        self.assignments.clear();
    }
}

/// List a target's rows, check them, and sort them canonically.
///
/// Duplicate questions and gaps in the priority sequence are tolerated, since
/// other sessions may have left them, but logged.
pub(crate) async fn fetch_canonical(
    api: &dyn AssignmentApi,
    target: Target,
) -> Result<Vec<Assignment>> {
    let mut rows = api.list(target).await?;

    if let Some(row) = rows.iter().find(|row| row.target != target) {
        return Err(ValidationError::target_mismatch(target, row.target).into());
    }

    sort_canonical(&mut rows);

    let duplicates: Vec<_> = rows.iter().map(|row| row.question_id).duplicates().collect();
    if !duplicates.is_empty() {
        warn!(
            %target,
            questions = %duplicates.iter().join(","),
            "Remote state assigns a question more than once"
        );
    }

    let dense = rows
        .iter()
        .enumerate()
        .all(|(index, row)| usize::try_from(row.priority.get()).ok() == index.checked_add(1));
    if !dense {
        debug!(%target, "Remote priorities are not a dense 1..n sequence");
    }

    Ok(rows)
}
