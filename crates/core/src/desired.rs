//! The desired assignment list: the operator's intended ordering for one target.
//!
//! A `DesiredAssignmentList` is an immutable value. Every edit returns a new
//! list, so the ordering that feeds the planner is always explicit.

use std::collections::HashMap;

use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::error::{Result, ValidationError};
use crate::ids::{AssignmentId, QuestionId};
use crate::model::{Assignment, Priority, Target, sort_canonical};

/// One entry of a desired list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DesiredAssignmentEntry {
    pub question_id: QuestionId,
    /// Set when the entry corresponds to a row already known to exist remotely.
    #[serde(default)]
    pub existing_assignment_id: Option<AssignmentId>,
}

impl DesiredAssignmentEntry {
    /// An entry for a question that is not assigned yet.
    pub const fn new(question_id: QuestionId) -> Self {
        Self {
            question_id,
            existing_assignment_id: None,
        }
    }

    /// An entry backed by a persisted assignment.
    pub const fn existing(question_id: QuestionId, id: AssignmentId) -> Self {
        Self {
            question_id,
            existing_assignment_id: Some(id),
        }
    }
}

/// Ordered desired entries for one target. Position `i` (1-based) is the
/// intended priority.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DesiredAssignmentList {
    target: Target,
    entries: Vec<DesiredAssignmentEntry>,
}

impl DesiredAssignmentList {
    /// Create a list from explicit entries.
    pub const fn new(target: Target, entries: Vec<DesiredAssignmentEntry>) -> Self {
        Self { target, entries }
    }

    /// An empty list for a target.
    pub const fn empty(target: Target) -> Self {
        Self::new(target, Vec::new())
    }

    /// Seed a list from the known rows of `target`, in canonical order.
    pub fn from_known(target: Target, known: &[Assignment]) -> Self {
        let mut rows: Vec<Assignment> = known
            .iter()
            .filter(|row| row.target == target)
            .cloned()
            .collect();
        sort_canonical(&mut rows);
        let entries = rows
            .iter()
            .map(|row| DesiredAssignmentEntry::existing(row.question_id, row.id))
            .collect();
        Self::new(target, entries)
    }

    /// Build a list from an ordered sequence of question ids, attaching the
    /// id of any row that already assigns the question to this target.
    pub fn from_question_ids(
        target: Target,
        question_ids: impl IntoIterator<Item = QuestionId>,
        known: &[Assignment],
    ) -> Self {
        let mut sorted = known.to_vec();
        sort_canonical(&mut sorted);
        // First row wins when the remote store already holds duplicates.
        let existing: HashMap<QuestionId, AssignmentId> = sorted
            .iter()
            .rev()
            .filter(|row| row.target == target)
            .map(|row| (row.question_id, row.id))
            .collect();

        let entries = question_ids
            .into_iter()
            .map(|question_id| DesiredAssignmentEntry {
                question_id,
                existing_assignment_id: existing.get(&question_id).copied(),
            })
            .collect();
        Self::new(target, entries)
    }

    /// The target this list is for.
    pub const fn target(&self) -> Target {
        self.target
    }

    /// Entries in desired order.
    pub fn entries(&self) -> &[DesiredAssignmentEntry] {
        &self.entries
    }

    /// Entries paired with their intended priority.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidPriority`] if the list is longer than
    /// a priority can express.
    pub fn prioritized(&self) -> Result<Vec<(Priority, DesiredAssignmentEntry)>> {
        self.entries
            .iter()
            .enumerate()
            .map(|(index, entry)| Priority::from_index(index).map(|p| (p, *entry)))
            .collect()
    }

    /// Question ids in desired order.
    pub fn question_ids(&self) -> Vec<QuestionId> {
        self.entries.iter().map(|e| e.question_id).collect()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the list has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether a question is in the list.
    pub fn contains(&self, question_id: QuestionId) -> bool {
        self.position_of(question_id).is_some()
    }

    fn position_of(&self, question_id: QuestionId) -> Option<usize> {
        self.entries.iter().position(|e| e.question_id == question_id)
    }

    /// Check the list before any remote call is made.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::DuplicateQuestion`] for the first repeated
    /// question, or [`ValidationError::EmptyDesiredList`] when
    /// `require_non_empty` is set and the list is empty.
    pub fn validate(&self, require_non_empty: bool) -> Result<()> {
        if require_non_empty && self.entries.is_empty() {
            return Err(ValidationError::EmptyDesiredList);
        }
        match self.entries.iter().map(|e| e.question_id).duplicates().next() {
            Some(question_id) => Err(ValidationError::duplicate_question(question_id)),
            None => Ok(()),
        }
    }

    /// A new list with the question appended at the end.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::DuplicateQuestion`] if it is already present.
    pub fn with_appended(&self, question_id: QuestionId) -> Result<Self> {
        if self.contains(question_id) {
            return Err(ValidationError::duplicate_question(question_id));
        }
        let mut entries = self.entries.clone();
        entries.push(DesiredAssignmentEntry::new(question_id));
        Ok(Self::new(self.target, entries))
    }

    /// A new list without the question.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::UnknownQuestion`] if it is not present.
    pub fn without(&self, question_id: QuestionId) -> Result<Self> {
        if !self.contains(question_id) {
            return Err(ValidationError::UnknownQuestion { question_id });
        }
        let entries = self
            .entries
            .iter()
            .filter(|e| e.question_id != question_id)
            .copied()
            .collect();
        Ok(Self::new(self.target, entries))
    }

    /// A new list with the question moved to a 1-based position.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::UnknownQuestion`] or
    /// [`ValidationError::InvalidPosition`].
    pub fn moved(&self, question_id: QuestionId, position: usize) -> Result<Self> {
        let from = self
            .position_of(question_id)
            .ok_or(ValidationError::UnknownQuestion { question_id })?;
        let len = self.entries.len();
        let to = position
            .checked_sub(1)
            .filter(|index| *index < len)
            .ok_or_else(|| ValidationError::invalid_position(position, len))?;

        let mut entries = self.entries.clone();
        let entry = entries.remove(from);
        entries.insert(to, entry);
        Ok(Self::new(self.target, entries))
    }

    /// A new list holding exactly the given questions in the given order.
    ///
    /// Existing assignment ids are carried over for questions already in the
    /// list; new questions get fresh entries.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::DuplicateQuestion`] if `order` repeats a question.
    pub fn with_order(&self, order: &[QuestionId]) -> Result<Self> {
        if let Some(question_id) = order.iter().duplicates().next() {
            return Err(ValidationError::duplicate_question(*question_id));
        }
        let entries = order
            .iter()
            .map(|question_id| {
                self.entries
                    .iter()
                    .find(|e| e.question_id == *question_id)
                    .copied()
                    .unwrap_or_else(|| DesiredAssignmentEntry::new(*question_id))
            })
            .collect();
        Ok(Self::new(self.target, entries))
    }
}
