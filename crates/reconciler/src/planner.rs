//! Turning a desired list and known rows into a [`Plan`].
//!
//! The diff is pure: same inputs, same plan, no I/O.

use std::collections::{HashMap, HashSet};

use carequest_core::{
    Assignment, AssignmentId, DesiredAssignmentList, ValidationError, sort_canonical,
};
use tracing::debug;

use crate::reconciler::ReconcilerConfig;
use crate::types::{Plan, PlannedCreate, PlannedUpdate};

/// Compute the operations that turn `known` into `desired`.
///
/// Each desired entry is matched to a known row by its existing assignment
/// id. Entries without one (or with an id that is gone or now names another
/// question) adopt the first unclaimed known row for the same question, so
/// a plan computed against freshly reloaded state is empty once the
/// previous plan has been fully applied. Unmatched entries become creates;
/// matched rows whose priority differs from the entry's 1-based position
/// become updates; unclaimed known rows become deletes.
///
/// # Errors
///
/// Returns [`ValidationError::DuplicateQuestion`] if a question appears
/// twice in `desired`, and [`ValidationError::TargetMismatch`] if a known row
/// belongs to another target.
pub fn diff(
    desired: &DesiredAssignmentList,
    known: &[Assignment],
) -> Result<Plan, ValidationError> {
    desired.validate(false)?;
    let target = desired.target();

    if let Some(row) = known.iter().find(|row| row.target != target) {
        return Err(ValidationError::target_mismatch(target, row.target));
    }

    let mut rows = known.to_vec();
    sort_canonical(&mut rows);
    let by_id: HashMap<AssignmentId, &Assignment> =
        rows.iter().map(|row| (row.id, row)).collect();

    let mut claimed: HashSet<AssignmentId> = HashSet::new();
    let mut plan = Plan::empty(target);

    for (priority, entry) in desired.prioritized()? {
        let by_existing_id = entry
            .existing_assignment_id
            .and_then(|id| by_id.get(&id).copied())
            .filter(|row| row.question_id == entry.question_id && !claimed.contains(&row.id));

        let matched = by_existing_id.or_else(|| {
            rows.iter()
                .find(|row| row.question_id == entry.question_id && !claimed.contains(&row.id))
        });

        match matched {
            Some(row) => {
                claimed.insert(row.id);
                if row.priority != priority {
                    plan.to_update.push(PlannedUpdate {
                        id: row.id,
                        question_id: row.question_id,
                        priority,
                    });
                }
            }
            None => {
                if let Some(stale) = entry.existing_assignment_id {
                    debug!(
                        assignment_id = %stale,
                        question_id = %entry.question_id,
                        "Existing assignment not in known state, planning create"
                    );
                }
                plan.to_create.push(PlannedCreate {
                    question_id: entry.question_id,
                    priority,
                });
            }
        }
    }

    plan.to_delete = rows
        .iter()
        .filter(|row| !claimed.contains(&row.id))
        .map(|row| row.id)
        .collect();

    Ok(plan)
}

/// Validates a desired list under the configured rules, then diffs it.
#[derive(Debug, Clone, Default)]
pub struct ReconciliationPlanner {
    require_non_empty: bool,
}

impl ReconciliationPlanner {
    /// Create a planner from reconciler configuration.
    pub const fn new(config: &ReconcilerConfig) -> Self {
        Self {
            require_non_empty: config.require_non_empty,
        }
    }

    /// Validate `desired` and compute the plan against `known`.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::EmptyDesiredList`] when empty lists are
    /// refused, and any error [`diff`] returns.
    pub fn plan(
        &self,
        desired: &DesiredAssignmentList,
        known: &[Assignment],
    ) -> Result<Plan, ValidationError> {
        desired.validate(self.require_non_empty)?;
        let plan = diff(desired, known)?;
        debug!(
            target = %plan.target,
            creates = plan.to_create.len(),
            updates = plan.to_update.len(),
            deletes = plan.to_delete.len(),
            "Computed plan"
        );
        Ok(plan)
    }
}

#[cfg(test)]
mod tests {
    use carequest_core::{DesiredAssignmentEntry, GroupId, Priority, QuestionId, Target, UserId};
    use chrono::{DateTime, Utc};

    use super::*;

    type TestResult = std::result::Result<(), Box<dyn std::error::Error>>;

    const USER: Target = Target::User(UserId::new(4));

    fn row(
        id: u64,
        question: u64,
        priority: u32,
    ) -> std::result::Result<Assignment, ValidationError> {
        Ok(Assignment {
            id: AssignmentId::new(id),
            question_id: QuestionId::new(question),
            target: USER,
            priority: Priority::new(priority)?,
            assigned_at: DateTime::<Utc>::UNIX_EPOCH,
            assigned_by: None,
        })
    }

    fn questions(ids: &[u64]) -> Vec<QuestionId> {
        ids.iter().copied().map(QuestionId::new).collect()
    }

    #[test]
    fn test_identity_plan_is_empty() -> TestResult {
        let known = vec![row(1, 5, 1)?, row(2, 9, 2)?];
        let desired = DesiredAssignmentList::from_known(USER, &known);
        assert!(diff(&desired, &known)?.is_empty());
        Ok(())
    }

    #[test]
    fn test_fresh_target_creates_in_order() -> TestResult {
        let desired = DesiredAssignmentList::from_question_ids(USER, questions(&[5, 9, 7]), &[]);
        let plan = diff(&desired, &[])?;
        let created: Vec<(u64, u32)> = plan
            .to_create
            .iter()
            .map(|c| (c.question_id.get(), c.priority.get()))
            .collect();
        assert_eq!(created, vec![(5, 1), (9, 2), (7, 3)]);
        assert!(plan.to_update.is_empty());
        assert!(plan.to_delete.is_empty());
        Ok(())
    }

    #[test]
    fn test_reorder_updates_both_rows() -> TestResult {
        // GIVEN known [A(q5,p1), B(q9,p2)]
        let known = vec![row(1, 5, 1)?, row(2, 9, 2)?];
        // WHEN the operator swaps them
        let desired = DesiredAssignmentList::new(
            USER,
            vec![
                DesiredAssignmentEntry::existing(QuestionId::new(9), AssignmentId::new(2)),
                DesiredAssignmentEntry::existing(QuestionId::new(5), AssignmentId::new(1)),
            ],
        );
        let plan = diff(&desired, &known)?;
        // THEN both rows move and nothing is created or deleted
        assert!(plan.to_create.is_empty());
        assert!(plan.to_delete.is_empty());
        assert_eq!(
            plan.to_update,
            vec![
                PlannedUpdate {
                    id: AssignmentId::new(2),
                    question_id: QuestionId::new(9),
                    priority: Priority::FIRST,
                },
                PlannedUpdate {
                    id: AssignmentId::new(1),
                    question_id: QuestionId::new(5),
                    priority: Priority::new(2)?,
                },
            ]
        );
        Ok(())
    }

    #[test]
    fn test_append_creates_one_row() -> TestResult {
        let known = vec![row(1, 5, 1)?];
        let desired = DesiredAssignmentList::from_question_ids(USER, questions(&[5, 9]), &known);
        let plan = diff(&desired, &known)?;
        assert_eq!(
            plan.to_create,
            vec![PlannedCreate {
                question_id: QuestionId::new(9),
                priority: Priority::new(2)?,
            }]
        );
        assert!(plan.to_update.is_empty());
        assert!(plan.to_delete.is_empty());
        Ok(())
    }

    #[test]
    fn test_removal_deletes_and_shifts() -> TestResult {
        // GIVEN known [A(q5,p1), B(q9,p2), C(q7,p3)]
        let known = vec![row(1, 5, 1)?, row(2, 9, 2)?, row(3, 7, 3)?];
        // WHEN the operator removes q9
        let desired = DesiredAssignmentList::from_known(USER, &known).without(QuestionId::new(9))?;
        let plan = diff(&desired, &known)?;
        // THEN B is deleted and C moves up
        assert_eq!(plan.to_delete, vec![AssignmentId::new(2)]);
        assert_eq!(
            plan.to_update,
            vec![PlannedUpdate {
                id: AssignmentId::new(3),
                question_id: QuestionId::new(7),
                priority: Priority::new(2)?,
            }]
        );
        assert!(plan.to_create.is_empty());
        Ok(())
    }

    #[test]
    fn test_dropping_last_row_only_deletes_it() -> TestResult {
        // GIVEN known [A(q5,p1), B(q9,p2)]
        let known = vec![row(1, 5, 1)?, row(2, 9, 2)?];
        // WHEN the desired list keeps only q5
        let desired = DesiredAssignmentList::from_known(USER, &known).without(QuestionId::new(9))?;
        let plan = diff(&desired, &known)?;
        // THEN B is deleted and nothing else is sent
        assert_eq!(plan.to_delete, vec![AssignmentId::new(2)]);
        assert!(plan.to_update.is_empty());
        assert!(plan.to_create.is_empty());
        assert_eq!(plan.len(), 1);
        Ok(())
    }

    #[test]
    fn test_empty_desired_deletes_everything() -> TestResult {
        let known = vec![row(1, 5, 1)?, row(2, 9, 2)?];
        let plan = diff(&DesiredAssignmentList::empty(USER), &known)?;
        assert_eq!(plan.to_delete, vec![AssignmentId::new(1), AssignmentId::new(2)]);
        assert_eq!(plan.len(), 2);
        Ok(())
    }

    #[test]
    fn test_duplicate_question_is_rejected() -> TestResult {
        let known = vec![row(1, 5, 1)?];
        let desired = DesiredAssignmentList::from_question_ids(USER, questions(&[5, 5]), &known);
        assert_eq!(
            diff(&desired, &known),
            Err(ValidationError::duplicate_question(QuestionId::new(5)))
        );
        Ok(())
    }

    #[test]
    fn test_stale_existing_id_becomes_create() -> TestResult {
        // Row 8 was removed out of band since the list was built.
        let known = vec![row(1, 5, 1)?];
        let desired = DesiredAssignmentList::new(
            USER,
            vec![
                DesiredAssignmentEntry::existing(QuestionId::new(5), AssignmentId::new(1)),
                DesiredAssignmentEntry::existing(QuestionId::new(6), AssignmentId::new(8)),
            ],
        );
        let plan = diff(&desired, &known)?;
        assert_eq!(
            plan.to_create,
            vec![PlannedCreate {
                question_id: QuestionId::new(6),
                priority: Priority::new(2)?,
            }]
        );
        Ok(())
    }

    #[test]
    fn test_existing_id_for_other_question_is_not_reused() -> TestResult {
        let known = vec![row(1, 5, 1)?];
        let desired = DesiredAssignmentList::new(
            USER,
            vec![DesiredAssignmentEntry::existing(QuestionId::new(6), AssignmentId::new(1))],
        );
        let plan = diff(&desired, &known)?;
        assert_eq!(plan.to_delete, vec![AssignmentId::new(1)]);
        assert_eq!(plan.to_create.len(), 1);
        assert!(plan.to_update.is_empty());
        Ok(())
    }

    #[test]
    fn test_entry_without_id_adopts_known_row() -> TestResult {
        let known = vec![row(1, 5, 1)?, row(2, 9, 2)?];
        let desired = DesiredAssignmentList::new(
            USER,
            vec![
                DesiredAssignmentEntry::new(QuestionId::new(9)),
                DesiredAssignmentEntry::new(QuestionId::new(5)),
            ],
        );
        let plan = diff(&desired, &known)?;
        assert!(plan.to_create.is_empty());
        assert!(plan.to_delete.is_empty());
        assert_eq!(plan.to_update.len(), 2);
        Ok(())
    }

    #[test]
    fn test_duplicate_known_rows_keep_first() -> TestResult {
        // Another session left two rows for q5.
        let known = vec![row(1, 5, 1)?, row(4, 5, 2)?];
        let desired = DesiredAssignmentList::from_question_ids(USER, questions(&[5]), &known);
        let plan = diff(&desired, &known)?;
        assert_eq!(plan.to_delete, vec![AssignmentId::new(4)]);
        assert!(plan.to_update.is_empty());
        Ok(())
    }

    #[test]
    fn test_known_row_of_other_target_is_rejected() -> TestResult {
        let mut foreign = row(1, 5, 1)?;
        foreign.target = Target::Group(GroupId::new(2));
        let result = diff(&DesiredAssignmentList::empty(USER), &[foreign]);
        assert_eq!(
            result,
            Err(ValidationError::target_mismatch(
                USER,
                Target::Group(GroupId::new(2))
            ))
        );
        Ok(())
    }

    #[test]
    fn test_priorities_are_dense_from_one() -> TestResult {
        let known = vec![row(1, 5, 3)?, row(2, 9, 7)?];
        let desired = DesiredAssignmentList::from_known(USER, &known);
        let plan = diff(&desired, &known)?;
        let priorities: Vec<u32> = plan.to_update.iter().map(|u| u.priority.get()).collect();
        assert_eq!(priorities, vec![1, 2]);
        Ok(())
    }

    #[test]
    fn test_planner_refuses_empty_when_configured() -> TestResult {
        let planner = ReconciliationPlanner::new(&ReconcilerConfig {
            require_non_empty: true,
            ..ReconcilerConfig::default()
        });
        let known = vec![row(1, 5, 1)?];
        assert_eq!(
            planner.plan(&DesiredAssignmentList::empty(USER), &known),
            Err(ValidationError::EmptyDesiredList)
        );
        Ok(())
    }

    #[test]
    fn test_planner_allows_empty_by_default() -> TestResult {
        let planner = ReconciliationPlanner::default();
        let known = vec![row(1, 5, 1)?];
        let plan = planner.plan(&DesiredAssignmentList::empty(USER), &known)?;
        assert_eq!(plan.to_delete, vec![AssignmentId::new(1)]);
        Ok(())
    }
}
