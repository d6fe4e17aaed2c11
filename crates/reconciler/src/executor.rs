//! Applying a [`Plan`] against the remote store.

use std::sync::Arc;

use carequest_api::{AssignmentApi, AssignmentPayload};
use carequest_core::Target;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::types::{ExecutionReport, FailedOperation, Operation, OperationError, OperationKind, Plan};

/// What to do with the rest of a plan once an operation fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Skip the remaining operations of the failing class. Later classes
    /// still run.
    #[default]
    StopClass,
    /// Skip every remaining operation of the plan.
    StopAll,
}

/// Runs plan operations one at a time: deletes, then updates, then creates.
///
/// Deletes go first so a question being reassigned never collides with the
/// row it replaces. Nothing is rolled back.
pub struct OperationExecutor {
    api: Arc<dyn AssignmentApi>,
    policy: FailurePolicy,
}

impl OperationExecutor {
    /// Create an executor.
    pub fn new(api: Arc<dyn AssignmentApi>, policy: FailurePolicy) -> Self {
        Self { api, policy }
    }

    /// The failure policy in use.
    pub const fn policy(&self) -> FailurePolicy {
        self.policy
    }

    /// Apply every operation of `plan` and report what happened to each.
    pub async fn apply(&self, plan: &Plan) -> ExecutionReport {
        info!(
            target = %plan.target,
            operations = plan.len(),
            policy = ?self.policy,
            "Applying plan"
        );

        let mut report = ExecutionReport::new(plan.target);
        let mut halted = false;

        for kind in OperationKind::EXECUTION_ORDER {
            let mut skipping = halted;

            for operation in plan.operations_of(kind) {
                if skipping {
                    report.not_attempted.push(operation);
                    continue;
                }

                debug!(%operation, "Applying operation");

                match self.execute(plan.target, &operation).await {
                    Ok(()) => report.succeeded.push(operation),
                    Err(e) => {
                        warn!(%operation, error = %e, "Operation failed");
                        report.failed.push(FailedOperation {
                            error: OperationError::from_api(&operation, &e),
                            operation,
                        });
                        skipping = true;
                        halted = self.policy == FailurePolicy::StopAll;
                    }
                }
            }
        }

        if report.is_complete() {
            info!(target = %plan.target, "Plan applied");
        } else {
            warn!(
                target = %plan.target,
                succeeded = report.succeeded.len(),
                failed = report.failed.len(),
                not_attempted = report.not_attempted.len(),
                "Plan partially applied"
            );
        }

        report
    }

    async fn execute(&self, target: Target, operation: &Operation) -> carequest_api::Result<()> {
        match *operation {
            Operation::Delete { id } => self.api.delete(id).await,
            Operation::Update {
                id,
                question_id,
                priority,
            } => {
                self.api
                    .update(id, &AssignmentPayload::new(question_id, target, priority))
                    .await
            }
            Operation::Create {
                question_id,
                priority,
            } => {
                self.api
                    .create(&AssignmentPayload::new(question_id, target, priority))
                    .await
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use carequest_api::{ApiCall, ApiCallKind, FailureMode, InMemoryAssignmentApi};
    use carequest_core::{Assignment, AssignmentId, Priority, QuestionId, UserId, ValidationError};
    use chrono::{DateTime, Utc};

    use super::*;
    use crate::types::{PlannedCreate, PlannedUpdate};

    type TestResult = std::result::Result<(), Box<dyn std::error::Error>>;

    const USER: Target = Target::User(UserId::new(4));

    fn row(id: u64, question: u64, priority: u32) -> std::result::Result<Assignment, ValidationError> {
        Ok(Assignment {
            id: AssignmentId::new(id),
            question_id: QuestionId::new(question),
            target: USER,
            priority: Priority::new(priority)?,
            assigned_at: DateTime::<Utc>::UNIX_EPOCH,
            assigned_by: None,
        })
    }

    fn create(question: u64, priority: u32) -> std::result::Result<PlannedCreate, ValidationError> {
        Ok(PlannedCreate {
            question_id: QuestionId::new(question),
            priority: Priority::new(priority)?,
        })
    }

    #[tokio::test]
    async fn test_classes_run_in_order() -> TestResult {
        // GIVEN a plan with one operation of each class
        let api = Arc::new(InMemoryAssignmentApi::with_rows([row(1, 5, 1)?, row(2, 9, 2)?]));
        let plan = Plan {
            target: USER,
            to_create: vec![create(7, 2)?],
            to_update: vec![PlannedUpdate {
                id: AssignmentId::new(2),
                question_id: QuestionId::new(9),
                priority: Priority::FIRST,
            }],
            to_delete: vec![AssignmentId::new(1)],
        };
        let executor = OperationExecutor::new(api.clone(), FailurePolicy::default());

        // WHEN applying
        let report = executor.apply(&plan).await;

        // THEN deletes ran before updates before creates
        assert!(report.is_complete());
        let kinds: Vec<ApiCallKind> = api.calls().await.iter().map(ApiCall::kind).collect();
        assert_eq!(
            kinds,
            vec![ApiCallKind::Delete, ApiCallKind::Update, ApiCallKind::Create]
        );
        let questions: Vec<u64> = api.rows(USER).await.iter().map(|r| r.question_id.get()).collect();
        assert_eq!(questions, vec![9, 7]);
        Ok(())
    }

    #[tokio::test]
    async fn test_failed_create_skips_rest_of_class() -> TestResult {
        // GIVEN three creates where the second one fails
        let api = Arc::new(InMemoryAssignmentApi::new());
        api.fail_nth(ApiCallKind::Create, 2, FailureMode::Transport).await;
        let plan = Plan {
            target: USER,
            to_create: vec![create(5, 1)?, create(9, 2)?, create(7, 3)?],
            to_update: vec![],
            to_delete: vec![],
        };

        // WHEN applying
        let report = OperationExecutor::new(api.clone(), FailurePolicy::StopClass)
            .apply(&plan)
            .await;

        // THEN one succeeded, one failed, one was never sent
        assert_eq!(report.succeeded.len(), 1);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.not_attempted.len(), 1);
        assert_eq!(report.summary(), "1 of 3 changes saved");
        assert!(matches!(
            report.failed.first().map(|f| &f.error),
            Some(OperationError::Network { .. })
        ));
        assert_eq!(api.write_count().await, 2);
        assert_eq!(api.rows(USER).await.len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_stop_class_still_runs_later_classes() -> TestResult {
        let api = Arc::new(InMemoryAssignmentApi::with_rows([row(1, 5, 1)?]));
        api.fail_nth(ApiCallKind::Delete, 1, FailureMode::Status(500)).await;
        let plan = Plan {
            target: USER,
            to_create: vec![create(9, 1)?],
            to_update: vec![],
            to_delete: vec![AssignmentId::new(1)],
        };

        let report = OperationExecutor::new(api.clone(), FailurePolicy::StopClass)
            .apply(&plan)
            .await;

        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.succeeded.len(), 1);
        assert!(report.not_attempted.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_stop_all_skips_later_classes() -> TestResult {
        let api = Arc::new(InMemoryAssignmentApi::with_rows([row(1, 5, 1)?]));
        api.fail_nth(ApiCallKind::Delete, 1, FailureMode::Status(500)).await;
        let plan = Plan {
            target: USER,
            to_create: vec![create(9, 1)?],
            to_update: vec![],
            to_delete: vec![AssignmentId::new(1)],
        };

        let report = OperationExecutor::new(api.clone(), FailurePolicy::StopAll)
            .apply(&plan)
            .await;

        assert!(report.succeeded.is_empty());
        assert_eq!(report.not_attempted.len(), 1);
        assert_eq!(api.write_count().await, 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_conflict_names_question() -> TestResult {
        // GIVEN another session already assigned q5
        let api = Arc::new(InMemoryAssignmentApi::new());
        api.insert_out_of_band(QuestionId::new(5), USER, Priority::FIRST).await;
        let plan = Plan {
            target: USER,
            to_create: vec![create(5, 1)?],
            to_update: vec![],
            to_delete: vec![],
        };

        let report = OperationExecutor::new(api, FailurePolicy::default())
            .apply(&plan)
            .await;

        assert!(matches!(
            report.failed.first().map(|f| &f.error),
            Some(OperationError::Conflict { question_id: Some(q), .. }) if *q == QuestionId::new(5)
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_empty_plan_sends_nothing() {
        let api = Arc::new(InMemoryAssignmentApi::new());
        let report = OperationExecutor::new(api.clone(), FailurePolicy::default())
            .apply(&Plan::empty(USER))
            .await;
        assert!(report.is_complete());
        assert_eq!(report.total(), 0);
        assert!(api.calls().await.is_empty());
    }
}
