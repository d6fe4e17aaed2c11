//! Wire payloads for the `/question-assignments` endpoints.
//!
//! The server encodes the target as two nullable ids. Payloads are only ever
//! built from a [`Target`], so exactly one of them is set.

use carequest_core::{
    Assignment, AssignmentId, CategoryId, GroupId, Priority, QuestionId, Target, UserId,
    ValidationError,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Request body for create and update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentPayload {
    pub question_id: QuestionId,
    pub user_id: Option<UserId>,
    pub group_id: Option<GroupId>,
    pub priority: Priority,
}

impl AssignmentPayload {
    /// Build a payload for a target.
    pub const fn new(question_id: QuestionId, target: Target, priority: Priority) -> Self {
        Self {
            question_id,
            user_id: target.user_id(),
            group_id: target.group_id(),
            priority,
        }
    }

    /// The target encoded in this payload.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::AmbiguousTarget`] for hand-built payloads
    /// that set both or neither id.
    pub const fn target(&self) -> Result<Target, ValidationError> {
        Target::from_parts(self.user_id, self.group_id)
    }
}

/// Request body for the category fan-out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryFanoutPayload {
    pub category_id: CategoryId,
    pub user_id: Option<UserId>,
    pub group_id: Option<GroupId>,
    pub priority: Priority,
}

impl CategoryFanoutPayload {
    /// Build a fan-out payload for a target.
    pub const fn new(category_id: CategoryId, target: Target, priority: Priority) -> Self {
        Self {
            category_id,
            user_id: target.user_id(),
            group_id: target.group_id(),
            priority,
        }
    }
}

/// An assignment row as listed by the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentRecord {
    pub id: AssignmentId,
    pub question_id: QuestionId,
    #[serde(default)]
    pub user_id: Option<UserId>,
    #[serde(default)]
    pub group_id: Option<GroupId>,
    pub priority: Priority,
    pub assigned_at: DateTime<Utc>,
    #[serde(default)]
    pub assigned_by: Option<String>,
}

impl TryFrom<AssignmentRecord> for Assignment {
    type Error = ValidationError;

    fn try_from(record: AssignmentRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            id: record.id,
            question_id: record.question_id,
            target: Target::from_parts(record.user_id, record.group_id)?,
            priority: record.priority,
            assigned_at: record.assigned_at,
            assigned_by: record.assigned_by,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_payload_nulls_group() -> Result<(), Box<dyn std::error::Error>> {
        let payload = AssignmentPayload::new(
            QuestionId::new(5),
            Target::User(UserId::new(3)),
            Priority::new(2)?,
        );
        let json = serde_json::to_value(&payload)?;
        assert_eq!(
            json,
            serde_json::json!({"questionId": 5, "userId": 3, "groupId": null, "priority": 2})
        );
        Ok(())
    }

    #[test]
    fn test_group_fanout_payload_nulls_user() -> Result<(), Box<dyn std::error::Error>> {
        let payload = CategoryFanoutPayload::new(
            CategoryId::new(8),
            Target::Group(GroupId::new(4)),
            Priority::FIRST,
        );
        let json = serde_json::to_value(&payload)?;
        assert_eq!(
            json,
            serde_json::json!({"categoryId": 8, "userId": null, "groupId": 4, "priority": 1})
        );
        Ok(())
    }

    #[test]
    fn test_record_into_assignment() -> Result<(), Box<dyn std::error::Error>> {
        let record: AssignmentRecord = serde_json::from_value(serde_json::json!({
            "id": 11,
            "questionId": 5,
            "userId": null,
            "groupId": 2,
            "priority": 1,
            "assignedAt": "2024-03-01T10:00:00Z",
            "assignedBy": "coordinator"
        }))?;
        let assignment = Assignment::try_from(record)?;
        assert_eq!(assignment.target, Target::Group(GroupId::new(2)));
        assert_eq!(assignment.assigned_by.as_deref(), Some("coordinator"));
        Ok(())
    }

    #[test]
    fn test_record_with_both_targets_is_rejected() -> Result<(), Box<dyn std::error::Error>> {
        let record: AssignmentRecord = serde_json::from_value(serde_json::json!({
            "id": 11,
            "questionId": 5,
            "userId": 1,
            "groupId": 2,
            "priority": 1,
            "assignedAt": "2024-03-01T10:00:00Z"
        }))?;
        assert_eq!(
            Assignment::try_from(record),
            Err(ValidationError::AmbiguousTarget)
        );
        Ok(())
    }
}
