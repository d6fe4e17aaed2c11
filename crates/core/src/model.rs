//! Assignment data model.

use std::cmp::Ordering;
use std::fmt;
use std::num::NonZeroU32;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Result, ValidationError};
use crate::ids::{AssignmentId, CategoryId, GroupId, QuestionId, UserId};

/// The entity a question is assigned to.
///
/// The remote payload encodes this as two nullable fields; here both-set and
/// both-empty are unrepresentable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "lowercase")]
pub enum Target {
    /// An individual user.
    User(UserId),
    /// A group of users.
    Group(GroupId),
}

impl Target {
    /// Build a target from the two nullable wire fields.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::AmbiguousTarget`] unless exactly one field is set.
    pub const fn from_parts(user_id: Option<UserId>, group_id: Option<GroupId>) -> Result<Self> {
        match (user_id, group_id) {
            (Some(user), None) => Ok(Self::User(user)),
            (None, Some(group)) => Ok(Self::Group(group)),
            _ => Err(ValidationError::AmbiguousTarget),
        }
    }

    /// The user id, if this is a user target.
    pub const fn user_id(&self) -> Option<UserId> {
        match self {
            Self::User(id) => Some(*id),
            Self::Group(_) => None,
        }
    }

    /// The group id, if this is a group target.
    pub const fn group_id(&self) -> Option<GroupId> {
        match self {
            Self::User(_) => None,
            Self::Group(id) => Some(*id),
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::User(id) => write!(f, "user {id}"),
            Self::Group(id) => write!(f, "group {id}"),
        }
    }
}

/// 1-based display/response order among a target's assignments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Priority(NonZeroU32);

impl Priority {
    /// The first position.
    pub const FIRST: Self = Self(NonZeroU32::MIN);

    /// Create a priority from a raw value.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidPriority`] for zero.
    pub fn new(value: u32) -> Result<Self> {
        NonZeroU32::new(value)
            .map(Self)
            .ok_or(ValidationError::InvalidPriority { value: 0 })
    }

    /// Priority for the entry at a 0-based list index.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidPriority`] if the position does not fit.
    pub fn from_index(index: usize) -> Result<Self> {
        let invalid = || ValidationError::InvalidPriority {
            value: i64::try_from(index).unwrap_or(i64::MAX),
        };
        let position = index.checked_add(1).ok_or_else(invalid)?;
        let raw = u32::try_from(position).map_err(|_| invalid())?;
        Self::new(raw)
    }

    /// Get the raw value.
    pub const fn get(self) -> u32 {
        self.0.get()
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A question, owned by the external question registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub id: QuestionId,
    pub title: String,
    pub category_id: CategoryId,
}

/// A question category. Only used by the category fan-out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
}

/// A persisted (question, target, priority) association.
///
/// Rows that do not exist remotely yet are never represented by this type;
/// they live only as desired-list entries without an existing id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Assignment {
    pub id: AssignmentId,
    pub question_id: QuestionId,
    pub target: Target,
    pub priority: Priority,
    pub assigned_at: DateTime<Utc>,
    #[serde(default)]
    pub assigned_by: Option<String>,
}

impl Assignment {
    /// Canonical ordering: priority ascending, then id ascending.
    pub fn canonical_cmp(&self, other: &Self) -> Ordering {
        self.priority
            .cmp(&other.priority)
            .then_with(|| self.id.cmp(&other.id))
    }
}

/// Sort rows into canonical order in place.
pub fn sort_canonical(rows: &mut [Assignment]) {
    rows.sort_by(Assignment::canonical_cmp);
}
