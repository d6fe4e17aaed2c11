//! In-memory remote assignment store.
//!
//! Behaves like the real server where the engine can observe it: ids are
//! issued by the store, writes return nothing, a question can be assigned to
//! a target only once, and listing is the only way to see the outcome.
//! Failures can be injected per call kind for testing partial execution.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use carequest_core::{
    Assignment, AssignmentId, Priority, Question, QuestionId, Target, sort_canonical,
};
use chrono::Utc;
use tokio::sync::Mutex;
use tracing::debug;

use crate::client::AssignmentApi;
use crate::error::{Error, Result};
use crate::wire::{AssignmentPayload, CategoryFanoutPayload};

/// Kind of call made against the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ApiCallKind {
    List,
    Create,
    Update,
    Delete,
    AssignCategory,
}

/// A recorded call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiCall {
    List(Target),
    Create(AssignmentPayload),
    Update(AssignmentId, AssignmentPayload),
    Delete(AssignmentId),
    AssignCategory(CategoryFanoutPayload),
}

impl ApiCall {
    /// The kind of this call.
    pub const fn kind(&self) -> ApiCallKind {
        match self {
            Self::List(_) => ApiCallKind::List,
            Self::Create(_) => ApiCallKind::Create,
            Self::Update(..) => ApiCallKind::Update,
            Self::Delete(_) => ApiCallKind::Delete,
            Self::AssignCategory(_) => ApiCallKind::AssignCategory,
        }
    }

    /// Whether this call writes to the store.
    pub const fn is_write(&self) -> bool {
        !matches!(self, Self::List(_))
    }
}

/// How an injected failure presents itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureMode {
    /// The request never reaches the server.
    Transport,
    /// The server answers 409.
    Conflict,
    /// The server answers with the given status.
    Status(u16),
}

impl FailureMode {
    fn into_error(self, call: &ApiCall) -> Error {
        match self {
            Self::Transport => Error::transport(format!("injected transport failure on {call:?}")),
            Self::Conflict => Error::conflict(409, format!("injected conflict on {call:?}")),
            Self::Status(status) => Error::rejected(status, format!("injected failure on {call:?}")),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct InjectedFailure {
    kind: ApiCallKind,
    nth: usize,
    mode: FailureMode,
}

#[derive(Debug)]
struct RemoteState {
    rows: BTreeMap<AssignmentId, Assignment>,
    next_id: u64,
    questions: Vec<Question>,
    failures: Vec<InjectedFailure>,
    counters: HashMap<ApiCallKind, usize>,
    calls: Vec<ApiCall>,
    actor: String,
}

impl Default for RemoteState {
    fn default() -> Self {
        Self {
            rows: BTreeMap::new(),
            next_id: 1,
            questions: Vec::new(),
            failures: Vec::new(),
            counters: HashMap::new(),
            calls: Vec::new(),
            actor: "system".to_string(),
        }
    }
}

impl RemoteState {
    /// Record a call and return the injected failure for it, if any.
    fn record(&mut self, call: ApiCall) -> Result<()> {
        let kind = call.kind();
        let count = self.counters.entry(kind).or_insert(0);
        *count = count.saturating_add(1);
        let nth = *count;

        let failure = self
            .failures
            .iter()
            .find(|f| f.kind == kind && f.nth == nth)
            .map(|f| f.mode);
        let result = failure.map_or(Ok(()), |mode| Err(mode.into_error(&call)));
        self.calls.push(call);
        result
    }

    fn issue_id(&mut self) -> AssignmentId {
        let id = AssignmentId::new(self.next_id);
        self.next_id = self.next_id.saturating_add(1);
        id
    }

    fn find(&self, target: Target, question_id: QuestionId) -> Option<&Assignment> {
        self.rows
            .values()
            .find(|row| row.target == target && row.question_id == question_id)
    }

    fn insert(&mut self, question_id: QuestionId, target: Target, priority: Priority) -> AssignmentId {
        let id = self.issue_id();
        let row = Assignment {
            id,
            question_id,
            target,
            priority,
            assigned_at: Utc::now(),
            assigned_by: Some(self.actor.clone()),
        };
        self.rows.insert(id, row);
        id
    }
}

/// In-memory stand-in for the remote assignment store.
#[derive(Debug, Default)]
pub struct InMemoryAssignmentApi {
    state: Mutex<RemoteState>,
}

impl InMemoryAssignmentApi {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store holding existing rows. Ids are kept as given; new ids
    /// continue after the largest one.
    pub fn with_rows(rows: impl IntoIterator<Item = Assignment>) -> Self {
        let mut state = RemoteState::default();
        for row in rows {
            state.next_id = state.next_id.max(row.id.get().saturating_add(1));
            state.rows.insert(row.id, row);
        }
        Self {
            state: Mutex::new(state),
        }
    }

    /// Register the question catalogue used by the category fan-out.
    #[must_use]
    pub fn with_questions(self, questions: impl IntoIterator<Item = Question>) -> Self {
        let mut state = self.state.into_inner();
        state.questions.extend(questions);
        Self {
            state: Mutex::new(state),
        }
    }

    /// Make the `nth` (1-based) call of `kind` fail.
    pub async fn fail_nth(&self, kind: ApiCallKind, nth: usize, mode: FailureMode) {
        self.state
            .lock()
            .await
            .failures
            .push(InjectedFailure { kind, nth, mode });
    }

    /// Insert a row directly, as another session would.
    pub async fn insert_out_of_band(
        &self,
        question_id: QuestionId,
        target: Target,
        priority: Priority,
    ) -> AssignmentId {
        self.state.lock().await.insert(question_id, target, priority)
    }

    /// Remove a row directly, as another session would.
    pub async fn remove_out_of_band(&self, id: AssignmentId) -> Option<Assignment> {
        self.state.lock().await.rows.remove(&id)
    }

    /// Current rows of a target in canonical order, without recording a call.
    pub async fn rows(&self, target: Target) -> Vec<Assignment> {
        let state = self.state.lock().await;
        let mut rows: Vec<Assignment> = state
            .rows
            .values()
            .filter(|row| row.target == target)
            .cloned()
            .collect();
        sort_canonical(&mut rows);
        rows
    }

    /// Every call received so far, in order.
    pub async fn calls(&self) -> Vec<ApiCall> {
        self.state.lock().await.calls.clone()
    }

    /// Number of write calls received so far.
    pub async fn write_count(&self) -> usize {
        self.state
            .lock()
            .await
            .calls
            .iter()
            .filter(|call| call.is_write())
            .count()
    }
}

#[async_trait]
impl AssignmentApi for InMemoryAssignmentApi {
    async fn list(&self, target: Target) -> Result<Vec<Assignment>> {
        let mut state = self.state.lock().await;
        state.record(ApiCall::List(target))?;
        Ok(state
            .rows
            .values()
            .filter(|row| row.target == target)
            .cloned()
            .collect())
    }

    async fn create(&self, payload: &AssignmentPayload) -> Result<()> {
        let mut state = self.state.lock().await;
        state.record(ApiCall::Create(payload.clone()))?;

        let target = payload
            .target()
            .map_err(|e| Error::rejected(400, e.to_string()))?;
        if let Some(existing) = state.find(target, payload.question_id) {
            return Err(Error::conflict(
                409,
                format!(
                    "question {} already assigned to {target} as {}",
                    payload.question_id, existing.id
                ),
            ));
        }

        let id = state.insert(payload.question_id, target, payload.priority);
        debug!(%id, %target, question_id = %payload.question_id, "Created row");
        Ok(())
    }

    async fn update(&self, id: AssignmentId, payload: &AssignmentPayload) -> Result<()> {
        let mut state = self.state.lock().await;
        state.record(ApiCall::Update(id, payload.clone()))?;

        let target = payload
            .target()
            .map_err(|e| Error::rejected(400, e.to_string()))?;
        if let Some(other) = state
            .find(target, payload.question_id)
            .filter(|row| row.id != id)
        {
            return Err(Error::conflict(
                409,
                format!(
                    "question {} already assigned to {target} as {}",
                    payload.question_id, other.id
                ),
            ));
        }

        let row = state
            .rows
            .get_mut(&id)
            .ok_or_else(|| Error::rejected(404, format!("assignment {id} not found")))?;
        row.question_id = payload.question_id;
        row.target = target;
        row.priority = payload.priority;
        Ok(())
    }

    async fn delete(&self, id: AssignmentId) -> Result<()> {
        let mut state = self.state.lock().await;
        state.record(ApiCall::Delete(id))?;

        state
            .rows
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| Error::rejected(404, format!("assignment {id} not found")))
    }

    async fn assign_category(&self, payload: &CategoryFanoutPayload) -> Result<()> {
        let mut state = self.state.lock().await;
        state.record(ApiCall::AssignCategory(payload.clone()))?;

        let target = Target::from_parts(payload.user_id, payload.group_id)
            .map_err(|e| Error::rejected(400, e.to_string()))?;
        let mut questions: Vec<QuestionId> = state
            .questions
            .iter()
            .filter(|q| q.category_id == payload.category_id)
            .map(|q| q.id)
            .filter(|id| state.find(target, *id).is_none())
            .collect();
        questions.sort();

        // Consecutive priorities starting at the requested one.
        let mut next = payload.priority.get();
        for question_id in questions {
            let priority = Priority::new(next).map_err(|e| Error::rejected(400, e.to_string()))?;
            state.insert(question_id, target, priority);
            next = next.saturating_add(1);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use carequest_core::{CategoryId, GroupId, UserId};

    use super::*;

    type TestResult = std::result::Result<(), Box<dyn std::error::Error>>;

    const ALICE: Target = Target::User(UserId::new(1));
    const NURSES: Target = Target::Group(GroupId::new(2));

    fn payload(
        question: u64,
        target: Target,
        priority: u32,
    ) -> std::result::Result<AssignmentPayload, Box<dyn std::error::Error>> {
        Ok(AssignmentPayload::new(
            QuestionId::new(question),
            target,
            Priority::new(priority)?,
        ))
    }

    #[tokio::test]
    async fn test_create_issues_ids_and_returns_nothing() -> TestResult {
        let api = InMemoryAssignmentApi::new();
        api.create(&payload(5, ALICE, 1)?).await?;
        api.create(&payload(9, ALICE, 2)?).await?;

        let rows = api.list(ALICE).await?;
        let ids: Vec<u64> = rows.iter().map(|r| r.id.get()).collect();
        assert_eq!(ids, vec![1, 2]);
        Ok(())
    }

    #[tokio::test]
    async fn test_create_duplicate_question_conflicts() -> TestResult {
        let api = InMemoryAssignmentApi::new();
        api.create(&payload(5, ALICE, 1)?).await?;

        let result = api.create(&payload(5, ALICE, 2)?).await;
        assert!(result.as_ref().is_err_and(Error::is_conflict));

        // Same question for a different target is fine.
        api.create(&payload(5, NURSES, 1)?).await?;
        Ok(())
    }

    #[tokio::test]
    async fn test_update_keeps_id() -> TestResult {
        let api = InMemoryAssignmentApi::new();
        api.create(&payload(5, ALICE, 1)?).await?;
        api.update(AssignmentId::new(1), &payload(5, ALICE, 3)?).await?;

        let rows = api.rows(ALICE).await;
        assert_eq!(rows.len(), 1);
        assert_eq!(rows.first().map(|r| (r.id.get(), r.priority.get())), Some((1, 3)));
        Ok(())
    }

    #[tokio::test]
    async fn test_update_and_delete_missing_rows() -> TestResult {
        let api = InMemoryAssignmentApi::new();
        let update = api.update(AssignmentId::new(4), &payload(5, ALICE, 1)?).await;
        assert!(matches!(update, Err(Error::Rejected { status: 404, .. })));

        let delete = api.delete(AssignmentId::new(4)).await;
        assert!(matches!(delete, Err(Error::Rejected { status: 404, .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_injected_failure_hits_only_nth_call() -> TestResult {
        let api = InMemoryAssignmentApi::new();
        api.fail_nth(ApiCallKind::Create, 2, FailureMode::Transport).await;

        api.create(&payload(1, ALICE, 1)?).await?;
        let second = api.create(&payload(2, ALICE, 2)?).await;
        assert!(second.as_ref().is_err_and(Error::is_transport));
        api.create(&payload(3, ALICE, 3)?).await?;

        let questions: Vec<u64> = api.rows(ALICE).await.iter().map(|r| r.question_id.get()).collect();
        assert_eq!(questions, vec![1, 3]);
        assert_eq!(api.write_count().await, 3);
        Ok(())
    }

    #[tokio::test]
    async fn test_with_rows_continues_id_sequence() -> TestResult {
        let seed = Assignment {
            id: AssignmentId::new(40),
            question_id: QuestionId::new(5),
            target: ALICE,
            priority: Priority::FIRST,
            assigned_at: Utc::now(),
            assigned_by: None,
        };
        let api = InMemoryAssignmentApi::with_rows([seed]);
        api.create(&payload(6, ALICE, 2)?).await?;

        let ids: Vec<u64> = api.rows(ALICE).await.iter().map(|r| r.id.get()).collect();
        assert_eq!(ids, vec![40, 41]);
        Ok(())
    }

    #[tokio::test]
    async fn test_assign_category_expands_unassigned_questions() -> TestResult {
        let question = |id: u64, category: u64| Question {
            id: QuestionId::new(id),
            title: format!("Question {id}"),
            category_id: CategoryId::new(category),
        };
        let api = InMemoryAssignmentApi::new()
            .with_questions([question(10, 1), question(11, 1), question(12, 2), question(13, 1)]);
        api.create(&payload(11, NURSES, 1)?).await?;

        let fanout = CategoryFanoutPayload::new(CategoryId::new(1), NURSES, Priority::new(2)?);
        api.assign_category(&fanout).await?;

        let rows: Vec<(u64, u32)> = api
            .rows(NURSES)
            .await
            .iter()
            .map(|r| (r.question_id.get(), r.priority.get()))
            .collect();
        assert_eq!(rows, vec![(11, 1), (10, 2), (13, 3)]);
        Ok(())
    }
}
