//! Reconciler facade and configuration.

use std::sync::Arc;

use carequest_api::AssignmentApi;
use carequest_core::{Assignment, CategoryId, DesiredAssignmentList, Priority, Target};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::bulk::BulkFanoutAssigner;
use crate::error::{Error, Result};
use crate::executor::FailurePolicy;
use crate::session::{CommitOutcome, ReconciliationSession};
use crate::store::fetch_canonical;

/// Configuration for the reconciler.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconcilerConfig {
    /// What to skip once an operation fails.
    pub failure_policy: FailurePolicy,
    /// Refuse to commit a desired list with no entries.
    pub require_non_empty: bool,
}

/// Entry point for reconciling assignments against one remote store.
pub struct Reconciler {
    /// Remote assignment store.
    api: Arc<dyn AssignmentApi>,
    /// Configuration.
    config: ReconcilerConfig,
}

impl Reconciler {
    /// Create a new reconciler.
    pub fn new(api: Arc<dyn AssignmentApi>, config: ReconcilerConfig) -> Self {
        Self { api, config }
    }

    /// Start an idle editing session.
    pub fn session(&self) -> ReconciliationSession {
        ReconciliationSession::new(self.api.clone(), &self.config)
    }

    /// Fan-out assigner sharing this reconciler's store.
    pub fn bulk(&self) -> BulkFanoutAssigner {
        BulkFanoutAssigner::new(self.api.clone())
    }

    /// Fetch `target`'s assignments in canonical order.
    ///
    /// # Errors
    ///
    /// Returns the read error.
    pub async fn known(&self, target: Target) -> Result<Vec<Assignment>> {
        fetch_canonical(self.api.as_ref(), target).await
    }

    /// Load the list's target, then plan, execute and reload in one go.
    ///
    /// # Errors
    ///
    /// Returns the load error or a validation error. Execution and reload
    /// failures are reported in the outcome.
    pub async fn reconcile(&self, desired: DesiredAssignmentList) -> Result<CommitOutcome> {
        let target = desired.target();
        info!(%target, entries = desired.len(), "Starting reconciliation");

        let mut session = self.session();
        session.load(target).await?;
        session.set_desired(desired)?;
        session.commit().await
    }

    /// Assign every question of a category, then return the reloaded rows.
    ///
    /// # Errors
    ///
    /// Returns the fan-out error, or [`Error::Resync`] if the reload fails.
    pub async fn assign_category(
        &self,
        category_id: CategoryId,
        target: Target,
        priority: Priority,
    ) -> Result<Vec<Assignment>> {
        self.bulk()
            .assign_category(category_id, target, priority)
            .await?;
        fetch_canonical(self.api.as_ref(), target)
            .await
            .map_err(|e| Error::resync(target, e.to_string()))
    }

    /// Get the configuration.
    pub const fn config(&self) -> &ReconcilerConfig {
        &self.config
    }
}

/// Builder for Reconciler.
pub struct ReconcilerBuilder {
    api: Option<Arc<dyn AssignmentApi>>,
    config: ReconcilerConfig,
}

impl ReconcilerBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self {
            api: None,
            config: ReconcilerConfig::default(),
        }
    }

    /// Set the assignment API.
    #[must_use]
    pub fn with_api(mut self, api: Arc<dyn AssignmentApi>) -> Self {
        self.api = Some(api);
        self
    }

    /// Set the configuration.
    #[must_use]
    pub fn with_config(mut self, config: ReconcilerConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the failure policy.
    #[must_use]
    pub const fn failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.config.failure_policy = policy;
        self
    }

    /// Refuse or allow empty desired lists.
    #[must_use]
    pub const fn require_non_empty(mut self, enabled: bool) -> Self {
        self.config.require_non_empty = enabled;
        self
    }

    /// Build the reconciler.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] if no API was set.
    pub fn build(self) -> Result<Reconciler> {
        let api = self
            .api
            .ok_or_else(|| Error::invalid_config("assignment API is required"))?;

        Ok(Reconciler::new(api, self.config))
    }
}

impl Default for ReconcilerBuilder {
    fn default() -> Self {
        Self::new()
    }
}
