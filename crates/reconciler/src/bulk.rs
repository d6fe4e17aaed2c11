//! Assigning every question of a category in one server call.

use std::sync::Arc;

use carequest_api::{AssignmentApi, CategoryFanoutPayload};
use carequest_core::{CategoryId, Priority, Target};
use tracing::info;

use crate::error::Result;

/// Delegates a category fan-out to the server.
///
/// The server decides which questions are added and at which priorities.
/// Callers must resync to see the result.
pub struct BulkFanoutAssigner {
    api: Arc<dyn AssignmentApi>,
}

impl BulkFanoutAssigner {
    /// Create an assigner.
    pub fn new(api: Arc<dyn AssignmentApi>) -> Self {
        Self { api }
    }

    /// Assign every question in `category_id` to `target`, starting at
    /// `priority`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Api`] if the request fails.
    pub async fn assign_category(
        &self,
        category_id: CategoryId,
        target: Target,
        priority: Priority,
    ) -> Result<()> {
        info!(%category_id, %target, %priority, "Assigning category");
        self.api
            .assign_category(&CategoryFanoutPayload::new(category_id, target, priority))
            .await?;
        Ok(())
    }
}
