//! Re-reading authoritative state after a plan has been applied.

use std::sync::Arc;

use carequest_api::AssignmentApi;
use carequest_core::{Assignment, Target};
use tracing::{info, warn};

use crate::error::{Error, Result};
use crate::store::{AssignmentStateStore, fetch_canonical};

/// Replaces the local snapshot with a fresh read of the remote store.
///
/// Runs after every execution attempt, complete or not, since only the
/// server knows which ids it issued and which writes took effect.
pub struct Resynchronizer {
    api: Arc<dyn AssignmentApi>,
}

impl Resynchronizer {
    /// Create a resynchronizer.
    pub fn new(api: Arc<dyn AssignmentApi>) -> Self {
        Self { api }
    }

    /// Fetch `target` again and swap it into `store`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Resync`] if the read fails. The store is left
    /// untouched in that case.
    pub async fn resync(
        &self,
        store: &mut AssignmentStateStore,
        target: Target,
    ) -> Result<Vec<Assignment>> {
        match fetch_canonical(self.api.as_ref(), target).await {
            Ok(rows) => {
                info!(%target, count = rows.len(), "Resynchronized assignments");
                store.replace(target, rows.clone());
                Ok(rows)
            }
            Err(e) => {
                warn!(%target, error = %e, "Resync failed");
                Err(Error::resync(target, e.to_string()))
            }
        }
    }
}
