//! The assignment API collaborator and its HTTP implementation.
//!
//! Write endpoints answer with an empty body: no id for created rows, no
//! echoed priority. Callers learn the resulting state only by listing again.

use std::sync::Arc;

use async_trait::async_trait;
use carequest_core::{Assignment, AssignmentId, Target};
use reqwest::{RequestBuilder, Response, StatusCode};
use tracing::{debug, info, warn};
use url::Url;

use crate::config::ApiConfig;
use crate::error::{Error, Result};
use crate::wire::{AssignmentPayload, AssignmentRecord, CategoryFanoutPayload};

/// Collection path for assignment rows.
pub const ASSIGNMENTS_PATH: &str = "question-assignments";

/// Path listing the assignments of a target.
pub fn list_path(target: Target) -> String {
    match target {
        Target::User(id) => format!("{ASSIGNMENTS_PATH}/by-user/{id}"),
        Target::Group(id) => format!("{ASSIGNMENTS_PATH}/by-group/{id}"),
    }
}

/// Path of a single assignment row.
pub fn row_path(id: AssignmentId) -> String {
    format!("{ASSIGNMENTS_PATH}/{id}")
}

/// Path of the category fan-out endpoint.
pub fn fanout_path() -> String {
    format!("{ASSIGNMENTS_PATH}/by-category")
}

/// Per-row operations exposed by the remote assignment store.
///
/// There is no call that replaces a target's whole ordered list.
#[async_trait]
pub trait AssignmentApi: Send + Sync {
    /// List every assignment of a target, in server order.
    async fn list(&self, target: Target) -> Result<Vec<Assignment>>;

    /// Create one row. The response carries no body.
    async fn create(&self, payload: &AssignmentPayload) -> Result<()>;

    /// Replace one row in place. The response carries no body.
    async fn update(&self, id: AssignmentId, payload: &AssignmentPayload) -> Result<()>;

    /// Delete one row.
    async fn delete(&self, id: AssignmentId) -> Result<()>;

    /// Ask the server to assign every active question of a category.
    async fn assign_category(&self, payload: &CategoryFanoutPayload) -> Result<()>;
}

/// REST client for the `/question-assignments` endpoints.
#[derive(Debug, Clone)]
pub struct HttpAssignmentApi {
    config: Arc<ApiConfig>,
    http_client: reqwest::Client,
}

impl HttpAssignmentApi {
    /// Create a client from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if no base URL is configured or the HTTP client
    /// cannot be built.
    pub fn with_config(config: ApiConfig) -> Result<Self> {
        // Fail at construction rather than on the first call.
        config.endpoint(ASSIGNMENTS_PATH)?;

        let http_client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| Error::transport(e.to_string()))?;

        Ok(Self {
            config: Arc::new(config),
            http_client,
        })
    }

    /// Create a client for a base URL with default settings.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn with_url(base_url: Url) -> Result<Self> {
        Self::with_config(ApiConfig::with_base_url(base_url))
    }

    /// The configuration in use.
    pub fn config(&self) -> &ApiConfig {
        &self.config
    }

    /// Send a request and classify the response status.
    async fn send(&self, request: RequestBuilder) -> Result<Response> {
        let request = match &self.config.auth_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        };

        let response = request
            .send()
            .await
            .map_err(|e| Error::transport(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                warn!(%status, error = %e, "Failed to read error response body");
                format!("<unreadable body: {e}>")
            }
        };
        if status == StatusCode::CONFLICT {
            Err(Error::conflict(status.as_u16(), body))
        } else {
            Err(Error::rejected(status.as_u16(), body))
        }
    }
}

#[async_trait]
impl AssignmentApi for HttpAssignmentApi {
    async fn list(&self, target: Target) -> Result<Vec<Assignment>> {
        let url = self.config.endpoint(&list_path(target))?;
        debug!(%target, %url, "Listing assignments");

        let response = self.send(self.http_client.get(url)).await?;
        let records: Vec<AssignmentRecord> = response.json().await?;

        let assignments = records
            .into_iter()
            .map(Assignment::try_from)
            .collect::<std::result::Result<Vec<_>, _>>()?;

        info!(%target, count = assignments.len(), "Fetched assignments");
        Ok(assignments)
    }

    async fn create(&self, payload: &AssignmentPayload) -> Result<()> {
        let url = self.config.endpoint(ASSIGNMENTS_PATH)?;
        debug!(question_id = %payload.question_id, priority = %payload.priority, "POST assignment");
        self.send(self.http_client.post(url).json(payload)).await?;
        Ok(())
    }

    async fn update(&self, id: AssignmentId, payload: &AssignmentPayload) -> Result<()> {
        let url = self.config.endpoint(&row_path(id))?;
        debug!(%id, priority = %payload.priority, "PUT assignment");
        self.send(self.http_client.put(url).json(payload)).await?;
        Ok(())
    }

    async fn delete(&self, id: AssignmentId) -> Result<()> {
        let url = self.config.endpoint(&row_path(id))?;
        debug!(%id, "DELETE assignment");
        self.send(self.http_client.delete(url)).await?;
        Ok(())
    }

    async fn assign_category(&self, payload: &CategoryFanoutPayload) -> Result<()> {
        let url = self.config.endpoint(&fanout_path())?;
        debug!(category_id = %payload.category_id, "POST category fan-out");
        self.send(self.http_client.post(url).json(payload)).await?;
        Ok(())
    }
}
