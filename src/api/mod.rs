#![forbid(unsafe_code)]

use std::time::Duration;

use async_trait::async_trait;

use crate::error::TaskdeckError;
use crate::task::model::{ApiErrorBody, Task, TaskRequest};

pub const FETCH_FALLBACK: &str = "Failed to fetch tasks";
pub const CREATE_FALLBACK: &str = "Failed to create task";
pub const COMPLETE_FALLBACK: &str = "Failed to complete task";

/// The three remote operations the store sequences. Implementations perform
/// exactly one round trip per call; no retries, caching, or deduplication.
#[async_trait]
pub trait TaskTransport: Send + Sync {
    /// Reads the incomplete-task collection, returned as the server orders it.
    async fn fetch_recent(&self) -> Result<Vec<Task>, TaskdeckError>;

    /// Creates a task; the response carries the server-assigned id and
    /// creation timestamp.
    async fn create(&self, request: &TaskRequest) -> Result<Task, TaskdeckError>;

    /// Marks a task complete; fails when the id is unknown server-side.
    async fn complete(&self, id: i64) -> Result<Task, TaskdeckError>;
}

#[derive(Debug, Clone)]
pub struct TaskClient {
    http: reqwest::Client,
    base_url: String,
}

impl TaskClient {
    pub fn new(
        base_url: impl Into<String>,
        connect_timeout: Duration,
    ) -> Result<Self, TaskdeckError> {
        let http = reqwest::Client::builder()
            .connect_timeout(connect_timeout)
            .build()
            .map_err(|e| TaskdeckError::Transport(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_owned(),
        })
    }

    pub fn from_config(cfg: &crate::config::Config) -> Result<Self, TaskdeckError> {
        Self::new(
            cfg.api.base_url.clone(),
            Duration::from_millis(cfg.api.connect_timeout_ms),
        )
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    async fn decode<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
        fallback: &str,
    ) -> Result<T, TaskdeckError> {
        let status = response.status();
        if status.is_success() {
            return response
                .json::<T>()
                .await
                .map_err(|_| TaskdeckError::Transport(fallback.to_owned()));
        }
        let body = response.bytes().await.unwrap_or_default();
        Err(TaskdeckError::Transport(error_message(&body, fallback)))
    }
}

#[async_trait]
impl TaskTransport for TaskClient {
    async fn fetch_recent(&self) -> Result<Vec<Task>, TaskdeckError> {
        let response = self
            .http
            .get(self.url("/tasks"))
            .send()
            .await
            .map_err(|_| TaskdeckError::Transport(FETCH_FALLBACK.to_owned()))?;
        Self::decode(response, FETCH_FALLBACK).await
    }

    async fn create(&self, request: &TaskRequest) -> Result<Task, TaskdeckError> {
        let response = self
            .http
            .post(self.url("/tasks"))
            .json(request)
            .send()
            .await
            .map_err(|_| TaskdeckError::Transport(CREATE_FALLBACK.to_owned()))?;
        Self::decode(response, CREATE_FALLBACK).await
    }

    async fn complete(&self, id: i64) -> Result<Task, TaskdeckError> {
        let response = self
            .http
            .put(self.url(&format!("/tasks/{id}/complete")))
            .send()
            .await
            .map_err(|_| TaskdeckError::Transport(COMPLETE_FALLBACK.to_owned()))?;
        Self::decode(response, COMPLETE_FALLBACK).await
    }
}

/// Picks the user-facing message out of a non-2xx response body: field
/// errors summarized when present, then the server message, then the
/// per-operation fallback.
fn error_message(body: &[u8], fallback: &str) -> String {
    let Ok(parsed) = serde_json::from_slice::<ApiErrorBody>(body) else {
        return fallback.to_owned();
    };

    if let Some(fields) = &parsed.field_errors
        && !fields.is_empty()
    {
        let parts: Vec<String> = fields.iter().map(|(k, v)| format!("{k}: {v}")).collect();
        return parts.join("; ");
    }

    parsed
        .message
        .filter(|m| !m.trim().is_empty())
        .unwrap_or_else(|| fallback.to_owned())
}
