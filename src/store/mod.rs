#![forbid(unsafe_code)]

use tokio::sync::Mutex;

use crate::api::TaskTransport;
use crate::error::TaskdeckError;
use crate::task::model::{Task, TaskRequest};

pub const CREATED_MESSAGE: &str = "Task created successfully!";
pub const COMPLETED_MESSAGE: &str = "Task completed successfully!";

/// In-memory UI state. Created empty at startup, mutated only through the
/// store operations and the two clear commands, never persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoreState {
    /// Incomplete tasks in server order. Completed tasks are removed as
    /// soon as the complete operation succeeds.
    pub tasks: Vec<Task>,
    /// True while any fetch/create/complete is in flight.
    pub loading: bool,
    pub error: Option<String>,
    pub success_message: Option<String>,
}

/// Sequences the three async operations against a [`TaskTransport`] and
/// keeps [`StoreState`] consistent with their outcomes.
///
/// Operations take `&self`, so fetch, create, and complete may be in flight
/// concurrently; their completions are applied in whatever order the
/// responses arrive (last writer wins). The state lock is held only for the
/// synchronous mutations on either side of the network await, never across
/// it.
pub struct TaskStore<T> {
    transport: T,
    state: Mutex<StoreState>,
}

impl<T: TaskTransport> TaskStore<T> {
    #[must_use]
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            state: Mutex::new(StoreState::default()),
        }
    }

    /// Clone of the current state, for rendering.
    pub async fn snapshot(&self) -> StoreState {
        self.state.lock().await.clone()
    }

    /// Replaces the task list wholesale with what the server returns.
    /// Leaves `error`/`success_message` untouched on success.
    pub async fn fetch(&self) -> Result<(), TaskdeckError> {
        self.begin().await;
        match self.transport.fetch_recent().await {
            Ok(tasks) => {
                let mut state = self.state.lock().await;
                state.loading = false;
                state.tasks = tasks;
                Ok(())
            }
            Err(err) => Err(self.fail(err).await),
        }
    }

    /// Creates a task remotely. The local list is deliberately left
    /// untouched; callers refetch to pick up the server-assigned row
    /// (create-then-refetch, not an optimistic insert).
    pub async fn create(&self, request: TaskRequest) -> Result<(), TaskdeckError> {
        self.begin().await;
        match self.transport.create(&request).await {
            Ok(_task) => {
                let mut state = self.state.lock().await;
                state.loading = false;
                state.success_message = Some(CREATED_MESSAGE.to_owned());
                Ok(())
            }
            Err(err) => Err(self.fail(err).await),
        }
    }

    /// Marks the task complete remotely and drops it from the visible list.
    pub async fn complete(&self, id: i64) -> Result<(), TaskdeckError> {
        self.begin().await;
        match self.transport.complete(id).await {
            Ok(_task) => {
                let mut state = self.state.lock().await;
                state.loading = false;
                state.tasks.retain(|t| t.id != id);
                state.success_message = Some(COMPLETED_MESSAGE.to_owned());
                Ok(())
            }
            Err(err) => Err(self.fail(err).await),
        }
    }

    /// Dismisses the error banner. No-op when no error is set.
    pub async fn clear_error(&self) {
        self.state.lock().await.error = None;
    }

    /// Dismisses the success message. No-op when none is set.
    pub async fn clear_success_message(&self) {
        self.state.lock().await.success_message = None;
    }

    async fn begin(&self) {
        let mut state = self.state.lock().await;
        state.loading = true;
        state.error = None;
    }

    /// Records the failure and halts the operation's effect on `tasks`.
    async fn fail(&self, err: TaskdeckError) -> TaskdeckError {
        let mut state = self.state.lock().await;
        state.loading = false;
        state.error = Some(err.to_string());
        err
    }
}
