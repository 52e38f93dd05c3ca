use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Semaphore;

use taskdeck::api::TaskTransport;
use taskdeck::error::TaskdeckError;
use taskdeck::store::{COMPLETED_MESSAGE, CREATED_MESSAGE, TaskStore};
use taskdeck::task::model::{Task, TaskRequest};

fn task(id: i64, title: &str) -> Task {
    Task {
        id,
        title: title.to_owned(),
        description: None,
        completed: false,
        created_at: "2025-01-04T10:15:30".to_owned(),
        completed_at: None,
    }
}

/// Scripted transport: serves a fixed task list, optionally failing every
/// call with a fixed message. Shared handles let tests flip behavior while
/// the store owns the transport.
#[derive(Clone, Default)]
struct StubTransport {
    tasks: Arc<std::sync::Mutex<Vec<Task>>>,
    fail_with: Arc<std::sync::Mutex<Option<String>>>,
    calls: Arc<AtomicUsize>,
}

impl StubTransport {
    fn serving(tasks: Vec<Task>) -> Self {
        let stub = Self::default();
        *stub.tasks.lock().unwrap() = tasks;
        stub
    }

    fn fail_with(&self, message: &str) {
        *self.fail_with.lock().unwrap() = Some(message.to_owned());
    }

    fn succeed(&self) {
        *self.fail_with.lock().unwrap() = None;
    }

    fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn check(&self) -> Result<(), TaskdeckError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.fail_with.lock().unwrap().clone() {
            Some(msg) => Err(TaskdeckError::Transport(msg)),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl TaskTransport for StubTransport {
    async fn fetch_recent(&self) -> Result<Vec<Task>, TaskdeckError> {
        self.check()?;
        Ok(self.tasks.lock().unwrap().clone())
    }

    async fn create(&self, request: &TaskRequest) -> Result<Task, TaskdeckError> {
        self.check()?;
        let mut created = task(99, &request.title);
        created.description = request.description.clone();
        Ok(created)
    }

    async fn complete(&self, id: i64) -> Result<Task, TaskdeckError> {
        self.check()?;
        let mut done = task(id, "done");
        done.completed = true;
        done.completed_at = Some("2025-01-04T11:00:00".to_owned());
        Ok(done)
    }
}

/// Transport whose fetch blocks until the test releases it, to observe the
/// pending state.
struct GatedTransport {
    gate: Arc<Semaphore>,
    started: Arc<AtomicBool>,
}

#[async_trait]
impl TaskTransport for GatedTransport {
    async fn fetch_recent(&self) -> Result<Vec<Task>, TaskdeckError> {
        self.started.store(true, Ordering::SeqCst);
        let _permit = self.gate.acquire().await;
        Ok(vec![task(1, "late arrival")])
    }

    async fn create(&self, _request: &TaskRequest) -> Result<Task, TaskdeckError> {
        unreachable!("not exercised")
    }

    async fn complete(&self, _id: i64) -> Result<Task, TaskdeckError> {
        unreachable!("not exercised")
    }
}

#[tokio::test]
async fn fetch_replaces_tasks_wholesale() {
    let stub = StubTransport::serving(vec![task(1, "one"), task(2, "two")]);
    let store = TaskStore::new(stub.clone());

    store.fetch().await.unwrap();
    let state = store.snapshot().await;
    assert_eq!(state.tasks.len(), 2);
    assert!(!state.loading);
    assert_eq!(state.error, None);
    assert_eq!(state.success_message, None);

    // A second fetch with a different server list replaces, not merges.
    *stub.tasks.lock().unwrap() = vec![task(3, "three")];
    store.fetch().await.unwrap();
    let state = store.snapshot().await;
    assert_eq!(state.tasks, vec![task(3, "three")]);
}

#[tokio::test]
async fn fetch_shows_loading_while_in_flight() {
    let gate = Arc::new(Semaphore::new(0));
    let started = Arc::new(AtomicBool::new(false));
    let store = Arc::new(TaskStore::new(GatedTransport {
        gate: Arc::clone(&gate),
        started: Arc::clone(&started),
    }));

    let worker = {
        let store = Arc::clone(&store);
        tokio::spawn(async move { store.fetch().await })
    };

    while !started.load(Ordering::SeqCst) {
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    let state = store.snapshot().await;
    assert!(state.loading);
    assert_eq!(state.error, None);
    assert!(state.tasks.is_empty());

    gate.add_permits(1);
    worker.await.unwrap().unwrap();
    let state = store.snapshot().await;
    assert!(!state.loading);
    assert_eq!(state.tasks, vec![task(1, "late arrival")]);
}

#[tokio::test]
async fn create_sets_message_without_inserting_locally() {
    let stub = StubTransport::serving(vec![task(1, "existing")]);
    let store = TaskStore::new(stub.clone());
    store.fetch().await.unwrap();

    let request = TaskRequest::new("brand new", None).unwrap();
    store.create(request).await.unwrap();

    let state = store.snapshot().await;
    assert!(!state.loading);
    assert_eq!(state.success_message.as_deref(), Some(CREATED_MESSAGE));
    // Deliberately unchanged: the caller refetches to see the new task.
    assert_eq!(state.tasks, vec![task(1, "existing")]);
}

#[tokio::test]
async fn complete_removes_task_and_sets_message() {
    let stub = StubTransport::serving(vec![task(1, "one"), task(2, "two")]);
    let store = TaskStore::new(stub);
    store.fetch().await.unwrap();

    store.complete(1).await.unwrap();

    let state = store.snapshot().await;
    assert!(!state.loading);
    assert_eq!(state.tasks, vec![task(2, "two")]);
    assert!(!state.tasks.iter().any(|t| t.id == 1));
    assert_eq!(state.success_message.as_deref(), Some(COMPLETED_MESSAGE));
}

#[tokio::test]
async fn failure_records_message_and_preserves_tasks() {
    let stub = StubTransport::serving(vec![task(1, "keep me")]);
    let store = TaskStore::new(stub.clone());
    store.fetch().await.unwrap();

    stub.fail_with("Task not found with id: 7");
    assert!(store.complete(7).await.is_err());

    let state = store.snapshot().await;
    assert!(!state.loading);
    assert_eq!(state.error.as_deref(), Some("Task not found with id: 7"));
    assert_eq!(state.tasks, vec![task(1, "keep me")]);
    assert_eq!(state.success_message, None);
}

#[tokio::test]
async fn starting_an_operation_clears_previous_error() {
    let stub = StubTransport::serving(vec![task(1, "one")]);
    let store = TaskStore::new(stub.clone());

    stub.fail_with("Failed to fetch tasks");
    assert!(store.fetch().await.is_err());
    assert_eq!(
        store.snapshot().await.error.as_deref(),
        Some("Failed to fetch tasks")
    );

    stub.succeed();
    store.fetch().await.unwrap();
    let state = store.snapshot().await;
    assert_eq!(state.error, None);
    assert_eq!(state.tasks, vec![task(1, "one")]);
}

#[tokio::test]
async fn clear_commands_are_idempotent() {
    let stub = StubTransport::default();
    let store = TaskStore::new(stub.clone());

    stub.fail_with("boom");
    assert!(store.fetch().await.is_err());

    store.clear_error().await;
    assert_eq!(store.snapshot().await.error, None);
    store.clear_error().await;
    assert_eq!(store.snapshot().await.error, None);

    stub.succeed();
    store.create(TaskRequest::new("t", None).unwrap()).await.unwrap();
    store.clear_success_message().await;
    store.clear_success_message().await;
    assert_eq!(store.snapshot().await.success_message, None);
}

#[tokio::test]
async fn invalid_title_never_reaches_the_transport() {
    let stub = StubTransport::default();
    let _store = TaskStore::new(stub.clone());

    let err = TaskRequest::new("", None).unwrap_err();
    assert!(err.is_validation());
    assert_eq!(err.to_string(), "Title is required");

    let err = TaskRequest::new("x".repeat(201), None).unwrap_err();
    assert!(err.is_validation());

    assert_eq!(stub.call_count(), 0);
}
