//! Test executors and task builders shared by worker tests.

use crate::task::{
    adapters::memory::InMemoryTaskStore,
    domain::{
        ConversationContent, ConversationStatus, ExecutionOutcome, InstanceId, NewConversation,
        NewTask, QueueStats, Task, TaskId, TaskStatusCounts, TaskTitle,
    },
    ports::{TaskQueue, TaskRepository, TaskStoreError, TaskStoreResult},
};
use crate::worker::TaskExecutor;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mockable::{Clock, DefaultClock};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::{Notify, oneshot};

/// Builds a new task with `conversations` active conversations.
pub(super) fn new_task(title: &str, conversations: usize) -> NewTask {
    NewTask {
        title: TaskTitle::new(title).expect("valid title"),
        description: None,
        conversations: (0..conversations)
            .map(|index| NewConversation {
                content: ConversationContent::new(format!("{title} #{index}"))
                    .expect("valid content"),
                status: ConversationStatus::Active,
            })
            .collect(),
    }
}

/// Builds a task already claimed by `owner`, as a queue would return it.
pub(super) fn claimed_task(id: i64, owner: InstanceId) -> Task {
    let now = DefaultClock.utc();
    let mut task = Task::pending(TaskId::from_raw(id), &new_task("mocked", 0), now);
    task.claim(owner, now).expect("pending task is claimable");
    task
}

/// Reports a fixed failure.
pub(super) struct FailingExecutor;

#[async_trait]
impl TaskExecutor for FailingExecutor {
    async fn execute(&self, _task: &Task) -> ExecutionOutcome {
        ExecutionOutcome::failure("simulated fault")
    }
}

/// Panics mid-execution.
pub(super) struct PanickingExecutor;

#[async_trait]
impl TaskExecutor for PanickingExecutor {
    async fn execute(&self, task: &Task) -> ExecutionOutcome {
        panic!("executor blew up on task {}", task.id());
    }
}

/// Requeues the task while it is executing, as an operator resetting a
/// task they believe is stuck would.
pub(super) struct RequeueingExecutor {
    pub(super) store: Arc<InMemoryTaskStore>,
}

#[async_trait]
impl TaskExecutor for RequeueingExecutor {
    async fn execute(&self, task: &Task) -> ExecutionOutcome {
        let requeued = self
            .store
            .requeue(task.id(), DefaultClock.utc())
            .await
            .expect("requeue should succeed");
        assert!(requeued, "processing task should be requeueable");
        ExecutionOutcome::Success
    }
}

/// Signals when execution starts and waits to be released.
pub(super) struct GatedExecutor {
    started: Mutex<Option<oneshot::Sender<()>>>,
    release: Arc<Notify>,
}

impl GatedExecutor {
    pub(super) fn new() -> (Self, oneshot::Receiver<()>, Arc<Notify>) {
        let (started_tx, started_rx) = oneshot::channel();
        let release = Arc::new(Notify::new());
        let executor = Self {
            started: Mutex::new(Some(started_tx)),
            release: Arc::clone(&release),
        };
        (executor, started_rx, release)
    }
}

#[async_trait]
impl TaskExecutor for GatedExecutor {
    async fn execute(&self, _task: &Task) -> ExecutionOutcome {
        let sender = self.started.lock().expect("gate lock").take();
        if let Some(started) = sender {
            started.send(()).expect("test awaits the start signal");
        }
        self.release.notified().await;
        ExecutionOutcome::Success
    }
}

/// Queue over an in-memory store whose first `commits_to_fail` commits
/// fail as if the connection dropped.
pub(super) struct FlakyCommitQueue {
    pub(super) store: Arc<InMemoryTaskStore>,
    commits_to_fail: AtomicUsize,
}

impl FlakyCommitQueue {
    pub(super) fn new(store: Arc<InMemoryTaskStore>, commits_to_fail: usize) -> Self {
        Self {
            store,
            commits_to_fail: AtomicUsize::new(commits_to_fail),
        }
    }

    pub(super) fn failures_left(&self) -> usize {
        self.commits_to_fail.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TaskQueue for FlakyCommitQueue {
    async fn claim_next(
        &self,
        instance_id: &InstanceId,
        now: DateTime<Utc>,
    ) -> TaskStoreResult<Option<Task>> {
        self.store.claim_next(instance_id, now).await
    }

    async fn commit_terminal(
        &self,
        task_id: TaskId,
        instance_id: &InstanceId,
        outcome: &ExecutionOutcome,
        now: DateTime<Utc>,
    ) -> TaskStoreResult<bool> {
        let failing = self
            .commits_to_fail
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .is_ok();
        if failing {
            return Err(TaskStoreError::persistence(std::io::Error::other(
                "connection reset during commit",
            )));
        }
        self.store
            .commit_terminal(task_id, instance_id, outcome, now)
            .await
    }

    async fn status_counts(&self) -> TaskStoreResult<TaskStatusCounts> {
        self.store.status_counts().await
    }

    async fn conversation_total(&self) -> TaskStoreResult<u64> {
        self.store.conversation_total().await
    }

    async fn completions_by_instance(&self) -> TaskStoreResult<BTreeMap<InstanceId, u64>> {
        self.store.completions_by_instance().await
    }

    async fn queue_stats(&self, created_since: DateTime<Utc>) -> TaskStoreResult<QueueStats> {
        self.store.queue_stats(created_since).await
    }
}
