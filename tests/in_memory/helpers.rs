//! Shared helpers for multi-instance worker tests.

use async_trait::async_trait;
use foreman::task::{
    adapters::memory::InMemoryTaskStore,
    domain::{
        ConversationContent, ConversationStatus, ExecutionOutcome, NewConversation, NewTask, Task,
        TaskId, TaskTitle,
    },
    ports::{TaskQueue, TaskRepository},
};
use foreman::worker::TaskExecutor;
use mockable::{Clock, DefaultClock};
use std::collections::HashSet;
use std::sync::Mutex;
use std::time::Duration;

/// Creates `count` tasks, each with `conversations` active conversations.
pub async fn seed(store: &InMemoryTaskStore, count: usize, conversations: usize) -> Vec<TaskId> {
    let mut ids = Vec::with_capacity(count);
    for index in 0..count {
        let task = NewTask {
            title: TaskTitle::new(format!("job {index}")).expect("valid title"),
            description: None,
            conversations: (0..conversations)
                .map(|turn| NewConversation {
                    content: ConversationContent::new(format!("job {index} turn {turn}"))
                        .expect("valid content"),
                    status: ConversationStatus::Active,
                })
                .collect(),
        };
        let (created, _) = store
            .create_task(&task, DefaultClock.utc())
            .await
            .expect("task creation should succeed");
        ids.push(created.id());
    }
    ids
}

/// Polls until no task is pending or processing, or `limit` elapses.
pub async fn wait_until_drained(store: &InMemoryTaskStore, limit: Duration) -> bool {
    let deadline = tokio::time::Instant::now() + limit;
    loop {
        let counts = store.status_counts().await.expect("counts should load");
        if counts.pending == 0 && counts.processing == 0 {
            return true;
        }
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

/// Executor that records every execution and flags any task executed while
/// it is already in flight elsewhere.
#[derive(Debug, Default)]
pub struct ExclusiveExecutor {
    in_flight: Mutex<HashSet<TaskId>>,
    executed: Mutex<Vec<TaskId>>,
    overlaps: Mutex<Vec<TaskId>>,
}

impl ExclusiveExecutor {
    /// Every execution seen, in start order.
    pub fn executed(&self) -> Vec<TaskId> {
        self.executed.lock().expect("executed lock").clone()
    }

    /// Tasks that were executing on two instances at once.
    pub fn overlaps(&self) -> Vec<TaskId> {
        self.overlaps.lock().expect("overlaps lock").clone()
    }
}

#[async_trait]
impl TaskExecutor for ExclusiveExecutor {
    async fn execute(&self, task: &Task) -> ExecutionOutcome {
        let id = task.id();
        {
            let mut in_flight = self.in_flight.lock().expect("in-flight lock");
            if !in_flight.insert(id) {
                self.overlaps.lock().expect("overlaps lock").push(id);
            }
        }
        self.executed.lock().expect("executed lock").push(id);

        tokio::time::sleep(Duration::from_millis(15)).await;

        self.in_flight.lock().expect("in-flight lock").remove(&id);
        ExecutionOutcome::Success
    }
}
