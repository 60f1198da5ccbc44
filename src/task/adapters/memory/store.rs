//! In-memory task store for tests and single-process use.
//!
//! Every operation runs under one lock, so the claim scan and the ownership
//! check are as atomic here as the `PostgreSQL` transactions they mirror.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::task::{
    domain::{
        Conversation, ConversationId, ConversationUpdate, ExecutionOutcome, InstanceId,
        NewConversation, NewTask, QueueStats, Task, TaskId, TaskStatus, TaskStatusCounts,
        TaskSummary, TaskUpdate,
    },
    ports::{TaskQueue, TaskRepository, TaskStoreError, TaskStoreResult},
};

/// Thread-safe in-memory task store.
#[derive(Debug, Clone, Default)]
pub struct InMemoryTaskStore {
    state: Arc<RwLock<InMemoryTaskState>>,
}

#[derive(Debug, Default)]
struct InMemoryTaskState {
    tasks: BTreeMap<TaskId, Task>,
    conversations: BTreeMap<ConversationId, Conversation>,
    last_task_id: i64,
    last_conversation_id: i64,
}

impl InMemoryTaskState {
    fn next_task_id(&mut self) -> TaskId {
        self.last_task_id += 1;
        TaskId::from_raw(self.last_task_id)
    }

    fn next_conversation_id(&mut self) -> ConversationId {
        self.last_conversation_id += 1;
        ConversationId::from_raw(self.last_conversation_id)
    }

    fn insert_conversation(
        &mut self,
        task_id: TaskId,
        new_conversation: &NewConversation,
        now: DateTime<Utc>,
    ) -> Conversation {
        let id = self.next_conversation_id();
        let conversation = Conversation::created(id, task_id, new_conversation, now);
        self.conversations.insert(id, conversation.clone());
        conversation
    }

    fn completions(&self) -> BTreeMap<InstanceId, u64> {
        let mut completions = BTreeMap::new();
        for task in self.tasks.values() {
            if task.status() != TaskStatus::Completed {
                continue;
            }
            if let Some(instance_id) = task.processing_instance_id() {
                *completions.entry(instance_id).or_insert(0) += 1;
            }
        }
        completions
    }

        fn conversations_of(&self, task_id: TaskId) -> Vec<Conversation> {
        let mut found: Vec<Conversation> = self
            .conversations
            .values()
            .filter(|conversation| conversation.task_id() == task_id)
            .cloned()
            .collect();
        found.sort_by_key(|conversation| (conversation.created_at(), conversation.id()));
        found
    }
}

impl InMemoryTaskStore {
    /// Creates an empty in-memory store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> TaskStoreResult<RwLockReadGuard<'_, InMemoryTaskState>> {
        self.state.read().map_err(|err| {
            TaskStoreError::persistence(std::io::Error::other(err.to_string()))
        })
    }

    fn write(&self) -> TaskStoreResult<RwLockWriteGuard<'_, InMemoryTaskState>> {
        self.state.write().map_err(|err| {
            TaskStoreError::persistence(std::io::Error::other(err.to_string()))
        })
    }
}

#[async_trait]
impl TaskRepository for InMemoryTaskStore {
    async fn create_task(
        &self,
        task: &NewTask,
        now: DateTime<Utc>,
    ) -> TaskStoreResult<(Task, Vec<Conversation>)> {
        let mut state = self.write()?;
        let id = state.next_task_id();
        let created = Task::pending(id, task, now);
        state.tasks.insert(id, created.clone());
        let conversations = task
            .conversations
            .iter()
            .map(|conversation| state.insert_conversation(id, conversation, now))
            .collect();
        Ok((created, conversations))
    }

    async fn find_task(&self, id: TaskId) -> TaskStoreResult<Option<Task>> {
        let state = self.read()?;
        Ok(state.tasks.get(&id).cloned())
    }

    async fn list_tasks(&self) -> TaskStoreResult<Vec<TaskSummary>> {
        let state = self.read()?;
        let mut summaries: Vec<TaskSummary> = state
            .tasks
            .values()
            .map(|task| TaskSummary {
                id: task.id(),
                title: task.title().clone(),
                status: task.status(),
                created_at: task.created_at(),
                conversation_count: state
                    .conversations
                    .values()
                    .filter(|conversation| conversation.task_id() == task.id())
                    .count() as u64,
            })
            .collect();
        summaries.sort_by(|left, right| {
            (right.created_at, right.id).cmp(&(left.created_at, left.id))
        });
        Ok(summaries)
    }

    async fn update_task(
        &self,
        id: TaskId,
        update: &TaskUpdate,
        now: DateTime<Utc>,
    ) -> TaskStoreResult<Task> {
        let mut state = self.write()?;
        let task = state
            .tasks
            .get_mut(&id)
            .ok_or(TaskStoreError::TaskNotFound(id))?;
        task.apply_update(update, now);
        Ok(task.clone())
    }

    async fn delete_task(&self, id: TaskId) -> TaskStoreResult<()> {
        let mut state = self.write()?;
        if state.tasks.remove(&id).is_none() {
            return Err(TaskStoreError::TaskNotFound(id));
        }
        state
            .conversations
            .retain(|_, conversation| conversation.task_id() != id);
        Ok(())
    }

    async fn add_conversation(
        &self,
        task_id: TaskId,
        conversation: &NewConversation,
        now: DateTime<Utc>,
    ) -> TaskStoreResult<Conversation> {
        let mut state = self.write()?;
        if !state.tasks.contains_key(&task_id) {
            return Err(TaskStoreError::TaskNotFound(task_id));
        }
        Ok(state.insert_conversation(task_id, conversation, now))
    }

    async fn list_conversations(&self, task_id: TaskId) -> TaskStoreResult<Vec<Conversation>> {
        let state = self.read()?;
        if !state.tasks.contains_key(&task_id) {
            return Err(TaskStoreError::TaskNotFound(task_id));
        }
        Ok(state.conversations_of(task_id))
    }

    async fn update_conversation(
        &self,
        id: ConversationId,
        update: &ConversationUpdate,
        now: DateTime<Utc>,
    ) -> TaskStoreResult<Conversation> {
        let mut state = self.write()?;
        let conversation = state
            .conversations
            .get_mut(&id)
            .ok_or(TaskStoreError::ConversationNotFound(id))?;
        conversation.apply_update(update, now);
        Ok(conversation.clone())
    }

    async fn requeue(&self, id: TaskId, now: DateTime<Utc>) -> TaskStoreResult<bool> {
        let mut state = self.write()?;
        let task = state
            .tasks
            .get_mut(&id)
            .ok_or(TaskStoreError::TaskNotFound(id))?;
        Ok(task.requeue(now).is_ok())
    }

    async fn requeue_stalled(
        &self,
        stale_before: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> TaskStoreResult<Vec<TaskId>> {
        let mut state = self.write()?;
        let mut requeued = Vec::new();
        for task in state.tasks.values_mut() {
            if task.status() == TaskStatus::Processing
                && task.updated_at() < stale_before
                && task.requeue(now).is_ok()
            {
                requeued.push(task.id());
            }
        }
        Ok(requeued)
    }
}

#[async_trait]
impl TaskQueue for InMemoryTaskStore {
    async fn claim_next(
        &self,
        instance_id: &InstanceId,
        now: DateTime<Utc>,
    ) -> TaskStoreResult<Option<Task>> {
        let mut state = self.write()?;
        let Some(task) = state
            .tasks
            .values_mut()
            .filter(|task| task.status() == TaskStatus::Pending)
            .min_by_key(|task| (task.created_at(), task.id()))
        else {
            return Ok(None);
        };
        task.claim(*instance_id, now)
            .map_err(TaskStoreError::persistence)?;
        Ok(Some(task.clone()))
    }

    async fn commit_terminal(
        &self,
        task_id: TaskId,
        instance_id: &InstanceId,
        outcome: &ExecutionOutcome,
        now: DateTime<Utc>,
    ) -> TaskStoreResult<bool> {
        let mut guard = self.write()?;
        let state = &mut *guard;
        let Some(task) = state.tasks.get_mut(&task_id) else {
            return Ok(false);
        };
        if task.finish(instance_id, outcome, now).is_err() {
            return Ok(false);
        }
        if let Some(status) = outcome.conversation_status() {
            state
                .conversations
                .values_mut()
                .filter(|conversation| conversation.task_id() == task_id)
                .for_each(|conversation| conversation.mark(status, now));
        }
        Ok(true)
    }

    async fn status_counts(&self) -> TaskStoreResult<TaskStatusCounts> {
        let state = self.read()?;
        let mut counts = TaskStatusCounts::default();
        for task in state.tasks.values() {
            counts.record(task.status(), 1);
        }
        Ok(counts)
    }

    async fn conversation_total(&self) -> TaskStoreResult<u64> {
        let state = self.read()?;
        Ok(state.conversations.len() as u64)
    }

    async fn completions_by_instance(&self) -> TaskStoreResult<BTreeMap<InstanceId, u64>> {
        let state = self.read()?;
        Ok(state.completions())
    }

    async fn queue_stats(&self, created_since: DateTime<Utc>) -> TaskStoreResult<QueueStats> {
        let state = self.read()?;
        let mut counts = TaskStatusCounts::default();
        let mut recent = 0;
        for task in state.tasks.values() {
            counts.record(task.status(), 1);
            if task.created_at() > created_since {
                recent += 1;
            }
        }
        Ok(QueueStats {
            counts,
            total_conversations: state.conversations.len() as u64,
            completions_by_instance: state.completions(),
            created_since: recent,
        })
    }
}
