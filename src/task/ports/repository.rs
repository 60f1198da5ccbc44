//! Record port for task and conversation persistence.

use super::TaskStoreResult;
use crate::task::domain::{
    Conversation, ConversationId, ConversationUpdate, NewConversation, NewTask, Task, TaskId,
    TaskSummary, TaskUpdate,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Task record persistence contract.
///
/// None of these operations writes `processing`, `completed`, or `failed`
/// status or the owning instance; those belong to
/// [`TaskQueue`](super::TaskQueue).
#[async_trait]
pub trait TaskRepository: Send + Sync {
    /// Stores a new pending task and its initial conversations.
    ///
    /// Returns the task and conversations with their assigned identifiers.
    async fn create_task(
        &self,
        task: &NewTask,
        now: DateTime<Utc>,
    ) -> TaskStoreResult<(Task, Vec<Conversation>)>;

    /// Finds a task by identifier.
    ///
    /// Returns `None` when the task does not exist.
    async fn find_task(&self, id: TaskId) -> TaskStoreResult<Option<Task>>;

    /// Lists every task with its conversation count, newest first.
    async fn list_tasks(&self) -> TaskStoreResult<Vec<TaskSummary>>;

    /// Applies descriptive edits to a task.
    ///
    /// # Errors
    ///
    /// Returns [`TaskStoreError::TaskNotFound`](super::TaskStoreError::TaskNotFound)
    /// when the task does not exist.
    async fn update_task(
        &self,
        id: TaskId,
        update: &TaskUpdate,
        now: DateTime<Utc>,
    ) -> TaskStoreResult<Task>;

    /// Deletes a task and, by cascade, its conversations.
    ///
    /// # Errors
    ///
    /// Returns [`TaskStoreError::TaskNotFound`](super::TaskStoreError::TaskNotFound)
    /// when the task does not exist.
    async fn delete_task(&self, id: TaskId) -> TaskStoreResult<()>;

    /// Attaches a conversation to an existing task.
    ///
    /// # Errors
    ///
    /// Returns [`TaskStoreError::TaskNotFound`](super::TaskStoreError::TaskNotFound)
    /// when the task does not exist.
    async fn add_conversation(
        &self,
        task_id: TaskId,
        conversation: &NewConversation,
        now: DateTime<Utc>,
    ) -> TaskStoreResult<Conversation>;

    /// Returns a task's conversations in creation order.
    ///
    /// # Errors
    ///
    /// Returns [`TaskStoreError::TaskNotFound`](super::TaskStoreError::TaskNotFound)
    /// when the task does not exist.
    async fn list_conversations(&self, task_id: TaskId) -> TaskStoreResult<Vec<Conversation>>;

    /// Applies record-layer edits to a conversation.
    ///
    /// # Errors
    ///
    /// Returns [`TaskStoreError::ConversationNotFound`](super::TaskStoreError::ConversationNotFound)
    /// when the conversation does not exist.
    async fn update_conversation(
        &self,
        id: ConversationId,
        update: &ConversationUpdate,
        now: DateTime<Utc>,
    ) -> TaskStoreResult<Conversation>;

    /// Administrative reset of an orphaned (`processing`) or `failed` task
    /// back to `pending`, clearing its owner and `processed_at`.
    ///
    /// Conditional and atomic. Returns `false` when the task is in any other
    /// status.
    ///
    /// # Errors
    ///
    /// Returns [`TaskStoreError::TaskNotFound`](super::TaskStoreError::TaskNotFound)
    /// when the task does not exist.
    async fn requeue(&self, id: TaskId, now: DateTime<Utc>) -> TaskStoreResult<bool>;

    /// Administrative sweep returning every `processing` task last updated
    /// before `stale_before` to `pending`. Returns the requeued identifiers.
    async fn requeue_stalled(
        &self,
        stale_before: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> TaskStoreResult<Vec<TaskId>>;
}
