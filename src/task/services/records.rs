//! Record management for tasks and their conversations.

use crate::task::{
    domain::{
        Conversation, ConversationContent, ConversationId, ConversationStatus,
        ConversationUpdate, NewConversation, NewTask, Task, TaskDomainError, TaskId, TaskSummary,
        TaskTitle, TaskUpdate,
    },
    ports::{TaskRepository, TaskStoreError},
};
use chrono::{DateTime, TimeDelta, Utc};
use mockable::Clock;
use std::sync::Arc;
use thiserror::Error;

/// Request payload for attaching a conversation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateConversationRequest {
    content: String,
    status: Option<ConversationStatus>,
}

impl CreateConversationRequest {
    /// Creates a request for an `active` conversation.
    #[must_use]
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            status: None,
        }
    }

    /// Overrides the initial status.
    #[must_use]
    pub const fn with_status(mut self, status: ConversationStatus) -> Self {
        self.status = Some(status);
        self
    }

    fn validate(self) -> Result<NewConversation, TaskDomainError> {
        Ok(NewConversation {
            content: ConversationContent::new(self.content)?,
            status: self.status.unwrap_or_default(),
        })
    }
}

/// Request payload for creating a task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateTaskRequest {
    title: String,
    description: Option<String>,
    conversations: Vec<CreateConversationRequest>,
}

impl CreateTaskRequest {
    /// Creates a request with the required title.
    #[must_use]
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: None,
            conversations: Vec::new(),
        }
    }

    /// Sets the task description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Adds an initial conversation.
    #[must_use]
    pub fn with_conversation(mut self, conversation: CreateConversationRequest) -> Self {
        self.conversations.push(conversation);
        self
    }

    fn validate(self) -> Result<NewTask, TaskDomainError> {
        let conversations = self
            .conversations
            .into_iter()
            .map(CreateConversationRequest::validate)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(NewTask {
            title: TaskTitle::new(self.title)?,
            description: self.description,
            conversations,
        })
    }
}

/// Descriptive edits to a task. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateTaskRequest {
    title: Option<String>,
    description: Option<String>,
}

impl UpdateTaskRequest {
    /// Creates an empty update.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the title.
    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Replaces the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    fn validate(self) -> Result<TaskUpdate, TaskDomainError> {
        Ok(TaskUpdate {
            title: self.title.map(TaskTitle::new).transpose()?,
            description: self.description,
        })
    }
}

/// Edits to a conversation. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateConversationRequest {
    content: Option<String>,
    status: Option<ConversationStatus>,
}

impl UpdateConversationRequest {
    /// Creates an empty update.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the content.
    #[must_use]
    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }

    /// Replaces the status.
    #[must_use]
    pub const fn with_status(mut self, status: ConversationStatus) -> Self {
        self.status = Some(status);
        self
    }

    fn validate(self) -> Result<ConversationUpdate, TaskDomainError> {
        Ok(ConversationUpdate {
            content: self.content.map(ConversationContent::new).transpose()?,
            status: self.status,
        })
    }
}

/// A task together with its conversations in creation order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskDetail {
    /// The task record.
    pub task: Task,
    /// Conversations attached to the task.
    pub conversations: Vec<Conversation>,
}

/// Service-level errors for task record operations.
#[derive(Debug, Error)]
pub enum TaskServiceError {
    /// Input validation failed.
    #[error(transparent)]
    Domain(#[from] TaskDomainError),
    /// Store operation failed.
    #[error(transparent)]
    Store(#[from] TaskStoreError),
}

/// Result type for task record service operations.
pub type TaskServiceResult<T> = Result<T, TaskServiceError>;

/// Task and conversation record service.
///
/// This is the only write path besides the worker's claim and commit. It
/// never sets `processing`, `completed`, or `failed` status, and never
/// writes the owning instance.
#[derive(Clone)]
pub struct TaskRecordService<R, C>
where
    R: TaskRepository,
    C: Clock + Send + Sync,
{
    repository: Arc<R>,
    clock: Arc<C>,
}

impl<R, C> TaskRecordService<R, C>
where
    R: TaskRepository,
    C: Clock + Send + Sync,
{
    /// Creates a new record service.
    #[must_use]
    pub const fn new(repository: Arc<R>, clock: Arc<C>) -> Self {
        Self { repository, clock }
    }

    /// Creates a pending task with its initial conversations.
    ///
    /// # Errors
    ///
    /// Returns [`TaskServiceError::Domain`] when the title or a conversation
    /// payload is invalid, or [`TaskServiceError::Store`] when persistence
    /// fails.
    pub async fn create_task(&self, request: CreateTaskRequest) -> TaskServiceResult<TaskDetail> {
        let new_task = request.validate()?;
        let (task, conversations) = self
            .repository
            .create_task(&new_task, self.clock.utc())
            .await?;
        Ok(TaskDetail {
            task,
            conversations,
        })
    }

    /// Retrieves a task with its conversations.
    ///
    /// # Errors
    ///
    /// Returns [`TaskStoreError::TaskNotFound`] (wrapped) when the task does
    /// not exist.
    pub async fn get_task(&self, id: TaskId) -> TaskServiceResult<TaskDetail> {
        let task = self
            .repository
            .find_task(id)
            .await?
            .ok_or(TaskStoreError::TaskNotFound(id))?;
        let conversations = self.repository.list_conversations(id).await?;
        Ok(TaskDetail {
            task,
            conversations,
        })
    }

    /// Lists task summaries, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`TaskServiceError::Store`] when persistence fails.
    pub async fn list_tasks(&self) -> TaskServiceResult<Vec<TaskSummary>> {
        Ok(self.repository.list_tasks().await?)
    }

    /// Edits a task's title or description.
    ///
    /// # Errors
    ///
    /// Returns [`TaskServiceError::Domain`] for an invalid title, or
    /// [`TaskServiceError::Store`] when the task is missing or persistence
    /// fails.
    pub async fn update_task(
        &self,
        id: TaskId,
        request: UpdateTaskRequest,
    ) -> TaskServiceResult<Task> {
        let update = request.validate()?;
        Ok(self
            .repository
            .update_task(id, &update, self.clock.utc())
            .await?)
    }

    /// Deletes a task and its conversations.
    ///
    /// # Errors
    ///
    /// Returns [`TaskServiceError::Store`] when the task is missing or
    /// persistence fails.
    pub async fn delete_task(&self, id: TaskId) -> TaskServiceResult<()> {
        Ok(self.repository.delete_task(id).await?)
    }

    /// Attaches a conversation to a task.
    ///
    /// # Errors
    ///
    /// Returns [`TaskServiceError::Domain`] for blank content, or
    /// [`TaskServiceError::Store`] when the task is missing or persistence
    /// fails.
    pub async fn add_conversation(
        &self,
        task_id: TaskId,
        request: CreateConversationRequest,
    ) -> TaskServiceResult<Conversation> {
        let conversation = request.validate()?;
        Ok(self
            .repository
            .add_conversation(task_id, &conversation, self.clock.utc())
            .await?)
    }

    /// Lists a task's conversations in creation order.
    ///
    /// # Errors
    ///
    /// Returns [`TaskServiceError::Store`] when the task is missing or
    /// persistence fails.
    pub async fn list_conversations(&self, task_id: TaskId) -> TaskServiceResult<Vec<Conversation>> {
        Ok(self.repository.list_conversations(task_id).await?)
    }

    /// Edits a conversation's content or status.
    ///
    /// # Errors
    ///
    /// Returns [`TaskServiceError::Domain`] for blank content, or
    /// [`TaskServiceError::Store`] when the conversation is missing or
    /// persistence fails.
    pub async fn update_conversation(
        &self,
        id: ConversationId,
        request: UpdateConversationRequest,
    ) -> TaskServiceResult<Conversation> {
        let update = request.validate()?;
        Ok(self
            .repository
            .update_conversation(id, &update, self.clock.utc())
            .await?)
    }

    /// Returns an orphaned `processing` task, or a `failed` one, to
    /// `pending`.
    ///
    /// Returns `false` when the task is in any other status.
    ///
    /// # Errors
    ///
    /// Returns [`TaskServiceError::Store`] when the task is missing or
    /// persistence fails.
    pub async fn requeue_task(&self, id: TaskId) -> TaskServiceResult<bool> {
        Ok(self.repository.requeue(id, self.clock.utc()).await?)
    }

    /// Returns every `processing` task untouched for longer than
    /// `older_than` to `pending`.
    ///
    /// # Errors
    ///
    /// Returns [`TaskServiceError::Store`] when persistence fails.
    pub async fn requeue_stalled(&self, older_than: TimeDelta) -> TaskServiceResult<Vec<TaskId>> {
        let now = self.clock.utc();
        let stale_before = now
            .checked_sub_signed(older_than)
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        Ok(self.repository.requeue_stalled(stale_before, now).await?)
    }
}
