//! Task aggregate root, lifecycle status, and related value types.

use super::{
    ExecutionOutcome, InstanceId, NewConversation, ParseTaskStatusError, TaskDomainError, TaskId,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Task lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Waiting to be claimed by a worker instance.
    Pending,
    /// Claimed and owned by exactly one worker instance.
    Processing,
    /// Work finished successfully.
    Completed,
    /// Work failed.
    Failed,
}

impl TaskStatus {
    /// Every status, in lifecycle order.
    pub const ALL: [Self; 4] = [
        Self::Pending,
        Self::Processing,
        Self::Completed,
        Self::Failed,
    ];

    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    /// Returns `true` for `completed` and `failed`.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for TaskStatus {
    type Error = ParseTaskStatusError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let normalized = value.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "pending" => Ok(Self::Pending),
            "processing" => Ok(Self::Processing),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            _ => Err(ParseTaskStatusError(value.to_owned())),
        }
    }
}

/// Validated task title.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskTitle(String);

impl TaskTitle {
    /// Largest title length, in characters, the schema accepts.
    pub const MAX_LENGTH: usize = 255;

    /// Creates a validated title, trimming surrounding whitespace.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::EmptyTitle`] for blank input or
    /// [`TaskDomainError::TitleTooLong`] above [`Self::MAX_LENGTH`].
    pub fn new(value: impl Into<String>) -> Result<Self, TaskDomainError> {
        let raw = value.into();
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(TaskDomainError::EmptyTitle);
        }
        let length = trimmed.chars().count();
        if length > Self::MAX_LENGTH {
            return Err(TaskDomainError::TitleTooLong {
                length,
                max: Self::MAX_LENGTH,
            });
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// Returns the title as `str`.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaskTitle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Task aggregate root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    id: TaskId,
    title: TaskTitle,
    description: Option<String>,
    status: TaskStatus,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    processed_at: Option<DateTime<Utc>>,
    processing_instance_id: Option<InstanceId>,
}

/// Parameter object for reconstructing a persisted task aggregate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedTaskData {
    /// Persisted task identifier.
    pub id: TaskId,
    /// Persisted title.
    pub title: TaskTitle,
    /// Persisted description, if any.
    pub description: Option<String>,
    /// Persisted lifecycle status.
    pub status: TaskStatus,
    /// Persisted creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Persisted latest transition timestamp.
    pub updated_at: DateTime<Utc>,
    /// Persisted terminal transition timestamp, if any.
    pub processed_at: Option<DateTime<Utc>>,
    /// Instance currently or most recently owning the task.
    pub processing_instance_id: Option<InstanceId>,
}

impl Task {
    /// Creates a pending task as the store assigns it an identifier.
    #[must_use]
    pub fn pending(id: TaskId, new_task: &NewTask, now: DateTime<Utc>) -> Self {
        Self {
            id,
            title: new_task.title.clone(),
            description: new_task.description.clone(),
            status: TaskStatus::Pending,
            created_at: now,
            updated_at: now,
            processed_at: None,
            processing_instance_id: None,
        }
    }

    /// Reconstructs a task from persisted storage.
    #[must_use]
    pub fn from_persisted(data: PersistedTaskData) -> Self {
        Self {
            id: data.id,
            title: data.title,
            description: data.description,
            status: data.status,
            created_at: data.created_at,
            updated_at: data.updated_at,
            processed_at: data.processed_at,
            processing_instance_id: data.processing_instance_id,
        }
    }

    /// Returns the task identifier.
    #[must_use]
    pub const fn id(&self) -> TaskId {
        self.id
    }

    /// Returns the task title.
    #[must_use]
    pub const fn title(&self) -> &TaskTitle {
        &self.title
    }

    /// Returns the task description, if any.
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Returns the lifecycle status.
    #[must_use]
    pub const fn status(&self) -> TaskStatus {
        self.status
    }

    /// Returns the creation timestamp.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns the latest transition timestamp.
    #[must_use]
    pub const fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Returns the terminal transition timestamp, if reached.
    #[must_use]
    pub const fn processed_at(&self) -> Option<DateTime<Utc>> {
        self.processed_at
    }

    /// Returns the instance currently or most recently owning the task.
    #[must_use]
    pub const fn processing_instance_id(&self) -> Option<InstanceId> {
        self.processing_instance_id
    }

    /// Returns `true` when `instance_id` holds the task in processing.
    #[must_use]
    pub fn is_owned_by(&self, instance_id: &InstanceId) -> bool {
        self.status == TaskStatus::Processing
            && self.processing_instance_id.as_ref() == Some(instance_id)
    }

    /// Marks a pending task as processing under `instance_id`.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::NotPending`] for any other status.
    pub fn claim(
        &mut self,
        instance_id: InstanceId,
        now: DateTime<Utc>,
    ) -> Result<(), TaskDomainError> {
        if self.status != TaskStatus::Pending {
            return Err(TaskDomainError::NotPending {
                task_id: self.id,
                status: self.status,
            });
        }
        self.status = TaskStatus::Processing;
        self.processing_instance_id = Some(instance_id);
        self.updated_at = now;
        Ok(())
    }

    /// Records the terminal status for `outcome`.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::NotOwnedBy`] unless the task is processing
    /// under `instance_id`.
    pub fn finish(
        &mut self,
        instance_id: &InstanceId,
        outcome: &ExecutionOutcome,
        now: DateTime<Utc>,
    ) -> Result<(), TaskDomainError> {
        if !self.is_owned_by(instance_id) {
            return Err(TaskDomainError::NotOwnedBy {
                task_id: self.id,
                instance_id: *instance_id,
            });
        }
        self.status = outcome.terminal_status();
        self.processed_at = Some(now);
        self.updated_at = now;
        Ok(())
    }

    /// Returns an orphaned or failed task to pending and clears ownership.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::NotRequeueable`] for pending or completed
    /// tasks.
    pub fn requeue(&mut self, now: DateTime<Utc>) -> Result<(), TaskDomainError> {
        if !matches!(self.status, TaskStatus::Processing | TaskStatus::Failed) {
            return Err(TaskDomainError::NotRequeueable {
                task_id: self.id,
                status: self.status,
            });
        }
        self.status = TaskStatus::Pending;
        self.processing_instance_id = None;
        self.processed_at = None;
        self.updated_at = now;
        Ok(())
    }

    /// Applies descriptive edits. Status and ownership are never touched.
    pub fn apply_update(&mut self, update: &TaskUpdate, now: DateTime<Utc>) {
        if let Some(title) = &update.title {
            self.title = title.clone();
        }
        if let Some(description) = &update.description {
            self.description = Some(description.clone());
        }
        self.updated_at = now;
    }
}

/// Validated input for creating a task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTask {
    /// Task title.
    pub title: TaskTitle,
    /// Optional task description.
    pub description: Option<String>,
    /// Conversations created alongside the task.
    pub conversations: Vec<NewConversation>,
}

/// Descriptive fields the record layer may edit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskUpdate {
    /// Replacement title.
    pub title: Option<TaskTitle>,
    /// Replacement description.
    pub description: Option<String>,
}

/// Listing row for a task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskSummary {
    /// Task identifier.
    pub id: TaskId,
    /// Task title.
    pub title: TaskTitle,
    /// Lifecycle status.
    pub status: TaskStatus,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Number of conversations attached to the task.
    pub conversation_count: u64,
}

/// Task counts grouped by status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskStatusCounts {
    /// Tasks waiting to be claimed.
    pub pending: u64,
    /// Tasks currently owned by an instance.
    pub processing: u64,
    /// Tasks that completed.
    pub completed: u64,
    /// Tasks that failed.
    pub failed: u64,
}

impl TaskStatusCounts {
    /// Adds `count` tasks under `status`.
    pub const fn record(&mut self, status: TaskStatus, count: u64) {
        match status {
            TaskStatus::Pending => self.pending += count,
            TaskStatus::Processing => self.processing += count,
            TaskStatus::Completed => self.completed += count,
            TaskStatus::Failed => self.failed += count,
        }
    }

    /// Returns the count for `status`.
    #[must_use]
    pub const fn get(&self, status: TaskStatus) -> u64 {
        match status {
            TaskStatus::Pending => self.pending,
            TaskStatus::Processing => self.processing,
            TaskStatus::Completed => self.completed,
            TaskStatus::Failed => self.failed,
        }
    }

    /// Returns the total across all statuses.
    #[must_use]
    pub const fn total(&self) -> u64 {
        self.pending + self.processing + self.completed + self.failed
    }
}
