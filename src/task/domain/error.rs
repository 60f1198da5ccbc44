//! Error types for task domain validation, parsing, and transitions.

use super::{InstanceId, TaskId, TaskStatus};
use thiserror::Error;

/// Errors returned while constructing or transitioning task domain values.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TaskDomainError {
    /// The task title is empty after trimming.
    #[error("task title must not be empty")]
    EmptyTitle,

    /// The task title exceeds the persisted column width.
    #[error("task title is {length} characters, maximum is {max}")]
    TitleTooLong {
        /// Length of the rejected title in characters.
        length: usize,
        /// Maximum accepted length.
        max: usize,
    },

    /// Conversation content is empty after trimming.
    #[error("conversation content must not be empty")]
    EmptyConversationContent,

    /// Only pending tasks can be claimed.
    #[error("task {task_id} cannot be claimed from status {status}")]
    NotPending {
        /// Task that was not claimable.
        task_id: TaskId,
        /// Status the task was found in.
        status: TaskStatus,
    },

    /// A terminal transition was attempted by an instance that does not own
    /// the task, or the task is no longer processing.
    #[error("task {task_id} is not processing under instance {instance_id}")]
    NotOwnedBy {
        /// Task whose ownership was checked.
        task_id: TaskId,
        /// Instance that attempted the transition.
        instance_id: InstanceId,
    },

    /// The task is neither orphaned in processing nor failed.
    #[error("task {task_id} cannot be requeued from status {status}")]
    NotRequeueable {
        /// Task that was not requeueable.
        task_id: TaskId,
        /// Status the task was found in.
        status: TaskStatus,
    },
}

/// Error returned while parsing task statuses from persistence.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown task status: {0}")]
pub struct ParseTaskStatusError(pub String);

/// Error returned while parsing conversation statuses from persistence.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown conversation status: {0}")]
pub struct ParseConversationStatusError(pub String);

/// Error returned while parsing a persisted instance identifier.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("invalid instance identifier '{value}': {reason}")]
pub struct ParseInstanceIdError {
    /// The rejected raw value.
    pub value: String,
    /// Parser failure description.
    pub reason: String,
}
