//! Diesel row models for task and conversation persistence.

use super::schema::{conversations, tasks};
use crate::task::{
    domain::{
        Conversation, ConversationContent, ConversationId, ConversationStatus, InstanceId,
        PersistedConversationData, PersistedTaskData, Task, TaskId, TaskStatus, TaskTitle,
    },
    ports::{TaskStoreError, TaskStoreResult},
};
use chrono::{DateTime, Utc};
use diesel::prelude::*;

/// Query result row for task records.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = tasks)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct TaskRow {
    /// Task identifier.
    pub id: i64,
    /// Task title.
    pub title: String,
    /// Optional description.
    pub description: Option<String>,
    /// Lifecycle status.
    pub status: String,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last transition timestamp.
    pub updated_at: DateTime<Utc>,
    /// Terminal transition timestamp.
    pub processed_at: Option<DateTime<Utc>>,
    /// Owning instance.
    pub processing_instance_id: Option<String>,
}

/// Insert model for task records. Identifier and ownership are left to the
/// database.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = tasks)]
pub struct NewTaskRow<'a> {
    /// Task title.
    pub title: &'a str,
    /// Optional description.
    pub description: Option<&'a str>,
    /// Lifecycle status, always `pending` on insert.
    pub status: &'a str,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last transition timestamp.
    pub updated_at: DateTime<Utc>,
}

/// Descriptive edits applied by the record layer.
#[derive(Debug, Clone, AsChangeset)]
#[diesel(table_name = tasks)]
pub struct TaskChangeset<'a> {
    /// Replacement title.
    pub title: Option<&'a str>,
    /// Replacement description.
    pub description: Option<&'a str>,
    /// Edit timestamp.
    pub updated_at: DateTime<Utc>,
}

/// Query result row for conversation records.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = conversations)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct ConversationRow {
    /// Conversation identifier.
    pub id: i64,
    /// Owning task.
    pub task_id: i64,
    /// Payload.
    pub content: String,
    /// Status.
    pub status: String,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

/// Insert model for conversation records.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = conversations)]
pub struct NewConversationRow<'a> {
    /// Owning task.
    pub task_id: i64,
    /// Payload.
    pub content: &'a str,
    /// Initial status.
    pub status: &'a str,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

/// Record-layer edits applied to a conversation.
#[derive(Debug, Clone, AsChangeset)]
#[diesel(table_name = conversations)]
pub struct ConversationChangeset<'a> {
    /// Replacement content.
    pub content: Option<&'a str>,
    /// Replacement status.
    pub status: Option<&'a str>,
    /// Edit timestamp.
    pub updated_at: DateTime<Utc>,
}

pub(super) fn row_to_task(row: TaskRow) -> TaskStoreResult<Task> {
    let TaskRow {
        id,
        title,
        description,
        status,
        created_at,
        updated_at,
        processed_at,
        processing_instance_id,
    } = row;

    let data = PersistedTaskData {
        id: TaskId::from_raw(id),
        title: TaskTitle::new(title).map_err(TaskStoreError::persistence)?,
        description,
        status: TaskStatus::try_from(status.as_str()).map_err(TaskStoreError::persistence)?,
        created_at,
        updated_at,
        processed_at,
        processing_instance_id: processing_instance_id
            .as_deref()
            .map(InstanceId::parse)
            .transpose()
            .map_err(TaskStoreError::persistence)?,
    };
    Ok(Task::from_persisted(data))
}

pub(super) fn row_to_conversation(row: ConversationRow) -> TaskStoreResult<Conversation> {
    let data = PersistedConversationData {
        id: ConversationId::from_raw(row.id),
        task_id: TaskId::from_raw(row.task_id),
        content: ConversationContent::new(row.content).map_err(TaskStoreError::persistence)?,
        status: ConversationStatus::try_from(row.status.as_str())
            .map_err(TaskStoreError::persistence)?,
        created_at: row.created_at,
        updated_at: row.updated_at,
    };
    Ok(Conversation::from_persisted(data))
}
