//! Conversation records owned by a task.

use super::{ConversationId, ParseConversationStatusError, TaskDomainError, TaskId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Conversation status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversationStatus {
    /// Created and untouched by processing.
    #[default]
    Active,
    /// Updated by the executor when its task completed.
    Processed,
    /// Retired by the record layer.
    Archived,
}

impl ConversationStatus {
    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Processed => "processed",
            Self::Archived => "archived",
        }
    }
}

impl fmt::Display for ConversationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for ConversationStatus {
    type Error = ParseConversationStatusError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_ascii_lowercase().as_str() {
            "active" => Ok(Self::Active),
            "processed" => Ok(Self::Processed),
            "archived" => Ok(Self::Archived),
            _ => Err(ParseConversationStatusError(value.to_owned())),
        }
    }
}

/// Validated, non-empty conversation payload.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConversationContent(String);

impl ConversationContent {
    /// Creates validated content. The payload is kept verbatim.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::EmptyConversationContent`] when the value
    /// is blank.
    pub fn new(value: impl Into<String>) -> Result<Self, TaskDomainError> {
        let content = value.into();
        if content.trim().is_empty() {
            return Err(TaskDomainError::EmptyConversationContent);
        }
        Ok(Self(content))
    }

    /// Returns the content as `str`.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Conversation belonging to a task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversation {
    id: ConversationId,
    task_id: TaskId,
    content: ConversationContent,
    status: ConversationStatus,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// Parameter object for reconstructing a persisted conversation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedConversationData {
    /// Persisted conversation identifier.
    pub id: ConversationId,
    /// Owning task.
    pub task_id: TaskId,
    /// Persisted content.
    pub content: ConversationContent,
    /// Persisted status.
    pub status: ConversationStatus,
    /// Persisted creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Persisted last update timestamp.
    pub updated_at: DateTime<Utc>,
}

impl Conversation {
    /// Creates a conversation as the store assigns it an identifier.
    #[must_use]
    pub fn created(
        id: ConversationId,
        task_id: TaskId,
        new_conversation: &NewConversation,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            task_id,
            content: new_conversation.content.clone(),
            status: new_conversation.status,
            created_at: now,
            updated_at: now,
        }
    }

    /// Reconstructs a conversation from persisted storage.
    #[must_use]
    pub fn from_persisted(data: PersistedConversationData) -> Self {
        Self {
            id: data.id,
            task_id: data.task_id,
            content: data.content,
            status: data.status,
            created_at: data.created_at,
            updated_at: data.updated_at,
        }
    }

    /// Returns the conversation identifier.
    #[must_use]
    pub const fn id(&self) -> ConversationId {
        self.id
    }

    /// Returns the owning task.
    #[must_use]
    pub const fn task_id(&self) -> TaskId {
        self.task_id
    }

    /// Returns the content.
    #[must_use]
    pub const fn content(&self) -> &ConversationContent {
        &self.content
    }

    /// Returns the status.
    #[must_use]
    pub const fn status(&self) -> ConversationStatus {
        self.status
    }

    /// Returns the creation timestamp.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns the last update timestamp.
    #[must_use]
    pub const fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Sets the status as part of task processing.
    pub const fn mark(&mut self, status: ConversationStatus, now: DateTime<Utc>) {
        self.status = status;
        self.updated_at = now;
    }

    /// Applies record-layer edits.
    pub fn apply_update(&mut self, update: &ConversationUpdate, now: DateTime<Utc>) {
        if let Some(content) = &update.content {
            self.content = content.clone();
        }
        if let Some(status) = update.status {
            self.status = status;
        }
        self.updated_at = now;
    }
}

/// Validated input for creating a conversation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewConversation {
    /// Conversation payload.
    pub content: ConversationContent,
    /// Initial status.
    pub status: ConversationStatus,
}

/// Fields the record layer may edit on a conversation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConversationUpdate {
    /// Replacement content.
    pub content: Option<ConversationContent>,
    /// Replacement status.
    pub status: Option<ConversationStatus>,
}
