//! Result of executing a claimed task.

use super::{ConversationStatus, TaskStatus};

/// What an executor reports for one claimed task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionOutcome {
    /// The work finished; the task completes and its conversations are
    /// marked processed.
    Success,
    /// The work failed. The reason is logged, never persisted.
    Failure(String),
}

impl ExecutionOutcome {
    /// Builds a failure outcome.
    #[must_use]
    pub fn failure(reason: impl Into<String>) -> Self {
        Self::Failure(reason.into())
    }

    /// Terminal status committed for this outcome.
    #[must_use]
    pub const fn terminal_status(&self) -> TaskStatus {
        match self {
            Self::Success => TaskStatus::Completed,
            Self::Failure(_) => TaskStatus::Failed,
        }
    }

    /// Status written to the task's conversations on commit, if any.
    #[must_use]
    pub const fn conversation_status(&self) -> Option<ConversationStatus> {
        match self {
            Self::Success => Some(ConversationStatus::Processed),
            Self::Failure(_) => None,
        }
    }

    /// Returns `true` for [`Self::Success`].
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }
}
