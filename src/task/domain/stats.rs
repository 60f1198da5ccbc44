//! Aggregate queue statistics read in one consistent pass.

use super::{InstanceId, TaskStatusCounts};
use std::collections::BTreeMap;

/// Store-wide aggregates behind a status snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueueStats {
    /// Task counts by status.
    pub counts: TaskStatusCounts,
    /// Conversations across all tasks.
    pub total_conversations: u64,
    /// Completed tasks per owning instance.
    pub completions_by_instance: BTreeMap<InstanceId, u64>,
    /// Tasks created after the requested cut-off.
    pub created_since: u64,
}
