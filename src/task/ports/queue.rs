//! Claim and commit port used by worker instances.

use super::TaskStoreResult;
use crate::task::domain::{
    ExecutionOutcome, InstanceId, QueueStats, Task, TaskId, TaskStatusCounts,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

/// Shared work queue contract.
///
/// Implementations must make [`claim_next`](Self::claim_next) and
/// [`commit_terminal`](Self::commit_terminal) single atomic operations
/// against the shared store. Neither may be built from a separate read
/// followed by a write.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TaskQueue: Send + Sync {
    /// Claims the oldest pending task for `instance_id`.
    ///
    /// Candidates are scanned by `created_at`, then `id`. A candidate locked
    /// by a concurrent claimant is skipped, never waited on. The claimed task
    /// is returned already in `processing`, stamped with `instance_id` and
    /// `updated_at = now`. Returns `None` when nothing is claimable.
    async fn claim_next(
        &self,
        instance_id: &InstanceId,
        now: DateTime<Utc>,
    ) -> TaskStoreResult<Option<Task>>;

    /// Commits the terminal status for `outcome` if `instance_id` still owns
    /// the task in `processing`.
    ///
    /// On success the task's `processed_at` and `updated_at` become `now`,
    /// and a [`ExecutionOutcome::Success`] also marks every conversation of
    /// the task processed, in the same atomic unit. Returns `false` without
    /// changing anything when ownership no longer holds.
    async fn commit_terminal(
        &self,
        task_id: TaskId,
        instance_id: &InstanceId,
        outcome: &ExecutionOutcome,
        now: DateTime<Utc>,
    ) -> TaskStoreResult<bool>;

    /// Counts tasks by status.
    async fn status_counts(&self) -> TaskStoreResult<TaskStatusCounts>;

    /// Counts every stored conversation.
    async fn conversation_total(&self) -> TaskStoreResult<u64>;

    /// Counts completed tasks per owning instance.
    async fn completions_by_instance(&self) -> TaskStoreResult<BTreeMap<InstanceId, u64>>;

    /// Reads status counts, the conversation total, per-instance completions
    /// and the number of tasks created after `created_since` as one
    /// consistent view of the store.
    async fn queue_stats(&self, created_since: DateTime<Utc>) -> TaskStoreResult<QueueStats>;
}
