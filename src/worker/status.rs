//! Read-only status snapshot for health and status endpoints.

use super::runner::WorkerPhase;
use crate::task::{
    domain::{InstanceId, TaskStatusCounts},
    ports::{TaskQueue, TaskStoreResult},
};
use chrono::{DateTime, TimeDelta, Utc};
use mockable::Clock;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

/// Point-in-time view of the shared queue and this instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusSnapshot {
    /// Task counts by status across all instances.
    pub counts: TaskStatusCounts,
    /// This instance's identity.
    pub instance_id: InstanceId,
    /// Time since the reporter was created.
    pub uptime: Duration,
    /// Whether this instance's worker loop is running.
    pub worker_running: bool,
    /// Conversations across all tasks.
    pub total_conversations: u64,
    /// Completed tasks per owning instance.
    pub completions_by_instance: BTreeMap<InstanceId, u64>,
    /// Tasks created during the last hour.
    pub tasks_created_last_hour: u64,
}

impl StatusSnapshot {
    /// Returns the number of pending tasks.
    #[must_use]
    pub const fn pending_count(&self) -> u64 {
        self.counts.pending
    }

    /// Returns the number of processing tasks.
    #[must_use]
    pub const fn processing_count(&self) -> u64 {
        self.counts.processing
    }

    /// Returns the number of completed tasks.
    #[must_use]
    pub const fn completed_count(&self) -> u64 {
        self.counts.completed
    }

    /// Returns the number of failed tasks.
    #[must_use]
    pub const fn failed_count(&self) -> u64 {
        self.counts.failed
    }
}

/// Aggregates store counts with instance identity, uptime and liveness.
pub struct StatusReporter<Q, C>
where
    Q: TaskQueue,
    C: Clock + Send + Sync,
{
    queue: Arc<Q>,
    clock: Arc<C>,
    instance_id: InstanceId,
    started_at: DateTime<Utc>,
    liveness: Option<watch::Receiver<WorkerPhase>>,
}

impl<Q, C> StatusReporter<Q, C>
where
    Q: TaskQueue,
    C: Clock + Send + Sync,
{
    /// Creates a reporter whose uptime starts now.
    #[must_use]
    pub fn new(queue: Arc<Q>, clock: Arc<C>, instance_id: InstanceId) -> Self {
        let started_at = clock.utc();
        Self {
            queue,
            clock,
            instance_id,
            started_at,
            liveness: None,
        }
    }

    /// Reports liveness from a worker loop's phase channel.
    #[must_use]
    pub fn with_liveness(mut self, phases: watch::Receiver<WorkerPhase>) -> Self {
        self.liveness = Some(phases);
        self
    }

    /// Reads the current snapshot in one consistent store read. Never
    /// mutates the store.
    ///
    /// # Errors
    ///
    /// Returns the store error when the read fails.
    pub async fn snapshot(&self) -> TaskStoreResult<StatusSnapshot> {
        let now = self.clock.utc();
        let hour_ago = now
            .checked_sub_signed(TimeDelta::hours(1))
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        let stats = self.queue.queue_stats(hour_ago).await?;
        Ok(StatusSnapshot {
            counts: stats.counts,
            instance_id: self.instance_id,
            uptime: self.uptime(),
            worker_running: self.is_worker_running(),
            total_conversations: stats.total_conversations,
            completions_by_instance: stats.completions_by_instance,
            tasks_created_last_hour: stats.created_since,
        })
    }

    /// Time elapsed since the reporter was created.
    #[must_use]
    pub fn uptime(&self) -> Duration {
        self.clock
            .utc()
            .signed_duration_since(self.started_at)
            .to_std()
            .unwrap_or_default()
    }

    /// Whether the observed worker loop is running. `false` when no loop is
    /// attached, or when the loop is gone without having reported
    /// [`WorkerPhase::Stopped`].
    #[must_use]
    pub fn is_worker_running(&self) -> bool {
        self.liveness.as_ref().is_some_and(|phases| {
            phases.has_changed().is_ok() && phases.borrow().is_running()
        })
    }
}
