//! Polling worker loop: claim, execute, commit, sleep.

use super::executor::TaskExecutor;
use crate::task::{
    domain::{ExecutionOutcome, InstanceId, Task, TaskId, TaskStatus},
    ports::{TaskQueue, TaskStoreResult},
};
use mockable::Clock;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{Mutex, watch};
use tokio::task::{JoinError, JoinHandle};
use tracing::{debug, error, info, warn};

/// Phase published by a worker loop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum WorkerPhase {
    /// Between cycles, sleeping or about to claim.
    #[default]
    Idle,
    /// Claiming the next pending task.
    Claiming,
    /// Executing a claimed task.
    Executing,
    /// Committing the terminal status of the executed task.
    Committing,
    /// The loop has exited.
    Stopped,
}

impl WorkerPhase {
    /// Returns whether the loop is still running.
    #[must_use]
    pub const fn is_running(self) -> bool {
        !matches!(self, Self::Stopped)
    }
}

/// Result of one claim-execute-commit cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Nothing was claimable.
    NoTask,
    /// The task was executed and its terminal status committed.
    Committed {
        /// The processed task.
        task_id: TaskId,
        /// The committed terminal status.
        status: TaskStatus,
    },
    /// The task was executed but this instance no longer owned it, so the
    /// result was discarded.
    Superseded {
        /// The executed task.
        task_id: TaskId,
    },
}

/// Errors returned when stopping a spawned worker.
#[derive(Debug, Error)]
pub enum WorkerError {
    /// The worker task panicked or was cancelled.
    #[error("worker task did not finish cleanly: {0}")]
    Join(#[from] JoinError),
}

/// One instance's worker loop.
///
/// Processes a single task at a time. All coordination with other instances
/// goes through the [`TaskQueue`]; the loop keeps no shared in-memory state.
pub struct WorkerLoop<Q, E, C>
where
    Q: TaskQueue + 'static,
    E: TaskExecutor + 'static,
    C: Clock + Send + Sync + 'static,
{
    queue: Arc<Q>,
    executor: Arc<E>,
    clock: Arc<C>,
    instance_id: InstanceId,
    poll_interval: Duration,
    phase: watch::Sender<WorkerPhase>,
    unsettled: Mutex<Option<(TaskId, ExecutionOutcome)>>,
}

impl<Q, E, C> WorkerLoop<Q, E, C>
where
    Q: TaskQueue + 'static,
    E: TaskExecutor + 'static,
    C: Clock + Send + Sync + 'static,
{
    /// Creates a worker loop for `instance_id`.
    #[must_use]
    pub fn new(
        queue: Arc<Q>,
        executor: Arc<E>,
        clock: Arc<C>,
        instance_id: InstanceId,
        poll_interval: Duration,
    ) -> Self {
        let (phase, _) = watch::channel(WorkerPhase::Idle);
        Self {
            queue,
            executor,
            clock,
            instance_id,
            poll_interval,
            phase,
            unsettled: Mutex::new(None),
        }
    }

    /// Returns the identity this loop claims and commits under.
    #[must_use]
    pub const fn instance_id(&self) -> InstanceId {
        self.instance_id
    }

    /// Subscribes to phase changes.
    #[must_use]
    pub fn phases(&self) -> watch::Receiver<WorkerPhase> {
        self.phase.subscribe()
    }

    /// Runs one claim-execute-commit cycle and returns to [`WorkerPhase::Idle`].
    ///
    /// Execution faults become a `failed` commit and an ownership mismatch
    /// is reported as [`CycleOutcome::Superseded`]; neither is an error.
    /// A result whose commit failed is kept and committed by the next cycle
    /// before anything new is claimed.
    ///
    /// # Errors
    ///
    /// Returns the store error when the claim or commit transaction fails.
    /// Nothing is partially written in that case.
    pub async fn run_cycle(&self) -> TaskStoreResult<CycleOutcome> {
        let outcome = self.process_next().await;
        self.publish(WorkerPhase::Idle);
        outcome
    }

    /// Runs cycles until `shutdown` becomes `true` or its sender is dropped.
    ///
    /// The flag is checked at the top of each cycle and interrupts the idle
    /// sleep. An execution in flight is always committed first.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        info!(instance_id = %self.instance_id, "worker loop started");
        loop {
            if *shutdown.borrow_and_update() {
                break;
            }
            match self.run_cycle().await {
                Ok(CycleOutcome::NoTask) => debug!("no pending task"),
                Ok(_) => {}
                Err(err) => error!(
                    instance_id = %self.instance_id,
                    error = %err,
                    "worker cycle aborted; retrying after poll interval"
                ),
            }
            tokio::select! {
                () = tokio::time::sleep(self.poll_interval) => {}
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }
        if let Err(err) = self.retry_unsettled().await {
            error!(
                instance_id = %self.instance_id,
                error = %err,
                "result still uncommitted at shutdown; task stays processing"
            );
        }
        self.publish(WorkerPhase::Stopped);
        info!(instance_id = %self.instance_id, "worker loop stopped");
    }

    /// Spawns the loop onto the Tokio runtime.
    #[must_use]
    pub fn spawn(self) -> WorkerHandle {
        let (stop, shutdown) = watch::channel(false);
        let phase = self.phases();
        let join = tokio::spawn(async move { self.run(shutdown).await });
        WorkerHandle { stop, phase, join }
    }

    async fn process_next(&self) -> TaskStoreResult<CycleOutcome> {
        if let Some(retried) = self.retry_unsettled().await? {
            return Ok(retried);
        }

        self.publish(WorkerPhase::Claiming);
        let Some(task) = self
            .queue
            .claim_next(&self.instance_id, self.clock.utc())
            .await?
        else {
            return Ok(CycleOutcome::NoTask);
        };
        let task_id = task.id();
        info!(task_id = %task_id, instance_id = %self.instance_id, "claimed task");

        self.publish(WorkerPhase::Executing);
        let outcome = self.execute(task).await;
        if let ExecutionOutcome::Failure(reason) = &outcome {
            warn!(task_id = %task_id, error = %reason, "task execution failed");
        }

        self.commit(task_id, outcome).await
    }

    /// Commits a result left over from a failed commit, if any.
    async fn retry_unsettled(&self) -> TaskStoreResult<Option<CycleOutcome>> {
        let Some((task_id, outcome)) = self.unsettled.lock().await.take() else {
            return Ok(None);
        };
        info!(task_id = %task_id, "retrying uncommitted result");
        self.commit(task_id, outcome).await.map(Some)
    }

    async fn commit(
        &self,
        task_id: TaskId,
        outcome: ExecutionOutcome,
    ) -> TaskStoreResult<CycleOutcome> {
        self.publish(WorkerPhase::Committing);
        let committed = match self
            .queue
            .commit_terminal(task_id, &self.instance_id, &outcome, self.clock.utc())
            .await
        {
            Ok(committed) => committed,
            Err(err) => {
                *self.unsettled.lock().await = Some((task_id, outcome));
                return Err(err);
            }
        };
        if !committed {
            warn!(
                task_id = %task_id,
                instance_id = %self.instance_id,
                "task no longer owned by this instance; result discarded"
            );
            return Ok(CycleOutcome::Superseded { task_id });
        }

        let status = outcome.terminal_status();
        info!(task_id = %task_id, status = %status, "task committed");
        Ok(CycleOutcome::Committed { task_id, status })
    }

    async fn execute(&self, task: Task) -> ExecutionOutcome {
        let executor = Arc::clone(&self.executor);
        match tokio::spawn(async move { executor.execute(&task).await }).await {
            Ok(outcome) => outcome,
            Err(err) => ExecutionOutcome::failure(format!("execution aborted: {err}")),
        }
    }

    fn publish(&self, next: WorkerPhase) {
        self.phase.send_modify(|current| *current = next);
    }
}

/// Handle to a spawned worker loop.
#[derive(Debug)]
pub struct WorkerHandle {
    stop: watch::Sender<bool>,
    phase: watch::Receiver<WorkerPhase>,
    join: JoinHandle<()>,
}

impl WorkerHandle {
    /// Returns the loop's current phase.
    #[must_use]
    pub fn phase(&self) -> WorkerPhase {
        *self.phase.borrow()
    }

    /// Subscribes to phase changes, for liveness reporting.
    #[must_use]
    pub fn phases(&self) -> watch::Receiver<WorkerPhase> {
        self.phase.clone()
    }

    /// Signals shutdown and waits for the loop to exit.
    ///
    /// # Errors
    ///
    /// Returns [`WorkerError::Join`] when the loop task panicked.
    pub async fn stop(self) -> Result<(), WorkerError> {
        if self.stop.send(true).is_err() {
            debug!("worker loop already exited");
        }
        self.join.await?;
        Ok(())
    }
}
