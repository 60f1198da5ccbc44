//! Task execution seam used by the worker loop.

use crate::task::domain::{ExecutionOutcome, Task};
use async_trait::async_trait;
use std::time::Duration;

/// Performs the unit of work for a claimed task.
///
/// Implementations report faults as [`ExecutionOutcome::Failure`]. A panic
/// is also tolerated: the worker loop runs each execution in its own Tokio
/// task and converts an aborted execution into a failure.
///
/// Conversation updates are not written here. A successful outcome carries
/// the conversation status, and the store applies it in the same atomic
/// commit that records the task's terminal status.
#[async_trait]
pub trait TaskExecutor: Send + Sync {
    /// Executes `task` and reports its outcome.
    async fn execute(&self, task: &Task) -> ExecutionOutcome;
}

/// Stand-in executor that waits for a fixed duration and succeeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimulatedWorkExecutor {
    duration: Duration,
}

impl SimulatedWorkExecutor {
    /// Default simulated work duration (6.5 seconds).
    pub const DEFAULT_DURATION: Duration = Duration::from_millis(6_500);

    /// Creates an executor that works for `duration`.
    #[must_use]
    pub const fn new(duration: Duration) -> Self {
        Self { duration }
    }

    /// Returns the simulated work duration.
    #[must_use]
    pub const fn duration(&self) -> Duration {
        self.duration
    }
}

impl Default for SimulatedWorkExecutor {
    fn default() -> Self {
        Self::new(Self::DEFAULT_DURATION)
    }
}

#[async_trait]
impl TaskExecutor for SimulatedWorkExecutor {
    async fn execute(&self, task: &Task) -> ExecutionOutcome {
        tracing::debug!(task_id = %task.id(), duration_ms = self.duration.as_millis(), "simulating work");
        tokio::time::sleep(self.duration).await;
        ExecutionOutcome::Success
    }
}
