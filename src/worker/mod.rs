//! Background processing for one service instance.
//!
//! The [`WorkerLoop`] repeatedly claims the oldest pending task through the
//! [`TaskQueue`](crate::task::ports::TaskQueue) port, runs it through a
//! [`TaskExecutor`], and commits the terminal status only while this
//! instance still owns the task. [`StatusReporter`] reads the aggregate
//! state for health endpoints.

mod executor;
mod runner;
mod status;

pub use executor::{SimulatedWorkExecutor, TaskExecutor};
pub use runner::{CycleOutcome, WorkerError, WorkerHandle, WorkerLoop, WorkerPhase};
pub use status::{StatusReporter, StatusSnapshot};
