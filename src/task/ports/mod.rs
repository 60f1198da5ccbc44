//! Port contracts for task storage and claiming.
//!
//! [`TaskRepository`] is the record surface the CRUD layer drives;
//! [`TaskQueue`] is the narrow surface the worker loop and status reporter
//! use. Both are implemented by every adapter against one shared store.

pub mod error;
pub mod queue;
pub mod repository;

pub use error::{TaskStoreError, TaskStoreResult};
pub use queue::TaskQueue;
pub use repository::TaskRepository;

#[cfg(test)]
pub use queue::MockTaskQueue;
