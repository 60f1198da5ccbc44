//! In-memory adapter for the task storage ports.

mod store;

pub use store::InMemoryTaskStore;
