//! Foreman: distributed task claiming over a shared transactional store.
//!
//! Independent worker instances pull pending tasks from one shared store,
//! mark ownership, execute the work, and commit a terminal result. Each task
//! is processed by exactly one instance at a time, and instances never wait
//! on each other.
//!
//! # Architecture
//!
//! Foreman follows hexagonal architecture principles:
//!
//! - **Domain**: Task, conversation and ownership rules with no storage
//!   dependencies
//! - **Ports**: The record and claim-queue contracts
//! - **Adapters**: `PostgreSQL` (Diesel) and in-memory stores
//!
//! # Modules
//!
//! - [`task`]: Task and conversation records and the claim protocol
//! - [`worker`]: The per-instance worker loop and status reporting
//! - [`config`]: Environment settings
//! - [`telemetry`]: Tracing subscriber set-up

pub mod config;
pub mod task;
pub mod telemetry;
pub mod worker;
