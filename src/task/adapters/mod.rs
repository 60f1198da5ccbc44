//! Adapter implementations for the task storage ports.

pub mod memory;
pub mod postgres;
