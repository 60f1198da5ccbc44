//! Step definitions for task claiming scenarios.

mod given;
mod when;
pub mod world;
