//! Task and conversation records shared by every worker instance.
//!
//! Tasks are created `pending` by the record layer and move to `processing`
//! only through an atomic claim. Only the claiming instance may then commit
//! `completed` or `failed`. The module follows hexagonal architecture:
//!
//! - Domain types in [`domain`]
//! - Port contracts in [`ports`]
//! - Adapter implementations in [`adapters`]
//! - Record services in [`services`]

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod services;
