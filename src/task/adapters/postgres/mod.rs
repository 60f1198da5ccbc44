//! `PostgreSQL` adapters for task persistence and the claim protocol.

mod models;
mod queue;
mod repository;
mod schema;

pub use repository::{PostgresTaskStore, TaskPgPool};

use crate::task::ports::{TaskStoreError, TaskStoreResult};
use diesel::connection::SimpleConnection;

const SCHEMA_SQL: &str = include_str!(
    "../../../../migrations/2026-10-16-000000_create_tasks_and_conversations/up.sql"
);

/// Creates the task and conversation tables if they do not already exist.
///
/// # Errors
///
/// Returns [`TaskStoreError::Persistence`] when no connection can be taken
/// from the pool or the schema statements fail.
pub async fn ensure_schema(pool: &TaskPgPool) -> TaskStoreResult<()> {
    let shared = pool.clone();
    tokio::task::spawn_blocking(move || {
        let mut connection = shared.get().map_err(TaskStoreError::persistence)?;
        connection
            .batch_execute(SCHEMA_SQL)
            .map_err(TaskStoreError::persistence)
    })
    .await
    .map_err(TaskStoreError::persistence)?
}
