//! `PostgreSQL` record storage for tasks and conversations.

use super::{
    models::{
        ConversationChangeset, ConversationRow, NewConversationRow, NewTaskRow, TaskChangeset,
        TaskRow, row_to_conversation, row_to_task,
    },
    schema::{conversations, tasks},
};
use crate::task::{
    domain::{
        Conversation, ConversationId, ConversationUpdate, NewConversation, NewTask, Task, TaskId,
        TaskStatus, TaskSummary, TaskUpdate,
    },
    ports::{TaskRepository, TaskStoreError, TaskStoreResult},
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::dsl::count;
use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool};
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use std::collections::HashMap;

/// `PostgreSQL` connection pool type used by task adapters.
pub type TaskPgPool = Pool<ConnectionManager<PgConnection>>;

const REQUEUEABLE: [&str; 2] = [
    TaskStatus::Processing.as_str(),
    TaskStatus::Failed.as_str(),
];

/// `PostgreSQL`-backed task store implementing both the record and queue
/// ports.
#[derive(Debug, Clone)]
pub struct PostgresTaskStore {
    pool: TaskPgPool,
}

impl PostgresTaskStore {
    /// Creates a new store from a `PostgreSQL` connection pool.
    #[must_use]
    pub const fn new(pool: TaskPgPool) -> Self {
        Self { pool }
    }

    pub(super) async fn run_blocking<F, T>(&self, f: F) -> TaskStoreResult<T>
    where
        F: FnOnce(&mut PgConnection) -> TaskStoreResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let mut connection = pool.get().map_err(TaskStoreError::persistence)?;
            f(&mut connection)
        })
        .await
        .map_err(TaskStoreError::persistence)?
    }
}

#[async_trait]
impl TaskRepository for PostgresTaskStore {
    async fn create_task(
        &self,
        task: &NewTask,
        now: DateTime<Utc>,
    ) -> TaskStoreResult<(Task, Vec<Conversation>)> {
        let new_task = task.clone();
        let (task_row, conversation_rows) = self
            .run_blocking(move |connection| {
                connection
                    .transaction::<_, DieselError, _>(|tx| {
                        let task_row = diesel::insert_into(tasks::table)
                            .values(NewTaskRow {
                                title: new_task.title.as_str(),
                                description: new_task.description.as_deref(),
                                status: TaskStatus::Pending.as_str(),
                                created_at: now,
                                updated_at: now,
                            })
                            .returning(TaskRow::as_returning())
                            .get_result(tx)?;

                        let rows: Vec<NewConversationRow<'_>> = new_task
                            .conversations
                            .iter()
                            .map(|conversation| NewConversationRow {
                                task_id: task_row.id,
                                content: conversation.content.as_str(),
                                status: conversation.status.as_str(),
                                created_at: now,
                                updated_at: now,
                            })
                            .collect();
                        let conversation_rows = if rows.is_empty() {
                            Vec::new()
                        } else {
                            diesel::insert_into(conversations::table)
                                .values(&rows)
                                .returning(ConversationRow::as_returning())
                                .get_results(tx)?
                        };
                        Ok((task_row, conversation_rows))
                    })
                    .map_err(TaskStoreError::persistence)
            })
            .await?;

        let created = row_to_task(task_row)?;
        let conversations = conversation_rows
            .into_iter()
            .map(row_to_conversation)
            .collect::<TaskStoreResult<Vec<_>>>()?;
        Ok((created, conversations))
    }

    async fn find_task(&self, id: TaskId) -> TaskStoreResult<Option<Task>> {
        self.run_blocking(move |connection| {
            let row = tasks::table
                .find(id.value())
                .select(TaskRow::as_select())
                .first::<TaskRow>(connection)
                .optional()
                .map_err(TaskStoreError::persistence)?;
            row.map(row_to_task).transpose()
        })
        .await
    }

    async fn list_tasks(&self) -> TaskStoreResult<Vec<TaskSummary>> {
        let (rows, counts) = self
            .run_blocking(|connection| {
                let rows = tasks::table
                    .order((tasks::created_at.desc(), tasks::id.desc()))
                    .select(TaskRow::as_select())
                    .load::<TaskRow>(connection)
                    .map_err(TaskStoreError::persistence)?;
                let counts = conversations::table
                    .group_by(conversations::task_id)
                    .select((conversations::task_id, count(conversations::id)))
                    .load::<(i64, i64)>(connection)
                    .map_err(TaskStoreError::persistence)?;
                Ok((rows, counts.into_iter().collect::<HashMap<_, _>>()))
            })
            .await?;

        rows.into_iter()
            .map(|row| {
                let conversation_count = counts.get(&row.id).copied().unwrap_or_default();
                let task = row_to_task(row)?;
                Ok(TaskSummary {
                    id: task.id(),
                    title: task.title().clone(),
                    status: task.status(),
                    created_at: task.created_at(),
                    conversation_count: u64::try_from(conversation_count)
                        .map_err(TaskStoreError::persistence)?,
                })
            })
            .collect()
    }

    async fn update_task(
        &self,
        id: TaskId,
        update: &TaskUpdate,
        now: DateTime<Utc>,
    ) -> TaskStoreResult<Task> {
        let edits = update.clone();
        let row = self
            .run_blocking(move |connection| {
                diesel::update(tasks::table.find(id.value()))
                    .set(TaskChangeset {
                        title: edits.title.as_ref().map(|title| title.as_str()),
                        description: edits.description.as_deref(),
                        updated_at: now,
                    })
                    .returning(TaskRow::as_returning())
                    .get_result::<TaskRow>(connection)
                    .optional()
                    .map_err(TaskStoreError::persistence)
            })
            .await?;
        row.map_or(Err(TaskStoreError::TaskNotFound(id)), row_to_task)
    }

    async fn delete_task(&self, id: TaskId) -> TaskStoreResult<()> {
        let deleted = self
            .run_blocking(move |connection| {
                diesel::delete(tasks::table.find(id.value()))
                    .execute(connection)
                    .map_err(TaskStoreError::persistence)
            })
            .await?;
        if deleted == 0 {
            return Err(TaskStoreError::TaskNotFound(id));
        }
        Ok(())
    }

    async fn add_conversation(
        &self,
        task_id: TaskId,
        conversation: &NewConversation,
        now: DateTime<Utc>,
    ) -> TaskStoreResult<Conversation> {
        let new_conversation = conversation.clone();
        let row = self
            .run_blocking(move |connection| {
                diesel::insert_into(conversations::table)
                    .values(NewConversationRow {
                        task_id: task_id.value(),
                        content: new_conversation.content.as_str(),
                        status: new_conversation.status.as_str(),
                        created_at: now,
                        updated_at: now,
                    })
                    .returning(ConversationRow::as_returning())
                    .get_result::<ConversationRow>(connection)
                    .map_err(|err| match err {
                        DieselError::DatabaseError(DatabaseErrorKind::ForeignKeyViolation, _) => {
                            TaskStoreError::TaskNotFound(task_id)
                        }
                        _ => TaskStoreError::persistence(err),
                    })
            })
            .await?;
        row_to_conversation(row)
    }

    async fn list_conversations(&self, task_id: TaskId) -> TaskStoreResult<Vec<Conversation>> {
        let rows = self
            .run_blocking(move |connection| {
                ensure_task_exists(connection, task_id)?;
                conversations::table
                    .filter(conversations::task_id.eq(task_id.value()))
                    .order((conversations::created_at.asc(), conversations::id.asc()))
                    .select(ConversationRow::as_select())
                    .load::<ConversationRow>(connection)
                    .map_err(TaskStoreError::persistence)
            })
            .await?;
        rows.into_iter().map(row_to_conversation).collect()
    }

    async fn update_conversation(
        &self,
        id: ConversationId,
        update: &ConversationUpdate,
        now: DateTime<Utc>,
    ) -> TaskStoreResult<Conversation> {
        let edits = update.clone();
        let row = self
            .run_blocking(move |connection| {
                diesel::update(conversations::table.find(id.value()))
                    .set(ConversationChangeset {
                        content: edits.content.as_ref().map(|content| content.as_str()),
                        status: edits.status.map(|status| status.as_str()),
                        updated_at: now,
                    })
                    .returning(ConversationRow::as_returning())
                    .get_result::<ConversationRow>(connection)
                    .optional()
                    .map_err(TaskStoreError::persistence)
            })
            .await?;
        row.map_or(
            Err(TaskStoreError::ConversationNotFound(id)),
            row_to_conversation,
        )
    }

    async fn requeue(&self, id: TaskId, now: DateTime<Utc>) -> TaskStoreResult<bool> {
        self.run_blocking(move |connection| {
            ensure_task_exists(connection, id)?;
            let updated = diesel::update(
                tasks::table
                    .find(id.value())
                    .filter(tasks::status.eq_any(REQUEUEABLE)),
            )
            .set((
                tasks::status.eq(TaskStatus::Pending.as_str()),
                tasks::processing_instance_id.eq(None::<String>),
                tasks::processed_at.eq(None::<DateTime<Utc>>),
                tasks::updated_at.eq(now),
            ))
            .execute(connection)
            .map_err(TaskStoreError::persistence)?;
            Ok(updated == 1)
        })
        .await
    }

    async fn requeue_stalled(
        &self,
        stale_before: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> TaskStoreResult<Vec<TaskId>> {
        let ids = self
            .run_blocking(move |connection| {
                diesel::update(
                    tasks::table
                        .filter(tasks::status.eq(TaskStatus::Processing.as_str()))
                        .filter(tasks::updated_at.lt(stale_before)),
                )
                .set((
                    tasks::status.eq(TaskStatus::Pending.as_str()),
                    tasks::processing_instance_id.eq(None::<String>),
                    tasks::processed_at.eq(None::<DateTime<Utc>>),
                    tasks::updated_at.eq(now),
                ))
                .returning(tasks::id)
                .get_results::<i64>(connection)
                .map_err(TaskStoreError::persistence)
            })
            .await?;
        let mut requeued: Vec<TaskId> = ids.into_iter().map(TaskId::from_raw).collect();
        requeued.sort();
        Ok(requeued)
    }
}

fn ensure_task_exists(connection: &mut PgConnection, id: TaskId) -> TaskStoreResult<()> {
    let found = tasks::table
        .find(id.value())
        .select(tasks::id)
        .first::<i64>(connection)
        .optional()
        .map_err(TaskStoreError::persistence)?;
    found.map(|_| ()).ok_or(TaskStoreError::TaskNotFound(id))
}
