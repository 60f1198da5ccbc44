//! `PostgreSQL` claim and commit protocol.
//!
//! Both operations are single transactions. The claim takes a row lock with
//! `FOR UPDATE SKIP LOCKED` so concurrent claimants pass over each other's
//! candidates instead of blocking, and the lock is released when the
//! transaction commits. The terminal commit is a conditional update keyed on
//! the owning instance. Status aggregates share one read-only snapshot
//! transaction so the figures agree with each other.

use super::{
    models::{TaskRow, row_to_task},
    repository::PostgresTaskStore,
    schema::{conversations, tasks},
};
use crate::task::{
    domain::{
        ExecutionOutcome, InstanceId, QueueStats, Task, TaskId, TaskStatus, TaskStatusCounts,
    },
    ports::{TaskQueue, TaskStoreError, TaskStoreResult},
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::dsl::count;
use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::result::Error as DieselError;
use std::collections::BTreeMap;

#[async_trait]
impl TaskQueue for PostgresTaskStore {
    async fn claim_next(
        &self,
        instance_id: &InstanceId,
        now: DateTime<Utc>,
    ) -> TaskStoreResult<Option<Task>> {
        let owner = instance_id.to_persisted();
        let claimed = self
            .run_blocking(move |connection| {
                connection
                    .transaction::<_, DieselError, _>(|tx| {
                        let candidate = tasks::table
                            .filter(tasks::status.eq(TaskStatus::Pending.as_str()))
                            .order((tasks::created_at.asc(), tasks::id.asc()))
                            .select(tasks::id)
                            .limit(1)
                            .for_update()
                            .skip_locked()
                            .get_result::<i64>(tx)
                            .optional()?;
                        let Some(task_id) = candidate else {
                            return Ok(None);
                        };

                        diesel::update(tasks::table.find(task_id))
                            .set((
                                tasks::status.eq(TaskStatus::Processing.as_str()),
                                tasks::processing_instance_id.eq(Some(owner.as_str())),
                                tasks::updated_at.eq(now),
                            ))
                            .returning(TaskRow::as_returning())
                            .get_result::<TaskRow>(tx)
                            .map(Some)
                    })
                    .map_err(TaskStoreError::persistence)
            })
            .await?;
        claimed.map(row_to_task).transpose()
    }

    async fn commit_terminal(
        &self,
        task_id: TaskId,
        instance_id: &InstanceId,
        outcome: &ExecutionOutcome,
        now: DateTime<Utc>,
    ) -> TaskStoreResult<bool> {
        let owner = instance_id.to_persisted();
        let terminal = outcome.terminal_status();
        let conversation_status = outcome.conversation_status();
        self.run_blocking(move |connection| {
            connection
                .transaction::<_, DieselError, _>(|tx| {
                    let updated = diesel::update(
                        tasks::table
                            .find(task_id.value())
                            .filter(tasks::processing_instance_id.eq(owner.as_str()))
                            .filter(tasks::status.eq(TaskStatus::Processing.as_str())),
                    )
                    .set((
                        tasks::status.eq(terminal.as_str()),
                        tasks::processed_at.eq(Some(now)),
                        tasks::updated_at.eq(now),
                    ))
                    .execute(tx)?;
                    if updated != 1 {
                        return Ok(false);
                    }

                    if let Some(status) = conversation_status {
                        diesel::update(
                            conversations::table
                                .filter(conversations::task_id.eq(task_id.value())),
                        )
                        .set((
                            conversations::status.eq(status.as_str()),
                            conversations::updated_at.eq(now),
                        ))
                        .execute(tx)?;
                    }
                    Ok(true)
                })
                .map_err(TaskStoreError::persistence)
        })
        .await
    }

    async fn status_counts(&self) -> TaskStoreResult<TaskStatusCounts> {
        let rows = self
            .run_blocking(|connection| {
                load_status_rows(connection).map_err(TaskStoreError::persistence)
            })
            .await?;
        counts_from_rows(rows)
    }

    async fn conversation_total(&self) -> TaskStoreResult<u64> {
        let total = self
            .run_blocking(|connection| {
                count_conversations(connection).map_err(TaskStoreError::persistence)
            })
            .await?;
        to_count(total)
    }

    async fn completions_by_instance(&self) -> TaskStoreResult<BTreeMap<InstanceId, u64>> {
        let rows = self
            .run_blocking(|connection| {
                load_completion_rows(connection).map_err(TaskStoreError::persistence)
            })
            .await?;
        completions_from_rows(rows)
    }

    async fn queue_stats(&self, created_since: DateTime<Utc>) -> TaskStoreResult<QueueStats> {
        let (status_rows, conversations, completion_rows, recent) = self
            .run_blocking(move |connection| {
                connection
                    .build_transaction()
                    .read_only()
                    .repeatable_read()
                    .run::<_, DieselError, _>(|tx| {
                        Ok((
                            load_status_rows(tx)?,
                            count_conversations(tx)?,
                            load_completion_rows(tx)?,
                            tasks::table
                                .filter(tasks::created_at.gt(created_since))
                                .count()
                                .get_result::<i64>(tx)?,
                        ))
                    })
                    .map_err(TaskStoreError::persistence)
            })
            .await?;

        Ok(QueueStats {
            counts: counts_from_rows(status_rows)?,
            total_conversations: to_count(conversations)?,
            completions_by_instance: completions_from_rows(completion_rows)?,
            created_since: to_count(recent)?,
        })
    }
}

fn load_status_rows(connection: &mut PgConnection) -> Result<Vec<(String, i64)>, DieselError> {
    tasks::table
        .group_by(tasks::status)
        .select((tasks::status, count(tasks::id)))
        .load::<(String, i64)>(connection)
}

fn count_conversations(connection: &mut PgConnection) -> Result<i64, DieselError> {
    conversations::table.count().get_result::<i64>(connection)
}

fn load_completion_rows(
    connection: &mut PgConnection,
) -> Result<Vec<(Option<String>, i64)>, DieselError> {
    tasks::table
        .filter(tasks::status.eq(TaskStatus::Completed.as_str()))
        .filter(tasks::processing_instance_id.is_not_null())
        .group_by(tasks::processing_instance_id)
        .select((tasks::processing_instance_id, count(tasks::id)))
        .load::<(Option<String>, i64)>(connection)
}

fn to_count(total: i64) -> TaskStoreResult<u64> {
    u64::try_from(total).map_err(TaskStoreError::persistence)
}

fn counts_from_rows(rows: Vec<(String, i64)>) -> TaskStoreResult<TaskStatusCounts> {
    let mut counts = TaskStatusCounts::default();
    for (status, total) in rows {
        let parsed = TaskStatus::try_from(status.as_str()).map_err(TaskStoreError::persistence)?;
        counts.record(parsed, to_count(total)?);
    }
    Ok(counts)
}

fn completions_from_rows(
    rows: Vec<(Option<String>, i64)>,
) -> TaskStoreResult<BTreeMap<InstanceId, u64>> {
    let mut completions = BTreeMap::new();
    for (owner, total) in rows {
        let Some(raw) = owner else {
            continue;
        };
        let instance_id = InstanceId::parse(&raw).map_err(TaskStoreError::persistence)?;
        completions.insert(instance_id, to_count(total)?);
    }
    Ok(completions)
}
