//! `foreman`: one worker instance claiming tasks from the shared store.
//!
//! Settings come from `FOREMAN_*` environment variables (see
//! [`foreman::config`]). The instance identity is generated at start-up and
//! lives only as long as the process.

use diesel::pg::PgConnection;
use diesel::r2d2::{ConnectionManager, Pool};
use foreman::config::Settings;
use foreman::task::adapters::postgres::{PostgresTaskStore, TaskPgPool, ensure_schema};
use foreman::task::domain::InstanceId;
use foreman::task::ports::TaskQueue;
use foreman::telemetry;
use foreman::worker::{SimulatedWorkExecutor, StatusReporter, WorkerLoop};
use mockable::{Clock, DefaultClock};
use std::sync::Arc;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let settings = Settings::from_env()?;
    telemetry::init(&settings.log_filter)?;

    let pool = connect(&settings).await?;
    ensure_schema(&pool).await?;

    let instance_id = InstanceId::generate();
    info!(
        instance_id = %instance_id,
        poll_interval_secs = settings.poll_interval.as_secs(),
        work_duration_ms = settings.work_duration.as_millis(),
        "starting worker instance"
    );

    let store = Arc::new(PostgresTaskStore::new(pool));
    let clock = Arc::new(DefaultClock);
    let worker = WorkerLoop::new(
        Arc::clone(&store),
        Arc::new(SimulatedWorkExecutor::new(settings.work_duration)),
        Arc::clone(&clock),
        instance_id,
        settings.poll_interval,
    );
    let reporter = StatusReporter::new(store, clock, instance_id).with_liveness(worker.phases());
    let handle = worker.spawn();
    log_snapshot(&reporter).await;

    tokio::signal::ctrl_c().await?;
    info!("shutdown requested; waiting for the current task to commit");
    handle.stop().await?;
    log_snapshot(&reporter).await;
    Ok(())
}

async fn connect(settings: &Settings) -> Result<TaskPgPool, Box<dyn std::error::Error>> {
    let manager = ConnectionManager::<PgConnection>::new(settings.database_url.as_str());
    let max_size = settings.db_pool_size;
    let pool = tokio::task::spawn_blocking(move || Pool::builder().max_size(max_size).build(manager))
        .await??;
    Ok(pool)
}

async fn log_snapshot<Q, C>(reporter: &StatusReporter<Q, C>)
where
    Q: TaskQueue,
    C: Clock + Send + Sync,
{
    match reporter.snapshot().await {
        Ok(snapshot) => match serde_json::to_string(&snapshot) {
            Ok(rendered) => info!(snapshot = %rendered, "status snapshot"),
            Err(err) => error!(error = %err, "failed to render status snapshot"),
        },
        Err(err) => error!(error = %err, "failed to read status snapshot"),
    }
}
