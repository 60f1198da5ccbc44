//! When steps for task claiming BDD scenarios.

use super::world::{ClaimWorld, run_async};
use eyre::WrapErr;
use foreman::task::{
    domain::ExecutionOutcome,
    ports::{TaskQueue, TaskRepository},
};
use mockable::{Clock, DefaultClock};
use rstest_bdd_macros::when;

fn commit(
    world: &mut ClaimWorld,
    name: &str,
    title: &str,
    outcome: &ExecutionOutcome,
) -> Result<(), eyre::Report> {
    let instance_id = world.instance(name);
    let task_id = world.task_id(title)?;
    let committed = run_async(world.store.commit_terminal(
        task_id,
        &instance_id,
        outcome,
        DefaultClock.utc(),
    ))
    .wrap_err("commit terminal status")?;
    world.last_commit = Some(committed);
    Ok(())
}

#[when(r#"instance "{name}" claims the next task"#)]
fn instance_claims(world: &mut ClaimWorld, name: String) -> Result<(), eyre::Report> {
    let instance_id = world.instance(&name);
    let claimed = run_async(world.store.claim_next(&instance_id, DefaultClock.utc()))
        .wrap_err("claim next task")?;
    world.last_claim = Some(claimed);
    Ok(())
}

#[when(r#"instance "{name}" commits success for task "{title}""#)]
fn instance_commits_success(
    world: &mut ClaimWorld,
    name: String,
    title: String,
) -> Result<(), eyre::Report> {
    commit(world, &name, &title, &ExecutionOutcome::Success)
}

#[when(r#"instance "{name}" commits failure for task "{title}""#)]
fn instance_commits_failure(
    world: &mut ClaimWorld,
    name: String,
    title: String,
) -> Result<(), eyre::Report> {
    commit(
        world,
        &name,
        &title,
        &ExecutionOutcome::failure("simulated fault"),
    )
}

#[when(r#"task "{title}" is requeued"#)]
fn task_is_requeued(world: &mut ClaimWorld, title: String) -> Result<(), eyre::Report> {
    let task_id = world.task_id(&title)?;
    let requeued = run_async(world.store.requeue(task_id, DefaultClock.utc()))
        .wrap_err("requeue task")?;
    if !requeued {
        return Err(eyre::eyre!("task {title:?} was not requeueable"));
    }
    Ok(())
}
