//! Given steps for task claiming BDD scenarios.

use super::world::{ClaimWorld, run_async};
use eyre::WrapErr;
use foreman::task::{
    domain::{ConversationContent, ConversationStatus, NewConversation, NewTask, TaskTitle},
    ports::{TaskQueue, TaskRepository},
};
use mockable::{Clock, DefaultClock};
use rstest_bdd_macros::given;

fn create_task(
    world: &mut ClaimWorld,
    title: &str,
    conversations: usize,
) -> Result<(), eyre::Report> {
    let mut pending = Vec::with_capacity(conversations);
    for index in 0..conversations {
        pending.push(NewConversation {
            content: ConversationContent::new(format!("{title} turn {index}"))?,
            status: ConversationStatus::Active,
        });
    }
    let task = NewTask {
        title: TaskTitle::new(title)?,
        description: None,
        conversations: pending,
    };
    let (created, _) = run_async(world.store.create_task(&task, DefaultClock.utc()))
        .wrap_err("create task for claiming scenario")?;
    world.tasks.insert(title.to_owned(), created.id());
    Ok(())
}

#[given(r#"a pending task "{title}""#)]
fn pending_task(world: &mut ClaimWorld, title: String) -> Result<(), eyre::Report> {
    create_task(world, &title, 0)
}

#[given(r#"a pending task "{title}" with {count:usize} conversations"#)]
fn pending_task_with_conversations(
    world: &mut ClaimWorld,
    title: String,
    count: usize,
) -> Result<(), eyre::Report> {
    create_task(world, &title, count)
}

#[given(r#"instance "{name}" has claimed the next task"#)]
fn instance_has_claimed(world: &mut ClaimWorld, name: String) -> Result<(), eyre::Report> {
    let instance_id = world.instance(&name);
    let claimed = run_async(world.store.claim_next(&instance_id, DefaultClock.utc()))
        .wrap_err("claim task in scenario setup")?;
    if claimed.is_none() {
        return Err(eyre::eyre!("expected a claimable task for {name}"));
    }
    Ok(())
}
