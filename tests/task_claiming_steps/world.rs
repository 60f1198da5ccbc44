//! Shared world state for task claiming BDD scenarios.

use foreman::task::{
    adapters::memory::InMemoryTaskStore,
    domain::{InstanceId, Task, TaskId},
};
use rstest::fixture;
use std::collections::HashMap;
use std::sync::Arc;

/// Scenario world for claim and commit behaviour tests.
pub struct ClaimWorld {
    pub store: Arc<InMemoryTaskStore>,
    pub instances: HashMap<String, InstanceId>,
    pub tasks: HashMap<String, TaskId>,
    pub last_claim: Option<Option<Task>>,
    pub last_commit: Option<bool>,
}

impl ClaimWorld {
    /// Creates a world over an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            store: Arc::new(InMemoryTaskStore::new()),
            instances: HashMap::new(),
            tasks: HashMap::new(),
            last_claim: None,
            last_commit: None,
        }
    }

    /// Returns the identity for `name`, generating one on first use.
    pub fn instance(&mut self, name: &str) -> InstanceId {
        *self
            .instances
            .entry(name.to_owned())
            .or_insert_with(InstanceId::generate)
    }

    /// Looks up a task created earlier in the scenario.
    pub fn task_id(&self, title: &str) -> Result<TaskId, eyre::Report> {
        self.tasks
            .get(title)
            .copied()
            .ok_or_else(|| eyre::eyre!("no task titled {title:?} in scenario world"))
    }
}

impl Default for ClaimWorld {
    fn default() -> Self {
        Self::new()
    }
}

/// Fixture that creates a new scenario world.
#[fixture]
pub fn world() -> ClaimWorld {
    ClaimWorld::default()
}

/// Runs an async operation within sync step definitions.
pub fn run_async<T>(future: impl std::future::Future<Output = T>) -> T {
    tokio::task::block_in_place(|| tokio::runtime::Handle::current().block_on(future))
}
