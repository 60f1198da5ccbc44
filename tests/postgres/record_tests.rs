//! Task and conversation record tests against a real `PostgreSQL` store.

use super::helpers::{at, new_task, seed, setup_store, test_runtime};
use foreman::task::{
    domain::{
        ConversationContent, ConversationId, ConversationStatus, ConversationUpdate,
        ExecutionOutcome, InstanceId, NewConversation, TaskId, TaskStatus, TaskTitle, TaskUpdate,
    },
    ports::{TaskQueue, TaskRepository, TaskStoreError},
};
use pg_embedded_setup_unpriv::{TestCluster, test_support::shared_test_cluster};
use rstest::rstest;

#[rstest]
fn create_task_persists_task_and_conversations(shared_test_cluster: &'static TestCluster) {
    let (_db, store) = setup_store(shared_test_cluster, "record_create", 1).expect("store setup");
    let rt = test_runtime();

    let (task, conversations) = rt
        .block_on(store.create_task(&new_task("import", 3), at(0)))
        .expect("task creation should succeed");

    assert_eq!(task.status(), TaskStatus::Pending);
    assert_eq!(task.title().as_str(), "import");
    assert_eq!(task.description(), Some("import details"));
    assert_eq!(task.created_at(), at(0));
    assert_eq!(task.processing_instance_id(), None);
    assert_eq!(conversations.len(), 3);
    assert!(conversations.iter().all(|c| c.task_id() == task.id()));

    let listed = rt
        .block_on(store.list_conversations(task.id()))
        .expect("conversations should load");
    assert_eq!(listed, conversations);
}

#[rstest]
fn list_tasks_returns_newest_first_with_conversation_counts(
    shared_test_cluster: &'static TestCluster,
) {
    let (_db, store) = setup_store(shared_test_cluster, "record_list", 1).expect("store setup");
    let rt = test_runtime();
    let ids = seed(&rt, &store, &[("older", 2), ("newer", 0)]);

    let summaries = rt.block_on(store.list_tasks()).expect("listing should succeed");

    let listed: Vec<_> = summaries.iter().map(|s| s.id).collect();
    let mut expected = ids;
    expected.reverse();
    assert_eq!(listed, expected);
    let counts: Vec<_> = summaries.iter().map(|s| s.conversation_count).collect();
    assert_eq!(counts, vec![0, 2]);
}

#[rstest]
fn update_task_edits_fields_but_not_status(shared_test_cluster: &'static TestCluster) {
    let (_db, store) = setup_store(shared_test_cluster, "record_update", 1).expect("store setup");
    let rt = test_runtime();
    let ids = seed(&rt, &store, &[("draft", 0)]);
    let id = ids.first().copied().expect("task seeded");
    let update = TaskUpdate {
        title: Some(TaskTitle::new("final").expect("valid title")),
        description: None,
    };

    let updated = rt
        .block_on(store.update_task(id, &update, at(50)))
        .expect("update should succeed");

    assert_eq!(updated.title().as_str(), "final");
    assert_eq!(updated.description(), Some("draft details"));
    assert_eq!(updated.status(), TaskStatus::Pending);
    assert_eq!(updated.updated_at(), at(50));
}

#[rstest]
fn missing_records_are_reported(shared_test_cluster: &'static TestCluster) {
    let (_db, store) = setup_store(shared_test_cluster, "record_missing", 1).expect("store setup");
    let rt = test_runtime();
    let ghost = TaskId::from_raw(9_999);
    let conversation = NewConversation {
        content: ConversationContent::new("hello").expect("valid content"),
        status: ConversationStatus::Active,
    };

    assert!(matches!(
        rt.block_on(store.update_task(ghost, &TaskUpdate::default(), at(1))),
        Err(TaskStoreError::TaskNotFound(id)) if id == ghost
    ));
    assert!(matches!(
        rt.block_on(store.delete_task(ghost)),
        Err(TaskStoreError::TaskNotFound(_))
    ));
    assert!(matches!(
        rt.block_on(store.add_conversation(ghost, &conversation, at(1))),
        Err(TaskStoreError::TaskNotFound(_))
    ));
    assert!(matches!(
        rt.block_on(store.list_conversations(ghost)),
        Err(TaskStoreError::TaskNotFound(_))
    ));
    assert!(matches!(
        rt.block_on(store.update_conversation(
            ConversationId::from_raw(9_999),
            &ConversationUpdate::default(),
            at(1),
        )),
        Err(TaskStoreError::ConversationNotFound(_))
    ));
    assert!(matches!(
        rt.block_on(store.requeue(ghost, at(1))),
        Err(TaskStoreError::TaskNotFound(_))
    ));
    assert_eq!(rt.block_on(store.find_task(ghost)).expect("lookup"), None);
}

#[rstest]
fn conversations_can_be_added_and_updated(shared_test_cluster: &'static TestCluster) {
    let (_db, store) = setup_store(shared_test_cluster, "record_conversation", 1).expect("store setup");
    let rt = test_runtime();
    let id = seed(&rt, &store, &[("chat", 0)])
        .first()
        .copied()
        .expect("task seeded");
    let added = rt
        .block_on(store.add_conversation(
            id,
            &NewConversation {
                content: ConversationContent::new("first draft").expect("valid content"),
                status: ConversationStatus::Active,
            },
            at(5),
        ))
        .expect("conversation should be added");

    let archived = rt
        .block_on(store.update_conversation(
            added.id(),
            &ConversationUpdate {
                content: Some(ConversationContent::new("final").expect("valid content")),
                status: Some(ConversationStatus::Archived),
            },
            at(9),
        ))
        .expect("conversation should update");

    assert_eq!(archived.content().as_str(), "final");
    assert_eq!(archived.status(), ConversationStatus::Archived);
    assert_eq!(archived.created_at(), at(5));
    assert_eq!(archived.updated_at(), at(9));
}

#[rstest]
fn delete_task_cascades_to_conversations(shared_test_cluster: &'static TestCluster) {
    let (_db, store) = setup_store(shared_test_cluster, "record_delete", 1).expect("store setup");
    let rt = test_runtime();
    let ids = seed(&rt, &store, &[("doomed", 3), ("kept", 1)]);
    let doomed = ids.first().copied().expect("task seeded");

    rt.block_on(store.delete_task(doomed))
        .expect("delete should succeed");

    assert_eq!(rt.block_on(store.find_task(doomed)).expect("lookup"), None);
    assert_eq!(
        rt.block_on(store.conversation_total())
            .expect("total should load"),
        1
    );
}

#[rstest]
fn requeue_resets_failed_and_processing_tasks_only(shared_test_cluster: &'static TestCluster) {
    let (_db, store) = setup_store(shared_test_cluster, "record_requeue", 1).expect("store setup");
    let rt = test_runtime();
    seed(&rt, &store, &[("fails", 0), ("succeeds", 0), ("waits", 0)]);
    let owner = InstanceId::generate();
    let failing = rt
        .block_on(store.claim_next(&owner, at(10)))
        .expect("claim")
        .expect("pending task");
    rt.block_on(store.commit_terminal(
        failing.id(),
        &owner,
        &ExecutionOutcome::failure("boom"),
        at(11),
    ))
    .expect("commit");
    let succeeding = rt
        .block_on(store.claim_next(&owner, at(12)))
        .expect("claim")
        .expect("pending task");
    rt.block_on(store.commit_terminal(succeeding.id(), &owner, &ExecutionOutcome::Success, at(13)))
        .expect("commit");

    assert!(rt.block_on(store.requeue(failing.id(), at(20))).expect("requeue"));
    assert!(!rt.block_on(store.requeue(succeeding.id(), at(20))).expect("requeue"));

    let reset = rt
        .block_on(store.find_task(failing.id()))
        .expect("lookup")
        .expect("task exists");
    assert_eq!(reset.status(), TaskStatus::Pending);
    assert_eq!(reset.processing_instance_id(), None);
    assert_eq!(reset.processed_at(), None);
    assert_eq!(reset.updated_at(), at(20));
}

#[rstest]
fn requeue_stalled_only_touches_old_processing_tasks(shared_test_cluster: &'static TestCluster) {
    let (_db, store) = setup_store(shared_test_cluster, "record_stalled", 1).expect("store setup");
    let rt = test_runtime();
    seed(&rt, &store, &[("stalled", 0), ("busy", 0), ("idle", 0)]);
    let owner = InstanceId::generate();
    let stalled = rt
        .block_on(store.claim_next(&owner, at(10)))
        .expect("claim")
        .expect("pending task");
    let busy = rt
        .block_on(store.claim_next(&owner, at(100)))
        .expect("claim")
        .expect("pending task");

    let requeued = rt
        .block_on(store.requeue_stalled(at(50), at(120)))
        .expect("sweep should succeed");

    assert_eq!(requeued, vec![stalled.id()]);
    let still_busy = rt
        .block_on(store.find_task(busy.id()))
        .expect("lookup")
        .expect("task exists");
    assert_eq!(still_busy.status(), TaskStatus::Processing);
}

#[rstest]
fn counts_cover_statuses_conversations_and_completions(shared_test_cluster: &'static TestCluster) {
    let (_db, store) = setup_store(shared_test_cluster, "record_counts", 1).expect("store setup");
    let rt = test_runtime();
    seed(&rt, &store, &[("a", 1), ("b", 2), ("c", 0), ("d", 0)]);
    let first = InstanceId::generate();
    let second = InstanceId::generate();
    for (owner, outcome) in [
        (first, ExecutionOutcome::Success),
        (second, ExecutionOutcome::Success),
        (first, ExecutionOutcome::failure("boom")),
    ] {
        let task = rt
            .block_on(store.claim_next(&owner, at(10)))
            .expect("claim")
            .expect("pending task");
        rt.block_on(store.commit_terminal(task.id(), &owner, &outcome, at(20)))
            .expect("commit");
    }

    let counts = rt.block_on(store.status_counts()).expect("counts");
    assert_eq!(counts.pending, 1);
    assert_eq!(counts.processing, 0);
    assert_eq!(counts.completed, 2);
    assert_eq!(counts.failed, 1);
    assert_eq!(counts.total(), 4);

    assert_eq!(rt.block_on(store.conversation_total()).expect("total"), 3);

    let completions = rt
        .block_on(store.completions_by_instance())
        .expect("completions");
    assert_eq!(completions.get(&first), Some(&1));
    assert_eq!(completions.get(&second), Some(&1));
    assert_eq!(completions.len(), 2);
    let stats = rt.block_on(store.queue_stats(at(1))).expect("stats");
    assert_eq!(stats.counts, counts);
    assert_eq!(stats.total_conversations, 3);
    assert_eq!(stats.completions_by_instance, completions);
    assert_eq!(stats.created_since, 2);
}
