//! Integration tests for the task store: CRUD, filtering and grouping.

use proptest::prelude::*;
use std::collections::HashSet;
use taskroom_core::{
    GroupBy, Priority, PriorityFilter, TaskCollection, TaskDraft, TaskFilter, TaskPatch,
};

#[test]
fn test_completed_task_still_found_and_grouped() {
    let mut tasks = TaskCollection::new();
    let id = tasks
        .create_task(TaskDraft::new("Write spec").with_priority(Priority::High))
        .id
        .clone();
    assert!(tasks.update_task(&id, TaskPatch::completed(true)));

    let found = tasks.filter_tasks(&TaskFilter::new("write", PriorityFilter::All));
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].id, id);

    let groups = tasks.group_tasks(GroupBy::Status);
    assert_eq!(groups[0].key, "Pending");
    assert!(groups[0].tasks.is_empty());
    assert_eq!(groups[1].key, "Completed");
    assert_eq!(groups[1].tasks[0].title, "Write spec");
}

#[test]
fn test_patch_merges_shallowly() {
    let mut tasks = TaskCollection::new();
    let id = tasks
        .create_task(
            TaskDraft::new("Draft")
                .with_description("outline")
                .with_tags(["docs"]),
        )
        .id
        .clone();
    let before = tasks.get(&id).unwrap().clone();

    tasks.update_task(
        &id,
        TaskPatch {
            description: Some(None),
            priority: Some(Priority::Urgent),
            ..Default::default()
        },
    );

    let after = tasks.get(&id).unwrap();
    assert_eq!(after.title, "Draft");
    assert_eq!(after.description, None);
    assert_eq!(after.priority, Priority::Urgent);
    assert_eq!(after.tags, vec!["docs"]);
    assert_eq!(after.created_at, before.created_at);
    assert!(after.updated_at > before.updated_at);
}

#[test]
fn test_unknown_ids_are_no_ops() {
    let mut tasks = TaskCollection::new();
    tasks.create_task(TaskDraft::new("Keep me"));
    let snapshot = tasks.clone();
    assert!(!tasks.update_task("task-missing", TaskPatch::completed(true)));
    assert!(!tasks.delete_task("task-missing"));
    assert_eq!(tasks.toggle_completed("task-missing"), None);
    assert_eq!(tasks, snapshot);
}

#[test]
fn test_update_after_delete_is_no_op() {
    let mut tasks = TaskCollection::new();
    tasks.create_task(TaskDraft::new("Keep me"));
    let id = tasks.create_task(TaskDraft::new("Drop me")).id.clone();
    let before = tasks.len();

    assert!(tasks.delete_task(&id));
    let snapshot = tasks.clone();
    assert!(!tasks.update_task(
        &id,
        TaskPatch {
            title: Some("Back again".into()),
            ..Default::default()
        },
    ));
    assert_eq!(tasks, snapshot);
    assert_eq!(tasks.len(), before - 1);
    assert!(tasks.get(&id).is_none());
}

#[test]
fn test_priority_groups_follow_first_encounter() {
    let mut tasks = TaskCollection::new();
    for (title, priority) in [
        ("a", Priority::Low),
        ("b", Priority::Urgent),
        ("c", Priority::Low),
        ("d", Priority::Medium),
    ] {
        tasks.create_task(TaskDraft::new(title).with_priority(priority));
    }
    let groups = tasks.group_tasks(GroupBy::Priority);
    let keys: Vec<&str> = groups.iter().map(|g| g.key.as_str()).collect();
    assert_eq!(keys, vec!["low", "urgent", "medium"]);
    let low: Vec<&str> = groups[0].tasks.iter().map(|t| t.title.as_str()).collect();
    assert_eq!(low, vec!["a", "c"]);
}

#[test]
fn test_filter_combines_text_and_priority() {
    let mut tasks = TaskCollection::new();
    tasks.create_task(TaskDraft::new("Fix login").with_priority(Priority::High));
    tasks.create_task(
        TaskDraft::new("Refactor")
            .with_description("touches LOGIN flow")
            .with_priority(Priority::Low),
    );
    tasks.create_task(TaskDraft::new("Lunch").with_priority(Priority::High));

    let all = tasks.filter_tasks(&TaskFilter::new("login", PriorityFilter::All));
    assert_eq!(all.len(), 2);
    let high = tasks.filter_tasks(&TaskFilter::new("login", PriorityFilter::Only(Priority::High)));
    assert_eq!(high.len(), 1);
    assert_eq!(high[0].title, "Fix login");
    assert_eq!(tasks.filter_tasks(&TaskFilter::default()).len(), 3);
}

fn priority_strategy() -> impl Strategy<Value = Priority> {
    prop_oneof![
        Just(Priority::Urgent),
        Just(Priority::High),
        Just(Priority::Medium),
        Just(Priority::Low),
    ]
}

proptest! {
    #[test]
    fn ids_stay_unique(titles in prop::collection::vec("[a-z]{1,8}", 1..30)) {
        let mut tasks = TaskCollection::new();
        for title in &titles {
            tasks.create_task(TaskDraft::new(title.clone()));
        }
        let ids: HashSet<&str> = tasks.iter().map(|t| t.id.as_str()).collect();
        prop_assert_eq!(ids.len(), titles.len());
    }

    #[test]
    fn status_groups_partition_the_input(
        entries in prop::collection::vec((priority_strategy(), any::<bool>()), 0..30)
    ) {
        let mut tasks = TaskCollection::new();
        for (i, (priority, done)) in entries.iter().enumerate() {
            let id = tasks
                .create_task(TaskDraft::new(format!("task {i}")).with_priority(*priority))
                .id
                .clone();
            tasks.update_task(&id, TaskPatch::completed(*done));
        }

        let groups = tasks.group_tasks(GroupBy::Status);
        prop_assert_eq!(groups.len(), 2);
        prop_assert!(groups[0].tasks.iter().all(|t| !t.completed));
        prop_assert!(groups[1].tasks.iter().all(|t| t.completed));
        prop_assert_eq!(groups[0].tasks.len() + groups[1].tasks.len(), tasks.len());
        prop_assert_eq!(groups[0].tasks.len(), tasks.pending_count());
    }

    #[test]
    fn priority_filter_is_a_subsequence(
        priorities in prop::collection::vec(priority_strategy(), 0..30),
        wanted in priority_strategy(),
    ) {
        let mut tasks = TaskCollection::new();
        for (i, p) in priorities.iter().enumerate() {
            tasks.create_task(TaskDraft::new(format!("t{i}")).with_priority(*p));
        }
        let filtered = tasks.filter_tasks(&TaskFilter::new("", PriorityFilter::Only(wanted)));
        let expected: Vec<&str> = tasks
            .iter()
            .filter(|t| t.priority == wanted)
            .map(|t| t.id.as_str())
            .collect();
        let got: Vec<&str> = filtered.iter().map(|t| t.id.as_str()).collect();
        prop_assert_eq!(got, expected);
    }
}
