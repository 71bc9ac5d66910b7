use std::rc::Rc;
use tasktrack_core::{
    CreateTaskRequest, ManualClock, MemoryStorage, TaskError, TaskPatch, TaskPriority, TaskStatus,
    TaskStore,
};

const NOW_MS: i64 = 1_720_000_000_000;

fn open() -> (TaskStore, Rc<ManualClock>) {
    let clock = Rc::new(ManualClock::new(NOW_MS));
    let store = TaskStore::open(Rc::new(MemoryStorage::new()), clock.clone()).unwrap();
    (store, clock)
}

#[test]
fn seed_tasks_are_present() {
    let (store, _) = open();
    let titles: Vec<_> = store
        .list_tasks()
        .iter()
        .map(|task| (task.id, task.title.as_str(), task.status, task.priority))
        .collect();
    assert_eq!(
        titles,
        vec![
            (1, "Apprendre Angular", TaskStatus::Todo, TaskPriority::High),
            (2, "Créer un projet", TaskStatus::InProgress, TaskPriority::Medium),
            (3, "Configurer l'environnement", TaskStatus::Done, TaskPriority::High),
        ]
    );
    assert_eq!(store.get_task(1).unwrap().created_by, 1);
}

#[test]
fn create_task_starts_as_todo_with_unique_id() {
    let (mut store, _) = open();

    let task = store
        .create_task(2, CreateTaskRequest::new("Buy milk", TaskPriority::Medium))
        .unwrap();
    assert_eq!(task.status, TaskStatus::Todo);
    assert_eq!(task.description, "");
    assert_eq!(task.created_by, 2);
    assert_eq!(task.created_at, task.updated_at);
    assert_eq!(task.id, NOW_MS);

    let second = store
        .create_task(2, CreateTaskRequest::new("Buy bread", TaskPriority::Low))
        .unwrap();
    assert_ne!(second.id, task.id);
    assert_eq!(store.list_tasks().len(), 5);
}

#[test]
fn update_merges_fields_and_advances_updated_at() {
    let (mut store, clock) = open();
    let task = store
        .create_task(1, CreateTaskRequest::new("Draft", TaskPriority::Low))
        .unwrap();

    clock.advance(1_000);
    let updated = store
        .update(
            task.id,
            TaskPatch {
                title: Some("Final".to_string()),
                priority: Some(TaskPriority::High),
                ..TaskPatch::default()
            },
        )
        .unwrap();
    assert_eq!(updated.title, "Final");
    assert_eq!(updated.priority, TaskPriority::High);
    assert_eq!(updated.status, TaskStatus::Todo);
    assert_eq!(updated.updated_at, NOW_MS + 1_000);

    let again = store.update_status(task.id, TaskStatus::Done).unwrap();
    assert!(again.updated_at > updated.updated_at);
    assert!(again.updated_at >= again.created_at);
}

#[test]
fn blank_title_patch_is_rejected() {
    let (mut store, _) = open();
    let err = store
        .update(
            1,
            TaskPatch {
                title: Some("   ".to_string()),
                ..TaskPatch::default()
            },
        )
        .unwrap_err();
    assert!(matches!(err, TaskError::EmptyTitle));
    assert_eq!(store.get_task(1).unwrap().title, "Apprendre Angular");
}

#[test]
fn delete_reports_whether_task_existed() {
    let (mut store, _) = open();
    assert!(store.delete_task(1).unwrap());
    assert!(store.get_task(1).is_none());
    assert!(!store.delete_task(999).unwrap());
}

#[test]
fn views_follow_every_mutation() {
    let (mut store, _) = open();

    let task = store
        .create_task(1, CreateTaskRequest::new("Ship", TaskPriority::High))
        .unwrap();
    assert_eq!(store.stats().total, 4);
    assert_eq!(store.stats().high_priority, 3);
    assert_eq!(store.by_status()[&TaskStatus::Todo].len(), 2);

    store.update_status(task.id, TaskStatus::InProgress).unwrap();
    assert_eq!(store.by_status()[&TaskStatus::Todo].len(), 1);
    assert_eq!(store.stats().in_progress, 2);

    store.delete_task(task.id).unwrap();
    store.delete_task(1).unwrap();
    store.delete_task(2).unwrap();
    store.delete_task(3).unwrap();
    let stats = store.stats();
    assert_eq!(stats.total, 0);
    assert_eq!(stats.completion_rate, 0.0);
    assert!(store.by_priority().values().all(Vec::is_empty));
}

#[test]
fn every_task_lands_in_exactly_one_bucket() {
    let (mut store, _) = open();
    for (index, priority) in TaskPriority::ALL.into_iter().enumerate() {
        store
            .create_task(1, CreateTaskRequest::new(format!("task {index}"), priority))
            .unwrap();
    }

    let total = store.list_tasks().len();
    let status_total: usize = store.by_status().values().map(Vec::len).sum();
    let priority_total: usize = store.by_priority().values().map(Vec::len).sum();
    assert_eq!(status_total, total);
    assert_eq!(priority_total, total);
}

#[test]
fn assign_sets_and_clears_assignee() {
    let (mut store, _) = open();
    assert_eq!(store.assign(2, Some(2)).unwrap().assigned_to, Some(2));
    assert_eq!(store.assign(2, None).unwrap().assigned_to, None);
    assert!(matches!(store.assign(42, Some(2)), Err(TaskError::NotFound(42))));
}
