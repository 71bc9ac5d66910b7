use std::rc::Rc;
use tasktrack_core::{
    CoreConfig, CreateTaskRequest, ManualClock, MemoryStorage, SqliteStorage, Storage,
    TaskPriority, TaskStatus, TaskTracker,
};

#[test]
fn sqlite_file_restores_identical_collections() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tracker.db");

    let (principals, tasks) = {
        let mut tracker = TaskTracker::open(&CoreConfig::sqlite_file(&path)).unwrap();
        tracker
            .identity_mut()
            .login("admin@example.com", "admin123")
            .unwrap();
        let task = tracker
            .create_task(CreateTaskRequest::new("Persist me", TaskPriority::Low))
            .unwrap();
        tracker
            .tasks_mut()
            .update_status(task.id, TaskStatus::InProgress)
            .unwrap();
        tracker.tasks_mut().delete_task(2).unwrap();
        (
            tracker.identity().list_principals().to_vec(),
            tracker.tasks().list_tasks().to_vec(),
        )
    };

    let reopened = TaskTracker::open(&CoreConfig::sqlite_file(&path)).unwrap();
    assert_eq!(reopened.identity().list_principals(), principals.as_slice());
    assert_eq!(reopened.tasks().list_tasks(), tasks.as_slice());
    assert_eq!(reopened.identity().current_principal().map(|p| p.id), Some(1));
}

#[test]
fn stores_write_disjoint_keys() {
    let storage = Rc::new(MemoryStorage::new());
    let clock = Rc::new(ManualClock::new(1_700_000_000_000));
    let mut tracker = TaskTracker::with_storage(storage.clone(), clock).unwrap();
    assert_eq!(storage.keys(), vec!["credentials", "principals", "tasks"]);

    tracker
        .identity_mut()
        .login("user@example.com", "user123")
        .unwrap();
    assert_eq!(
        storage.keys(),
        vec![
            "credentials",
            "currentPrincipal",
            "principals",
            "sessionToken",
            "tasks"
        ]
    );
}

#[test]
fn seed_is_not_reapplied_over_existing_snapshot() {
    let storage = Rc::new(SqliteStorage::open_in_memory().unwrap());
    let clock = Rc::new(ManualClock::new(1_700_000_000_000));

    let mut tracker = TaskTracker::with_storage(storage.clone(), clock.clone()).unwrap();
    tracker.tasks_mut().delete_task(1).unwrap();
    tracker.tasks_mut().delete_task(2).unwrap();
    tracker.tasks_mut().delete_task(3).unwrap();
    assert_eq!(storage.get("tasks").unwrap().as_deref(), Some("[]"));

    let reopened = TaskTracker::with_storage(storage, clock).unwrap();
    assert!(reopened.tasks().list_tasks().is_empty());
    assert_eq!(reopened.tasks().stats().completion_rate, 0.0);
}

#[test]
fn task_snapshot_uses_camel_case_json() {
    let storage = Rc::new(MemoryStorage::new());
    let clock = Rc::new(ManualClock::new(1_700_000_000_000));
    TaskTracker::with_storage(storage.clone(), clock).unwrap();

    let raw = storage.get("tasks").unwrap().unwrap();
    let json: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(json[1]["status"], "in-progress");
    assert_eq!(json[1]["createdAt"], 1_705_190_400_000_i64);
    assert_eq!(json[1]["updatedAt"], 1_705_363_200_000_i64);
}
