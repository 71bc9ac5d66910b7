use std::cell::Cell;
use std::rc::Rc;
use tasktrack_core::db::DbError;
use tasktrack_core::service::task_board::{ADD_FAILED, DELETE_FAILED, STATUS_UPDATE_FAILED};
use tasktrack_core::{
    evaluate_route, AdminError, CreateTaskRequest, IdentityError, ManualClock, MemoryStorage,
    RecordingReporter, RouteGuard, Storage, StorageError, StorageResult, TaskBoard, TaskError,
    TaskPriority, TaskStatus, TaskTracker, TrackerError,
};

/// Memory storage whose writes can be switched off.
#[derive(Default)]
struct SwitchableStorage {
    inner: MemoryStorage,
    offline: Cell<bool>,
}

impl Storage for SwitchableStorage {
    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        self.inner.get(key)
    }

    fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        if self.offline.get() {
            return Err(StorageError::from(DbError::entry("set", key)(
                rusqlite::Error::InvalidQuery,
            )));
        }
        self.inner.set(key, value)
    }

    fn remove(&self, key: &str) -> StorageResult<()> {
        self.inner.remove(key)
    }
}

fn tracker_with(storage: Rc<SwitchableStorage>) -> TaskTracker {
    TaskTracker::with_storage(storage, Rc::new(ManualClock::new(1_730_000_000_000))).unwrap()
}

fn logged_in(email: &str, secret: &str) -> TaskTracker {
    let mut tracker = tracker_with(Rc::new(SwitchableStorage::default()));
    tracker.identity_mut().login(email, secret).unwrap();
    tracker
}

#[test]
fn blank_title_never_reaches_store_or_reporter() {
    let mut tracker = logged_in("user@example.com", "user123");
    let mut board = TaskBoard::new(RecordingReporter::default());

    assert!(board
        .add_task(&mut tracker, "   ", "", TaskPriority::Medium)
        .is_none());
    assert_eq!(tracker.tasks().list_tasks().len(), 3);
    assert!(board.reporter().messages.is_empty());
}

#[test]
fn added_task_is_credited_to_current_principal() {
    let mut tracker = logged_in("user@example.com", "user123");
    let mut board = TaskBoard::new(RecordingReporter::default());

    let task = board
        .add_task(&mut tracker, " Buy milk ", "", TaskPriority::Medium)
        .expect("task should be created");
    assert_eq!(task.title, "Buy milk");
    assert_eq!(task.created_by, 2);
    assert_eq!(task.status, TaskStatus::Todo);
    assert_eq!(board.displayed().len(), 4);
}

#[test]
fn anonymous_add_is_reported() {
    let mut tracker = tracker_with(Rc::new(SwitchableStorage::default()));
    let mut board = TaskBoard::new(RecordingReporter::default());

    assert!(matches!(
        tracker.create_task(CreateTaskRequest::new("x", TaskPriority::Low)),
        Err(TrackerError::Unauthenticated)
    ));
    assert!(board
        .add_task(&mut tracker, "Buy milk", "", TaskPriority::Low)
        .is_none());
    assert_eq!(board.reporter().messages, vec![ADD_FAILED]);
}

#[test]
fn storage_failures_are_reported_and_state_is_kept() {
    let storage = Rc::new(SwitchableStorage::default());
    let mut tracker = tracker_with(Rc::clone(&storage));
    tracker
        .identity_mut()
        .login("user@example.com", "user123")
        .unwrap();
    let mut board = TaskBoard::new(RecordingReporter::default());
    board.refresh(&tracker);
    let displayed = board.displayed().to_vec();

    storage.offline.set(true);
    assert!(board
        .add_task(&mut tracker, "Offline", "", TaskPriority::Low)
        .is_none());
    assert!(!board.update_status(&mut tracker, 1, TaskStatus::Done));
    assert!(!board.delete_task(&mut tracker, 1));

    assert_eq!(
        board.reporter().messages,
        vec![ADD_FAILED, STATUS_UPDATE_FAILED, DELETE_FAILED]
    );
    assert_eq!(board.displayed(), displayed.as_slice());
    assert_eq!(tracker.tasks().list_tasks(), displayed.as_slice());
    assert_eq!(tracker.tasks().stats().completed, 1);
}

#[test]
fn status_update_and_delete_refresh_the_board() {
    let mut tracker = logged_in("user@example.com", "user123");
    let mut board = TaskBoard::new(RecordingReporter::default());

    assert!(board.update_status(&mut tracker, 1, TaskStatus::InProgress));
    assert_eq!(board.displayed()[0].status, TaskStatus::InProgress);
    assert!(board.delete_task(&mut tracker, 1));
    assert!(!board.delete_task(&mut tracker, 1));
    assert_eq!(board.displayed().len(), 2);
    assert!(board.reporter().messages.is_empty());
}

#[test]
fn update_of_missing_task_is_reported() {
    let mut tracker = logged_in("user@example.com", "user123");
    let mut board = TaskBoard::new(RecordingReporter::default());

    assert!(!board.update_status(&mut tracker, 404, TaskStatus::Done));
    assert_eq!(board.reporter().messages, vec![STATUS_UPDATE_FAILED]);
}

#[test]
fn admin_console_requires_admin_session() {
    let mut anonymous = tracker_with(Rc::new(SwitchableStorage::default()));
    assert!(anonymous.admin_console().err().is_some_and(|err| err.is_forbidden()));

    let mut user = logged_in("user@example.com", "user123");
    assert!(user.admin_console().err().is_some_and(|err| err.is_forbidden()));
}

#[test]
fn admin_console_manages_principals_and_tasks() {
    let mut tracker = logged_in("admin@example.com", "admin123");
    let mut console = tracker.admin_console().unwrap();
    assert_eq!(console.admin_id(), 1);
    assert_eq!(console.list_principals().len(), 2);

    let err = console.delete_principal(1).unwrap_err();
    assert!(err.is_forbidden());

    let assigned = console.assign_task(1, Some(2)).unwrap();
    assert_eq!(assigned.assigned_to, Some(2));
    assert!(matches!(
        console.assign_task(1, Some(99)),
        Err(AdminError::Identity(IdentityError::NotFound(99)))
    ));
    assert!(matches!(
        console.assign_task(404, None),
        Err(AdminError::Task(TaskError::NotFound(404)))
    ));

    assert!(console.delete_principal(2).unwrap());
    assert!(console.delete_task(3).unwrap());
    assert_eq!(console.list_tasks().len(), 2);
    assert_eq!(console.stats().completed, 0);
    assert_eq!(console.list_principals().len(), 1);
}

#[test]
fn admin_route_requires_login_then_admin_role() {
    let mut tracker = tracker_with(Rc::new(SwitchableStorage::default()));
    let chain = [RouteGuard::Authenticated, RouteGuard::Admin];

    let decision = evaluate_route(tracker.identity(), "/admin", &chain);
    assert_eq!(
        decision.redirect().map(|redirect| redirect.to_url()),
        Some("/auth/login?returnUrl=%2Fadmin".to_string())
    );

    tracker
        .identity_mut()
        .login("user@example.com", "user123")
        .unwrap();
    let decision = evaluate_route(tracker.identity(), "/admin", &chain);
    assert_eq!(
        decision.redirect().map(|redirect| redirect.to_url()),
        Some("/todos".to_string())
    );

    tracker.identity_mut().logout().unwrap();
    tracker
        .identity_mut()
        .login("admin@example.com", "admin123")
        .unwrap();
    assert!(evaluate_route(tracker.identity(), "/admin", &chain).is_allowed());
}
