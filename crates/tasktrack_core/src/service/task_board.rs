//! Caller-side task list controller.
//!
//! Holds the snapshot a UI displays, guards input before it reaches the
//! store, and reports failures through a `Reporter` with fixed messages.

use crate::app::TaskTracker;
use crate::model::task::{CreateTaskRequest, Task, TaskId, TaskPriority, TaskStatus};
use log::warn;

pub const ADD_FAILED: &str = "Unable to add the task.";
pub const STATUS_UPDATE_FAILED: &str = "Unable to update the status.";
pub const DELETE_FAILED: &str = "Unable to delete the task.";

/// Free-text error display collaborator.
pub trait Reporter {
    fn report(&mut self, message: &str);
}

/// Sends reports to the log.
#[derive(Debug, Default)]
pub struct LogReporter;

impl Reporter for LogReporter {
    fn report(&mut self, message: &str) {
        warn!("event=user_report module=task_board status=error message={message}");
    }
}

/// Keeps every reported message.
#[derive(Debug, Default)]
pub struct RecordingReporter {
    pub messages: Vec<String>,
}

impl Reporter for RecordingReporter {
    fn report(&mut self, message: &str) {
        self.messages.push(message.to_string());
    }
}

pub struct TaskBoard<R: Reporter> {
    reporter: R,
    displayed: Vec<Task>,
}

impl<R: Reporter> TaskBoard<R> {
    pub fn new(reporter: R) -> Self {
        Self {
            reporter,
            displayed: Vec::new(),
        }
    }

    pub fn displayed(&self) -> &[Task] {
        &self.displayed
    }

    pub fn reporter(&self) -> &R {
        &self.reporter
    }

    /// Re-reads the task list from the store.
    pub fn refresh(&mut self, tracker: &TaskTracker) {
        self.displayed = tracker.tasks().list_tasks().to_vec();
    }

    /// Adds a task for the logged-in principal.
    ///
    /// Blank titles are dropped here without reaching the store or the
    /// reporter.
    pub fn add_task(
        &mut self,
        tracker: &mut TaskTracker,
        title: &str,
        description: &str,
        priority: TaskPriority,
    ) -> Option<Task> {
        let title = title.trim();
        if title.is_empty() {
            return None;
        }

        let request = CreateTaskRequest::new(title, priority).with_description(description);
        match tracker.create_task(request) {
            Ok(task) => {
                self.refresh(tracker);
                Some(task)
            }
            Err(_) => {
                self.reporter.report(ADD_FAILED);
                None
            }
        }
    }

    pub fn update_status(
        &mut self,
        tracker: &mut TaskTracker,
        id: TaskId,
        status: TaskStatus,
    ) -> bool {
        match tracker.tasks_mut().update_status(id, status) {
            Ok(_) => {
                self.refresh(tracker);
                true
            }
            Err(_) => {
                self.reporter.report(STATUS_UPDATE_FAILED);
                false
            }
        }
    }

    /// Deletes task `id`; an unknown id is not a failure.
    pub fn delete_task(&mut self, tracker: &mut TaskTracker, id: TaskId) -> bool {
        match tracker.tasks_mut().delete_task(id) {
            Ok(deleted) => {
                self.refresh(tracker);
                deleted
            }
            Err(_) => {
                self.reporter.report(DELETE_FAILED);
                false
            }
        }
    }
}
