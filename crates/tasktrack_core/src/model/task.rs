//! Task records.
//!
//! # Invariants
//! - `title` is non-empty after trimming.
//! - `updated_at >= created_at`, and every applied patch moves `updated_at`
//!   strictly forward even when the clock has not advanced.

use crate::clock::EpochMs;
use crate::model::principal::PrincipalId;
use crate::store::entity_store::{Entity, EntityId};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type TaskId = EntityId;

/// Workflow state of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TaskStatus {
    Todo,
    InProgress,
    Done,
}

impl TaskStatus {
    pub const ALL: [TaskStatus; 3] = [Self::Todo, Self::InProgress, Self::Done];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskPriority {
    Low,
    Medium,
    High,
}

impl TaskPriority {
    pub const ALL: [TaskPriority; 3] = [Self::Low, Self::Medium, Self::High];
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: TaskId,
    pub title: String,
    pub description: String,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_to: Option<PrincipalId>,
    pub created_by: PrincipalId,
    pub created_at: EpochMs,
    pub updated_at: EpochMs,
}

/// Input for creating a task. Status is always `todo` at creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateTaskRequest {
    pub title: String,
    pub description: String,
    pub priority: TaskPriority,
    pub assigned_to: Option<PrincipalId>,
}

impl CreateTaskRequest {
    pub fn new(title: impl Into<String>, priority: TaskPriority) -> Self {
        Self {
            title: title.into(),
            description: String::new(),
            priority,
            assigned_to: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn assigned_to(mut self, principal: PrincipalId) -> Self {
        self.assigned_to = Some(principal);
        self
    }

    /// Rejects whitespace-only titles before anything reaches the store.
    pub fn validate(&self) -> Result<(), TaskValidationError> {
        validate_title(&self.title)
    }

    /// Materializes the request into a fresh `todo` task without an id.
    pub fn into_task(self, created_by: PrincipalId, now_ms: EpochMs) -> Task {
        Task {
            id: 0,
            title: self.title.trim().to_string(),
            description: self.description,
            status: TaskStatus::Todo,
            priority: self.priority,
            assigned_to: self.assigned_to,
            created_by,
            created_at: now_ms,
            updated_at: now_ms,
        }
    }
}

/// Partial update merged into an existing task.
///
/// `assigned_to` is doubly optional: `Some(None)` clears the assignee.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
    pub assigned_to: Option<Option<PrincipalId>>,
}

impl TaskPatch {
    pub fn status(status: TaskStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    pub fn assignee(principal: Option<PrincipalId>) -> Self {
        Self {
            assigned_to: Some(principal),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskValidationError {
    EmptyTitle,
    UpdatedBeforeCreated {
        created_at: EpochMs,
        updated_at: EpochMs,
    },
}

impl Display for TaskValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyTitle => write!(f, "task title must not be empty"),
            Self::UpdatedBeforeCreated {
                created_at,
                updated_at,
            } => write!(
                f,
                "task updated_at {updated_at} is earlier than created_at {created_at}"
            ),
        }
    }
}

impl Error for TaskValidationError {}

impl Task {
    pub fn validate(&self) -> Result<(), TaskValidationError> {
        validate_title(&self.title)?;
        if self.updated_at < self.created_at {
            return Err(TaskValidationError::UpdatedBeforeCreated {
                created_at: self.created_at,
                updated_at: self.updated_at,
            });
        }
        Ok(())
    }

    pub fn is_done(&self) -> bool {
        self.status == TaskStatus::Done
    }
}

impl Entity for Task {
    type Patch = TaskPatch;
    type Invalid = TaskValidationError;

    fn id(&self) -> EntityId {
        self.id
    }

    fn assign_id(&mut self, id: EntityId) {
        self.id = id;
    }

    fn apply_patch(&mut self, patch: TaskPatch, now_ms: EpochMs) {
        if let Some(title) = patch.title {
            self.title = title.trim().to_string();
        }
        if let Some(description) = patch.description {
            self.description = description;
        }
        if let Some(status) = patch.status {
            self.status = status;
        }
        if let Some(priority) = patch.priority {
            self.priority = priority;
        }
        if let Some(assigned_to) = patch.assigned_to {
            self.assigned_to = assigned_to;
        }
        self.updated_at = now_ms.max(self.updated_at.saturating_add(1));
    }

    fn validate(&self) -> Result<(), TaskValidationError> {
        Task::validate(self)
    }
}

fn validate_title(title: &str) -> Result<(), TaskValidationError> {
    if title.trim().is_empty() {
        return Err(TaskValidationError::EmptyTitle);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{CreateTaskRequest, Task, TaskPatch, TaskPriority, TaskStatus, TaskValidationError};
    use crate::store::entity_store::Entity;

    fn sample(now_ms: i64) -> Task {
        CreateTaskRequest::new("  Buy milk ", TaskPriority::Medium).into_task(2, now_ms)
    }

    #[test]
    fn whitespace_title_is_rejected() {
        let request = CreateTaskRequest::new("   ", TaskPriority::Low);
        assert_eq!(request.validate(), Err(TaskValidationError::EmptyTitle));
    }

    #[test]
    fn new_task_starts_as_todo_with_equal_timestamps() {
        let task = sample(42);
        assert_eq!(task.title, "Buy milk");
        assert_eq!(task.status, TaskStatus::Todo);
        assert_eq!(task.created_at, task.updated_at);
        assert_eq!(task.created_by, 2);
    }

    #[test]
    fn patch_moves_updated_at_forward_even_with_stalled_clock() {
        let mut task = sample(100);
        task.apply_patch(TaskPatch::status(TaskStatus::Done), 100);
        assert_eq!(task.updated_at, 101);
        task.apply_patch(TaskPatch::status(TaskStatus::Todo), 50);
        assert_eq!(task.updated_at, 102);
        assert!(task.validate().is_ok());
    }

    #[test]
    fn patch_on_maximal_updated_at_saturates() {
        let mut task = sample(1);
        task.updated_at = i64::MAX;
        task.apply_patch(TaskPatch::status(TaskStatus::Done), 2);
        assert_eq!(task.updated_at, i64::MAX);
        assert_eq!(task.status, TaskStatus::Done);
    }

    #[test]
    fn assignee_patch_can_clear_assignment() {
        let mut task = sample(1);
        task.apply_patch(TaskPatch::assignee(Some(7)), 2);
        assert_eq!(task.assigned_to, Some(7));
        task.apply_patch(TaskPatch::assignee(None), 3);
        assert_eq!(task.assigned_to, None);
    }

    #[test]
    fn json_shape_uses_camel_case_and_kebab_status() {
        let mut task = sample(5);
        task.id = 9;
        task.status = TaskStatus::InProgress;
        let json = serde_json::to_value(&task).expect("serialize");
        assert_eq!(json["status"], "in-progress");
        assert_eq!(json["priority"], "medium");
        assert_eq!(json["createdBy"], 2);
        assert!(json.get("assignedTo").is_none());
    }
}
