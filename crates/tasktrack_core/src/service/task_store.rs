//! Task store with status/priority partitions and summary statistics.
//!
//! # Invariants
//! - Every task appears in exactly one status bucket and one priority bucket.
//! - `stats().completion_rate` is `0.0` for an empty collection.
//! - Titles are validated before anything is persisted.

use crate::clock::{Clock, EpochMs};
use crate::model::principal::PrincipalId;
use crate::model::task::{
    CreateTaskRequest, Task, TaskId, TaskPatch, TaskPriority, TaskStatus, TaskValidationError,
};
use crate::storage::{keys, Storage, StorageError};
use crate::store::entity_store::{
    Derive, EntityStore, IdStrategy, StoreError, StoreEvent, SubscriptionId,
};
use log::{info, warn};
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::rc::Rc;

/// Principal credited with the seed tasks.
const SEED_CREATOR: PrincipalId = 1;
const JAN_13_2024_MS: EpochMs = 1_705_104_000_000;
const JAN_14_2024_MS: EpochMs = 1_705_190_400_000;
const JAN_15_2024_MS: EpochMs = 1_705_276_800_000;
const JAN_16_2024_MS: EpochMs = 1_705_363_200_000;

pub type TaskResult<T> = Result<T, TaskError>;

#[derive(Debug)]
pub enum TaskError {
    EmptyTitle,
    NotFound(TaskId),
    DuplicateId(TaskId),
    Invalid(TaskValidationError),
    Storage(StorageError),
}

impl Display for TaskError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyTitle => write!(f, "task title must not be empty"),
            Self::NotFound(id) => write!(f, "task not found: {id}"),
            Self::DuplicateId(id) => write!(f, "task id already in use: {id}"),
            Self::Invalid(err) => write!(f, "{err}"),
            Self::Storage(err) => write!(f, "{err}"),
        }
    }
}

impl Error for TaskError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Invalid(err) => Some(err),
            Self::Storage(err) => Some(err),
            _ => None,
        }
    }
}

impl From<StorageError> for TaskError {
    fn from(value: StorageError) -> Self {
        Self::Storage(value)
    }
}

impl From<TaskValidationError> for TaskError {
    fn from(value: TaskValidationError) -> Self {
        match value {
            TaskValidationError::EmptyTitle => Self::EmptyTitle,
            other => Self::Invalid(other),
        }
    }
}

impl From<StoreError<TaskValidationError>> for TaskError {
    fn from(value: StoreError<TaskValidationError>) -> Self {
        match value {
            StoreError::NotFound(id) => Self::NotFound(id),
            StoreError::DuplicateId(id) => Self::DuplicateId(id),
            StoreError::Rejected(err) => err.into(),
            StoreError::Storage(err) => Self::Storage(err),
        }
    }
}

/// Summary counters over the task collection.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TaskStats {
    pub total: usize,
    /// Status `done`.
    pub completed: usize,
    /// Status `todo`.
    pub pending: usize,
    pub in_progress: usize,
    pub high_priority: usize,
    /// Percentage of `done` tasks, `0.0` when there are none.
    pub completion_rate: f64,
}

/// Cached partitions and statistics of the current task collection.
#[derive(Debug)]
pub struct TaskViews {
    by_status: BTreeMap<TaskStatus, Vec<Task>>,
    by_priority: BTreeMap<TaskPriority, Vec<Task>>,
    stats: TaskStats,
}

impl Derive<Task> for TaskViews {
    fn derive(records: &[Task]) -> Self {
        let mut by_status: BTreeMap<TaskStatus, Vec<Task>> =
            TaskStatus::ALL.into_iter().map(|status| (status, Vec::new())).collect();
        let mut by_priority: BTreeMap<TaskPriority, Vec<Task>> = TaskPriority::ALL
            .into_iter()
            .map(|priority| (priority, Vec::new()))
            .collect();

        for task in records {
            by_status.entry(task.status).or_default().push(task.clone());
            by_priority.entry(task.priority).or_default().push(task.clone());
        }

        let count = |status: TaskStatus| by_status.get(&status).map_or(0, Vec::len);
        let total = records.len();
        let completed = count(TaskStatus::Done);
        let stats = TaskStats {
            total,
            completed,
            pending: count(TaskStatus::Todo),
            in_progress: count(TaskStatus::InProgress),
            high_priority: by_priority.get(&TaskPriority::High).map_or(0, Vec::len),
            completion_rate: if total == 0 {
                0.0
            } else {
                completed as f64 / total as f64 * 100.0
            },
        };

        Self {
            by_status,
            by_priority,
            stats,
        }
    }
}

/// Owner of all task records.
pub struct TaskStore {
    tasks: EntityStore<Task, TaskViews>,
}

impl TaskStore {
    /// Restores tasks from `storage`, seeding the starter set on first use.
    pub fn open(storage: Rc<dyn Storage>, clock: Rc<dyn Clock>) -> TaskResult<Self> {
        let tasks: EntityStore<Task, TaskViews> = EntityStore::open(keys::TASKS, storage, clock)?;
        let mut store = Self {
            tasks: tasks.with_id_strategy(IdStrategy::TimeDerived),
        };
        if !store.tasks.was_restored() {
            store.tasks.replace_all(seed_tasks())?;
            info!(
                "event=task_seed module=tasks status=ok count={}",
                store.tasks.len()
            );
        }
        Ok(store)
    }

    pub fn list_tasks(&self) -> &[Task] {
        self.tasks.list()
    }

    pub fn get_task(&self, id: TaskId) -> Option<&Task> {
        self.tasks.get(id)
    }

    /// Creates a `todo` task credited to `created_by`.
    pub fn create_task(
        &mut self,
        created_by: PrincipalId,
        request: CreateTaskRequest,
    ) -> TaskResult<Task> {
        if let Err(err) = request.validate() {
            warn!("event=task_create module=tasks status=error error_code=empty_title");
            return Err(err.into());
        }
        let task = request.into_task(created_by, self.tasks.now_ms());
        let task = self.tasks.insert(task)?;
        info!(
            "event=task_create module=tasks status=ok task_id={} created_by={}",
            task.id, created_by
        );
        Ok(task)
    }

    /// Merges `patch` into task `id`.
    pub fn update(&mut self, id: TaskId, patch: TaskPatch) -> TaskResult<Task> {
        match self.tasks.update(id, patch) {
            Ok(task) => {
                info!("event=task_update module=tasks status=ok task_id={id}");
                Ok(task)
            }
            Err(err) => {
                warn!("event=task_update module=tasks status=error task_id={id} error={err}");
                Err(err.into())
            }
        }
    }

    pub fn update_status(&mut self, id: TaskId, status: TaskStatus) -> TaskResult<Task> {
        self.update(id, TaskPatch::status(status))
    }

    /// Sets or clears the assignee of task `id`.
    pub fn assign(&mut self, id: TaskId, principal: Option<PrincipalId>) -> TaskResult<Task> {
        self.update(id, TaskPatch::assignee(principal))
    }

    /// Deletes task `id`; returns whether it existed.
    pub fn delete_task(&mut self, id: TaskId) -> TaskResult<bool> {
        let deleted = self.tasks.remove(id)?;
        info!("event=task_delete module=tasks status=ok task_id={id} deleted={deleted}");
        Ok(deleted)
    }

    pub fn by_status(&self) -> &BTreeMap<TaskStatus, Vec<Task>> {
        &self.tasks.view().by_status
    }

    pub fn by_priority(&self) -> &BTreeMap<TaskPriority, Vec<Task>> {
        &self.tasks.view().by_priority
    }

    pub fn stats(&self) -> TaskStats {
        self.tasks.view().stats
    }

    pub fn subscribe<F>(&mut self, listener: F) -> SubscriptionId
    where
        F: FnMut(&StoreEvent) + 'static,
    {
        self.tasks.subscribe(listener)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.tasks.unsubscribe(id)
    }
}

fn seed_tasks() -> Vec<Task> {
    vec![
        Task {
            id: 1,
            title: "Apprendre Angular".to_string(),
            description: "Étudier les fondamentaux d'Angular 20+".to_string(),
            status: TaskStatus::Todo,
            priority: TaskPriority::High,
            assigned_to: None,
            created_by: SEED_CREATOR,
            created_at: JAN_15_2024_MS,
            updated_at: JAN_15_2024_MS,
        },
        Task {
            id: 2,
            title: "Créer un projet".to_string(),
            description: "Développer une application TodoList".to_string(),
            status: TaskStatus::InProgress,
            priority: TaskPriority::Medium,
            assigned_to: None,
            created_by: SEED_CREATOR,
            created_at: JAN_14_2024_MS,
            updated_at: JAN_16_2024_MS,
        },
        Task {
            id: 3,
            title: "Configurer l'environnement".to_string(),
            description: "Installer Node.js, Angular CLI et configurer VS Code".to_string(),
            status: TaskStatus::Done,
            priority: TaskPriority::High,
            assigned_to: None,
            created_by: SEED_CREATOR,
            created_at: JAN_13_2024_MS,
            updated_at: JAN_14_2024_MS,
        },
    ]
}
