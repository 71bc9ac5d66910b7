//! Process-level composition of the stores.
//!
//! # Responsibility
//! - Construct the persistence adapter, clock and both stores exactly once.
//! - Offer the cross-store operations (task creation, admin console).
//!
//! # Invariants
//! - Both stores share one adapter but never share a storage key.

use crate::clock::{Clock, SystemClock};
use crate::config::{CoreConfig, StorageLocation};
use crate::logging::init_logging;
use crate::model::task::{CreateTaskRequest, Task};
use crate::service::admin_console::{AdminConsole, AdminResult};
use crate::service::identity_store::{IdentityError, IdentityStore};
use crate::service::task_store::{TaskError, TaskStore};
use crate::storage::{MemoryStorage, SqliteStorage, Storage, StorageError};
use log::info;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::rc::Rc;

pub type TrackerResult<T> = Result<T, TrackerError>;

#[derive(Debug)]
pub enum TrackerError {
    Logging(String),
    Storage(StorageError),
    Identity(IdentityError),
    Task(TaskError),
    /// Operation needs a logged-in principal.
    Unauthenticated,
}

impl Display for TrackerError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Logging(message) => write!(f, "logging setup failed: {message}"),
            Self::Storage(err) => write!(f, "{err}"),
            Self::Identity(err) => write!(f, "{err}"),
            Self::Task(err) => write!(f, "{err}"),
            Self::Unauthenticated => write!(f, "no principal is logged in"),
        }
    }
}

impl Error for TrackerError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Storage(err) => Some(err),
            Self::Identity(err) => Some(err),
            Self::Task(err) => Some(err),
            Self::Logging(_) | Self::Unauthenticated => None,
        }
    }
}

impl From<StorageError> for TrackerError {
    fn from(value: StorageError) -> Self {
        Self::Storage(value)
    }
}

impl From<IdentityError> for TrackerError {
    fn from(value: IdentityError) -> Self {
        Self::Identity(value)
    }
}

impl From<TaskError> for TrackerError {
    fn from(value: TaskError) -> Self {
        Self::Task(value)
    }
}

/// Identity and task stores of one running instance.
pub struct TaskTracker {
    identity: IdentityStore,
    tasks: TaskStore,
}

impl TaskTracker {
    /// Sets up logging (when configured), opens storage and both stores.
    pub fn open(config: &CoreConfig) -> TrackerResult<Self> {
        if let Some(log) = &config.log {
            init_logging(&log.level, &log.dir).map_err(TrackerError::Logging)?;
        }

        let storage: Rc<dyn Storage> = match &config.storage {
            StorageLocation::InMemory => Rc::new(MemoryStorage::new()),
            StorageLocation::SqliteInMemory => Rc::new(SqliteStorage::open_in_memory()?),
            StorageLocation::SqliteFile(path) => Rc::new(SqliteStorage::open(path)?),
        };
        Self::with_storage(storage, Rc::new(SystemClock))
    }

    /// Opens both stores over an existing adapter and clock.
    pub fn with_storage(storage: Rc<dyn Storage>, clock: Rc<dyn Clock>) -> TrackerResult<Self> {
        let identity = IdentityStore::open(Rc::clone(&storage), Rc::clone(&clock))?;
        let tasks = TaskStore::open(storage, clock)?;
        info!(
            "event=tracker_open module=app status=ok principals={} tasks={}",
            identity.list_principals().len(),
            tasks.list_tasks().len()
        );
        Ok(Self { identity, tasks })
    }

    pub fn identity(&self) -> &IdentityStore {
        &self.identity
    }

    pub fn identity_mut(&mut self) -> &mut IdentityStore {
        &mut self.identity
    }

    pub fn tasks(&self) -> &TaskStore {
        &self.tasks
    }

    pub fn tasks_mut(&mut self) -> &mut TaskStore {
        &mut self.tasks
    }

    /// Creates a task credited to the logged-in principal.
    pub fn create_task(&mut self, request: CreateTaskRequest) -> TrackerResult<Task> {
        let created_by = self
            .identity
            .current_principal()
            .map(|principal| principal.id)
            .ok_or(TrackerError::Unauthenticated)?;
        Ok(self.tasks.create_task(created_by, request)?)
    }

    /// Opens the admin console for the current admin session.
    pub fn admin_console(&mut self) -> AdminResult<AdminConsole<'_>> {
        AdminConsole::open(&mut self.identity, &mut self.tasks)
    }
}
