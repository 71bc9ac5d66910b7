//! Core domain logic for the task tracker.
//! This crate is the single source of truth for identity, session and task
//! invariants; UI layers only call into it.

pub mod app;
pub mod clock;
pub mod config;
pub mod db;
pub mod guard;
pub mod logging;
pub mod model;
pub mod service;
pub mod storage;
pub mod store;

pub use app::{TaskTracker, TrackerError, TrackerResult};
pub use clock::{Clock, EpochMs, ManualClock, SystemClock};
pub use config::{CoreConfig, LogConfig, StorageLocation};
pub use guard::{
    admin_guard, authenticated_guard, evaluate_route, post_login_target, GuardDecision,
    Navigator, Redirect, RouteGuard, SessionSource,
};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::principal::{Principal, PrincipalId, Role};
pub use model::session::SessionToken;
pub use model::task::{
    CreateTaskRequest, Task, TaskId, TaskPatch, TaskPriority, TaskStatus, TaskValidationError,
};
pub use service::admin_console::{AdminConsole, AdminError, AdminResult};
pub use service::identity_store::{
    IdentityError, IdentityResult, IdentityStore, PrincipalDirectory, RegisterRequest,
};
pub use service::task_board::{LogReporter, RecordingReporter, Reporter, TaskBoard};
pub use service::task_store::{TaskError, TaskResult, TaskStats, TaskStore};
pub use storage::{MemoryStorage, SqliteStorage, Storage, StorageError, StorageResult};
pub use store::entity_store::{
    Derive, Entity, EntityId, EntityStore, IdStrategy, Removal, StoreError, StoreEvent,
    SubscriptionId,
};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
