//! Admin-only operations over principals and tasks.
//!
//! # Invariants
//! - A console can only be opened by an authenticated admin session.
//! - Admin principals stay protected even from other admins.

use crate::model::principal::{Principal, PrincipalId};
use crate::model::task::{Task, TaskId};
use crate::service::identity_store::{IdentityError, IdentityStore};
use crate::service::task_store::{TaskError, TaskStats, TaskStore};
use log::info;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type AdminResult<T> = Result<T, AdminError>;

#[derive(Debug)]
pub enum AdminError {
    Identity(IdentityError),
    Task(TaskError),
}

impl AdminError {
    pub fn is_forbidden(&self) -> bool {
        matches!(self, Self::Identity(IdentityError::Forbidden))
    }
}

impl Display for AdminError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Identity(err) => write!(f, "{err}"),
            Self::Task(err) => write!(f, "{err}"),
        }
    }
}

impl Error for AdminError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Identity(err) => Some(err),
            Self::Task(err) => Some(err),
        }
    }
}

impl From<IdentityError> for AdminError {
    fn from(value: IdentityError) -> Self {
        Self::Identity(value)
    }
}

impl From<TaskError> for AdminError {
    fn from(value: TaskError) -> Self {
        Self::Task(value)
    }
}

/// Admin view over both stores, valid for one admin session.
pub struct AdminConsole<'a> {
    identity: &'a mut IdentityStore,
    tasks: &'a mut TaskStore,
    admin_id: PrincipalId,
}

impl<'a> AdminConsole<'a> {
    /// Opens the console; fails with `Forbidden` unless an admin is logged in.
    pub fn open(identity: &'a mut IdentityStore, tasks: &'a mut TaskStore) -> AdminResult<Self> {
        let admin_id = identity.require_admin()?.id;
        Ok(Self {
            identity,
            tasks,
            admin_id,
        })
    }

    pub fn admin_id(&self) -> PrincipalId {
        self.admin_id
    }

    pub fn list_principals(&self) -> &[Principal] {
        self.identity.list_principals()
    }

    pub fn delete_principal(&mut self, id: PrincipalId) -> AdminResult<bool> {
        let deleted = self.identity.delete_principal(id)?;
        info!(
            "event=admin_principal_delete module=admin status=ok admin_id={} principal_id={id} deleted={deleted}",
            self.admin_id
        );
        Ok(deleted)
    }

    pub fn list_tasks(&self) -> &[Task] {
        self.tasks.list_tasks()
    }

    pub fn stats(&self) -> TaskStats {
        self.tasks.stats()
    }

    pub fn delete_task(&mut self, id: TaskId) -> AdminResult<bool> {
        Ok(self.tasks.delete_task(id)?)
    }

    /// Assigns task `task_id` to an existing principal, or clears it.
    pub fn assign_task(
        &mut self,
        task_id: TaskId,
        principal_id: Option<PrincipalId>,
    ) -> AdminResult<Task> {
        if let Some(principal_id) = principal_id {
            if self.identity.get_principal(principal_id).is_none() {
                return Err(IdentityError::NotFound(principal_id).into());
            }
        }
        Ok(self.tasks.assign(task_id, principal_id)?)
    }
}
