//! Identity records.

use crate::clock::EpochMs;
use crate::store::entity_store::{Entity, EntityId};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;

pub type PrincipalId = EntityId;

/// Authorization level of a principal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Admin,
}

/// Identity authorized to act in the system.
///
/// `email` is the unique, case-sensitive lookup key for credentials.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub id: PrincipalId,
    pub name: String,
    pub email: String,
    pub role: Role,
}

impl Principal {
    /// Builds a principal without an id; the store assigns one on insert.
    pub fn new(name: impl Into<String>, email: impl Into<String>, role: Role) -> Self {
        Self {
            id: 0,
            name: name.into(),
            email: email.into(),
            role,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

impl Entity for Principal {
    /// Only the role may change after creation.
    type Patch = Role;
    type Invalid = Infallible;

    fn id(&self) -> EntityId {
        self.id
    }

    fn assign_id(&mut self, id: EntityId) {
        self.id = id;
    }

    fn apply_patch(&mut self, role: Role, _now_ms: EpochMs) {
        self.role = role;
    }

    fn validate(&self) -> Result<(), Infallible> {
        Ok(())
    }
}
