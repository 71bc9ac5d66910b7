//! Persistence adapter contract and implementations.
//!
//! # Responsibility
//! - Define the durable `key -> string` mapping consumed by the stores.
//! - Provide the JSON snapshot codec shared by every store.
//!
//! # Invariants
//! - Writes are full-value overwrites; `remove` of an absent key is a no-op.
//! - Each store owns a disjoint set of keys (see `keys`).

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::error::Error;
use std::fmt::{Display, Formatter};

use crate::db::DbError;

mod memory;
mod sqlite;

pub use memory::MemoryStorage;
pub use sqlite::SqliteStorage;

/// Fixed storage keys, one namespace per owning store.
pub mod keys {
    pub const PRINCIPALS: &str = "principals";
    pub const CREDENTIALS: &str = "credentials";
    pub const CURRENT_PRINCIPAL: &str = "currentPrincipal";
    pub const SESSION_TOKEN: &str = "sessionToken";
    pub const TASKS: &str = "tasks";
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Persistence adapter failures.
#[derive(Debug)]
pub enum StorageError {
    /// Backend could not be opened or queried.
    Backend(DbError),
    /// Snapshot under `key` could not be encoded or decoded.
    Codec {
        key: String,
        source: serde_json::Error,
    },
}

impl Display for StorageError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Backend(err) => write!(f, "storage backend failure: {err}"),
            Self::Codec { key, source } => write!(f, "invalid snapshot under `{key}`: {source}"),
        }
    }
}

impl Error for StorageError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Backend(err) => Some(err),
            Self::Codec { source, .. } => Some(source),
        }
    }
}

impl From<DbError> for StorageError {
    fn from(value: DbError) -> Self {
        Self::Backend(value)
    }
}

/// Durable key/value mapping used for store snapshots.
///
/// Methods take `&self`: one adapter is shared by every store of a running
/// instance, all on a single logical thread.
pub trait Storage {
    fn get(&self, key: &str) -> StorageResult<Option<String>>;
    fn set(&self, key: &str, value: &str) -> StorageResult<()>;
    fn remove(&self, key: &str) -> StorageResult<()>;
}

/// Reads and decodes the JSON snapshot stored under `key`.
///
/// Returns `Ok(None)` when nothing has been persisted yet.
pub fn load_json<T: DeserializeOwned>(
    storage: &dyn Storage,
    key: &str,
) -> StorageResult<Option<T>> {
    let Some(raw) = storage.get(key)? else {
        return Ok(None);
    };
    serde_json::from_str(&raw)
        .map(Some)
        .map_err(|source| StorageError::Codec {
            key: key.to_string(),
            source,
        })
}

/// Encodes `value` as JSON and overwrites the snapshot under `key`.
pub fn save_json<T: Serialize + ?Sized>(
    storage: &dyn Storage,
    key: &str,
    value: &T,
) -> StorageResult<()> {
    let raw = serde_json::to_string(value).map_err(|source| StorageError::Codec {
        key: key.to_string(),
        source,
    })?;
    storage.set(key, &raw)
}

#[cfg(test)]
mod tests {
    use super::{load_json, save_json, MemoryStorage, Storage, StorageError};

    #[test]
    fn json_snapshot_survives_save_and_load() {
        let storage = MemoryStorage::new();
        save_json(&storage, "numbers", &vec![3, 1, 2]).expect("save should succeed");

        let loaded: Option<Vec<i32>> = load_json(&storage, "numbers").expect("load");
        assert_eq!(loaded, Some(vec![3, 1, 2]));
    }

    #[test]
    fn missing_key_loads_as_none() {
        let storage = MemoryStorage::new();
        let loaded: Option<Vec<i32>> = load_json(&storage, "absent").expect("load");
        assert!(loaded.is_none());
    }

    #[test]
    fn corrupt_snapshot_reports_codec_error_with_key() {
        let storage = MemoryStorage::new();
        storage.set("tasks", "{not json").expect("raw set");

        let err = load_json::<Vec<i32>>(&storage, "tasks").expect_err("corrupt must fail");
        assert!(matches!(err, StorageError::Codec { ref key, .. } if key == "tasks"));
        assert!(err.to_string().contains("tasks"));
    }
}
