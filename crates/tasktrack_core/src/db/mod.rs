//! SQLite backing for the durable snapshot store.
//!
//! # Responsibility
//! - Open connections for the `kv_entries` snapshot table.
//! - Apply schema migrations in deterministic order.
//!
//! # Invariants
//! - Migration version is tracked via `PRAGMA user_version`.
//! - No snapshot is read or written before migrations succeed.
//! - Every error names the location, migration or key it failed on.

use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod migrations;
mod open;

pub use open::{open_db, open_db_in_memory};

pub type DbResult<T> = Result<T, DbError>;

#[derive(Debug)]
pub enum DbError {
    /// Database at `location` could not be opened.
    Open {
        location: String,
        source: rusqlite::Error,
    },
    /// Connection setup step failed after opening.
    Bootstrap {
        step: &'static str,
        source: rusqlite::Error,
    },
    /// Migration `version` failed; the migration transaction is rolled back.
    Migration {
        version: u32,
        source: rusqlite::Error,
    },
    UnsupportedSchemaVersion {
        db_version: u32,
        latest_supported: u32,
    },
    /// `op` on the snapshot row for `key` failed.
    Entry {
        op: &'static str,
        key: String,
        source: rusqlite::Error,
    },
}

impl DbError {
    /// Wraps a failed `op` on the snapshot row for `key`.
    pub fn entry(op: &'static str, key: &str) -> impl FnOnce(rusqlite::Error) -> Self {
        let key = key.to_string();
        move |source| Self::Entry { op, key, source }
    }

    pub(crate) fn bootstrap(step: &'static str) -> impl FnOnce(rusqlite::Error) -> Self {
        move |source| Self::Bootstrap { step, source }
    }
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Open { location, source } => {
                write!(f, "cannot open snapshot db `{location}`: {source}")
            }
            Self::Bootstrap { step, source } => write!(f, "snapshot db {step} failed: {source}"),
            Self::Migration { version, source } => {
                write!(f, "snapshot migration {version} failed: {source}")
            }
            Self::UnsupportedSchemaVersion {
                db_version,
                latest_supported,
            } => write!(
                f,
                "snapshot schema version {db_version} is newer than supported {latest_supported}"
            ),
            Self::Entry { op, key, source } => {
                write!(f, "snapshot {op} for key `{key}` failed: {source}")
            }
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Open { source, .. }
            | Self::Bootstrap { source, .. }
            | Self::Migration { source, .. }
            | Self::Entry { source, .. } => Some(source),
            Self::UnsupportedSchemaVersion { .. } => None,
        }
    }
}
