//! Runtime configuration for opening the core.

use std::path::PathBuf;

/// Where store snapshots are kept.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum StorageLocation {
    /// Process-local map; nothing survives the process.
    #[default]
    InMemory,
    /// SQLite database without a backing file.
    SqliteInMemory,
    /// SQLite database file, created when missing.
    SqliteFile(PathBuf),
}

/// File logging settings forwarded to `init_logging`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    /// One of `trace|debug|info|warn|error`.
    pub level: String,
    /// Absolute directory for rolling log files.
    pub dir: PathBuf,
}

/// Configuration consumed by `TaskTracker::open`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CoreConfig {
    pub storage: StorageLocation,
    /// `None` leaves logging untouched (host may have set it up already).
    pub log: Option<LogConfig>,
}

impl CoreConfig {
    /// Configuration persisting snapshots to a SQLite file.
    pub fn sqlite_file(path: impl Into<PathBuf>) -> Self {
        Self {
            storage: StorageLocation::SqliteFile(path.into()),
            log: None,
        }
    }

    /// Enables file logging at `level` under `dir`.
    pub fn with_logging(mut self, level: impl Into<String>, dir: impl Into<PathBuf>) -> Self {
        self.log = Some(LogConfig {
            level: level.into(),
            dir: dir.into(),
        });
        self
    }
}
