//! CLI smoke entry point.
//!
//! Opens the core (SQLite file when a path is given, memory otherwise), logs
//! in as the seeded user and prints a deterministic summary of the task set.
//!
//! Usage: `tasktrack_cli [DB_PATH] [LOG_DIR]`. With `LOG_DIR` (absolute),
//! rolling file logs start at the build's default level.

use std::process::ExitCode;
use tasktrack_core::{core_version, default_log_level, CoreConfig, TaskStatus, TaskTracker};

const SMOKE_EMAIL: &str = "user@example.com";
const SMOKE_SECRET: &str = "user123";

fn main() -> ExitCode {
    let mut args = std::env::args().skip(1);
    let mut config = match args.next() {
        Some(path) => CoreConfig::sqlite_file(path),
        None => CoreConfig::default(),
    };
    if let Some(log_dir) = args.next() {
        config = config.with_logging(default_log_level(), log_dir);
    }

    let mut tracker = match TaskTracker::open(&config) {
        Ok(tracker) => tracker,
        Err(err) => {
            eprintln!("tasktrack failed to open: {err}");
            return ExitCode::FAILURE;
        }
    };

    let principal = match tracker.identity_mut().login(SMOKE_EMAIL, SMOKE_SECRET) {
        Ok(principal) => principal,
        Err(err) => {
            eprintln!("tasktrack smoke login failed: {err}");
            return ExitCode::FAILURE;
        }
    };

    let stats = tracker.tasks().stats();
    println!("tasktrack_core version={}", core_version());
    println!("principal_id={} role={:?}", principal.id, principal.role);
    println!(
        "principals={} tasks={} completion_rate={:.2}",
        tracker.identity().list_principals().len(),
        stats.total,
        stats.completion_rate
    );
    for (status, tasks) in tracker.tasks().by_status() {
        let label = match status {
            TaskStatus::Todo => "todo",
            TaskStatus::InProgress => "in-progress",
            TaskStatus::Done => "done",
        };
        println!("{label}={}", tasks.len());
    }
    ExitCode::SUCCESS
}
