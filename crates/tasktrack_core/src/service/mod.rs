//! Use-case services built on the generic entity store.
//!
//! # Responsibility
//! - Specialize the entity store for identities and tasks.
//! - Provide caller-side controllers (task board, admin console).

pub mod admin_console;
pub mod identity_store;
pub mod task_board;
pub mod task_store;
