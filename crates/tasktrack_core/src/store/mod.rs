//! Generic reactive record store.
//!
//! # Responsibility
//! - Own one ordered, key-unique collection per record type.
//! - Keep cached derived views and the durable snapshot in step with it.
//!
//! # Invariants
//! - Every successful mutation runs: mutate, invalidate views, persist, notify.
//! - A failed persist restores the pre-operation collection.

pub mod entity_store;
