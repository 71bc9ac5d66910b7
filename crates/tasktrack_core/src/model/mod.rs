//! Domain records owned by the stores.
//!
//! # Invariants
//! - Every record carries a store-assigned, unique integer id.
//! - Principals and tasks serialize to the JSON shape kept in durable storage
//!   (camelCase fields, lowercase/kebab-case enum tags).

pub mod principal;
pub mod session;
pub mod task;
