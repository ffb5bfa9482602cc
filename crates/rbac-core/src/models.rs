//! Domain models for the RBAC console.
//!
//! Field names follow the REST contract (camelCase on the wire);
//! timestamps are Unix milliseconds.

pub mod group;
pub mod page;
pub mod permission;
pub mod role;
pub mod session;
pub mod user;
