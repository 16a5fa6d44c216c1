//! Core data models for the migration run.
//!
//! These entities map the source table rows via `sqlx::FromRow` and carry
//! the transient state of a server-side copy operation.

pub mod copy;
pub mod record;
