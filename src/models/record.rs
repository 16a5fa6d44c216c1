//! Represents one row of the source table awaiting a blob rename.

use serde::Serialize;
use sqlx::FromRow;

/// A single row needing its blob renamed and its file reference rewritten.
///
/// Immutable once fetched; it exists only for the duration of one run.
#[derive(Serialize, Clone, FromRow, Debug)]
pub struct MigrationRecord {
    /// Identifier of the row in the source table.
    pub id: i32,

    /// Full URL of the blob this row references. Non-null by query.
    pub file_url: String,
}
