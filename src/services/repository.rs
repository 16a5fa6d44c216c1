//! Postgres access for migration records.

use crate::models::record::MigrationRecord;
use async_trait::async_trait;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use std::time::Duration;

/// Read/update surface over the source table.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Every row carrying a file reference, newest first.
    async fn fetch_records(&self) -> Result<Vec<MigrationRecord>, sqlx::Error>;

    /// Point every row whose `file_url` equals `old_url` at `new_url`.
    ///
    /// Matching is by exact old value, not by id, so duplicate rows sharing
    /// a URL all move together. Returns the number of rows rewritten.
    async fn update_file_url(&self, old_url: &str, new_url: &str) -> Result<u64, sqlx::Error>;
}

/// `RecordStore` backed by a shared Postgres pool.
pub struct PostgresRecords {
    pool: PgPool,
}

impl PostgresRecords {
    /// Connect a small pool; the pipeline is sequential, so a handful of
    /// connections is plenty.
    pub async fn connect(database_url: &str) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(30))
            .connect(database_url)
            .await?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl RecordStore for PostgresRecords {
    async fn fetch_records(&self) -> Result<Vec<MigrationRecord>, sqlx::Error> {
        sqlx::query_as::<_, MigrationRecord>(
            "SELECT id, file_url FROM tickets WHERE file_url IS NOT NULL ORDER BY id DESC",
        )
        .fetch_all(&self.pool)
        .await
    }

    async fn update_file_url(&self, old_url: &str, new_url: &str) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("UPDATE tickets SET file_url = $1 WHERE file_url = $2")
            .bind(new_url)
            .bind(old_url)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
