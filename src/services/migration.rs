//! The rename pipeline: copy, poll, delete, update, one record at a time.
//!
//! Records are processed strictly sequentially. A failure inside one record
//! is caught at the record boundary, logged, and counted; the batch then
//! moves on. Only the initial fetch is fatal.

use crate::errors::MigrationError;
use crate::models::copy::CopyStatus;
use crate::models::record::MigrationRecord;
use crate::naming;
use crate::services::blob_store::BlobStore;
use crate::services::repository::RecordStore;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval, timeout};
use tracing::{debug, info, warn};

/// Pacing and bound for the copy-status poll.
#[derive(Debug, Clone)]
pub struct PollSettings {
    /// Delay between consecutive status checks.
    pub interval: Duration,
    /// Hard deadline after which a still-pending copy counts as failed.
    pub deadline: Duration,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(1),
            deadline: Duration::from_secs(300),
        }
    }
}

/// Totals for one migration run.
#[derive(Debug, Default, Serialize)]
pub struct MigrationSummary {
    /// Records fetched from the source table.
    pub records: usize,
    /// Records whose blob was renamed and whose update statement ran.
    pub renamed: usize,
    /// Records skipped before any mutation (missing blob, unusable URL).
    pub skipped: usize,
    /// Records that failed mid-cycle.
    pub failed: usize,
    /// Rows rewritten across all update statements.
    pub rows_updated: u64,
}

enum RecordOutcome {
    Renamed { rows_updated: u64 },
    Skipped,
}

/// Orchestrates the three pipeline stages over injected collaborators.
pub struct MigrationService {
    blobs: Arc<dyn BlobStore>,
    records: Arc<dyn RecordStore>,
    poll: PollSettings,
}

impl MigrationService {
    pub fn new(blobs: Arc<dyn BlobStore>, records: Arc<dyn RecordStore>, poll: PollSettings) -> Self {
        Self {
            blobs,
            records,
            poll,
        }
    }

    /// Fetch every record and run the rename cycle over each one.
    ///
    /// A fetch error aborts the run before any record is touched.
    pub async fn run(&self) -> Result<MigrationSummary, sqlx::Error> {
        let records = self.records.fetch_records().await?;
        info!(count = records.len(), "fetched migration records");

        let mut summary = MigrationSummary {
            records: records.len(),
            ..Default::default()
        };
        for record in &records {
            match self.process_record(record).await {
                Ok(RecordOutcome::Renamed { rows_updated }) => {
                    summary.renamed += 1;
                    summary.rows_updated += rows_updated;
                }
                Ok(RecordOutcome::Skipped) => summary.skipped += 1,
                Err(err) => {
                    warn!(id = record.id, error = %err, "record failed");
                    summary.failed += 1;
                }
            }
        }
        Ok(summary)
    }

    /// One full copy/poll/delete/update cycle.
    async fn process_record(&self, record: &MigrationRecord) -> Result<RecordOutcome, MigrationError> {
        let Some(old_name) = naming::blob_name_from_url(&record.file_url) else {
            warn!(id = record.id, url = %record.file_url, "file url has no blob name, skipping");
            return Ok(RecordOutcome::Skipped);
        };
        let new_name = naming::renamed_blob_name(&old_name);
        let Some(new_url) = naming::rewrite_file_url(&record.file_url, &new_name) else {
            warn!(id = record.id, url = %record.file_url, "file url cannot be rewritten, skipping");
            return Ok(RecordOutcome::Skipped);
        };

        if !self.blobs.exists(&old_name).await? {
            debug!(id = record.id, blob = %old_name, "source blob missing, skipping");
            return Ok(RecordOutcome::Skipped);
        }

        self.blobs.begin_copy(&old_name, &new_name).await?;
        let status = self.wait_for_copy(&old_name, &new_name).await?;
        if status != CopyStatus::Success {
            return Err(MigrationError::CopyFailed {
                src: old_name,
                dest: new_name,
                status,
            });
        }

        if new_name != old_name {
            self.blobs.delete_if_exists(&old_name).await?;
        } else {
            // the rename rule was a no-op, so old and new are one object
            debug!(blob = %old_name, "name unchanged by rename rule, keeping blob");
        }

        let rows_updated = self
            .records
            .update_file_url(&record.file_url, &new_url)
            .await
            .map_err(|source| MigrationError::UpdateFailed {
                id: record.id,
                source,
            })?;
        info!(
            id = record.id,
            old = %record.file_url,
            new = %new_url,
            rows_updated,
            "record updated"
        );
        Ok(RecordOutcome::Renamed { rows_updated })
    }

    /// Poll the destination blob until its copy status is terminal.
    async fn wait_for_copy(&self, source: &str, dest: &str) -> Result<CopyStatus, MigrationError> {
        // tokio panics on a zero interval
        let mut ticker = interval(self.poll.interval.max(Duration::from_millis(1)));

        let polled = timeout(self.poll.deadline, async {
            loop {
                ticker.tick().await;
                let status = self.blobs.copy_status(dest).await?;
                debug!(blob = %dest, status = %status, "polled copy status");
                if status.is_terminal() {
                    return Ok::<CopyStatus, MigrationError>(status);
                }
            }
        })
        .await;

        match polled {
            Ok(status) => status,
            Err(_) => Err(MigrationError::CopyTimedOut {
                src: source.to_string(),
                dest: dest.to_string(),
                elapsed: self.poll.deadline,
            }),
        }
    }
}
