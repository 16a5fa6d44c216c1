//! End-to-end pipeline behavior against in-memory collaborators.
//!
//! The blob container and the record table are both replaced with small
//! in-process doubles so the full copy/poll/delete/update cycle can be
//! observed from the outside.

use async_trait::async_trait;
use blob_rename_migration::errors::BlobStoreError;
use blob_rename_migration::models::copy::CopyStatus;
use blob_rename_migration::models::record::MigrationRecord;
use blob_rename_migration::services::blob_store::BlobStore;
use blob_rename_migration::services::migration::{MigrationService, PollSettings};
use blob_rename_migration::services::repository::RecordStore;
use std::collections::{HashSet, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Blob container double: a set of names plus a scripted sequence of
/// copy-status answers. An exhausted script answers `Success`.
#[derive(Default)]
struct FakeContainer {
    blobs: Mutex<HashSet<String>>,
    statuses: Mutex<VecDeque<CopyStatus>>,
}

impl FakeContainer {
    fn with_blobs<const N: usize>(names: [&str; N]) -> Self {
        Self {
            blobs: Mutex::new(names.iter().map(|n| n.to_string()).collect()),
            statuses: Mutex::new(VecDeque::new()),
        }
    }

    fn script_statuses<const N: usize>(self, statuses: [CopyStatus; N]) -> Self {
        *self.statuses.lock().unwrap() = statuses.into();
        self
    }

    fn contains(&self, name: &str) -> bool {
        self.blobs.lock().unwrap().contains(name)
    }
}

#[async_trait]
impl BlobStore for FakeContainer {
    async fn exists(&self, name: &str) -> Result<bool, BlobStoreError> {
        Ok(self.contains(name))
    }

    async fn begin_copy(&self, source: &str, dest: &str) -> Result<(), BlobStoreError> {
        assert!(self.contains(source), "copy requested from a missing blob");
        self.blobs.lock().unwrap().insert(dest.to_string());
        Ok(())
    }

    async fn copy_status(&self, _dest: &str) -> Result<CopyStatus, BlobStoreError> {
        Ok(self
            .statuses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(CopyStatus::Success))
    }

    async fn delete_if_exists(&self, name: &str) -> Result<bool, BlobStoreError> {
        Ok(self.blobs.lock().unwrap().remove(name))
    }
}

/// Record table double with value-matched updates, like the real statement.
struct FakeRecords {
    rows: Mutex<Vec<MigrationRecord>>,
}

impl FakeRecords {
    fn new(rows: Vec<(i32, &str)>) -> Self {
        Self {
            rows: Mutex::new(
                rows.into_iter()
                    .map(|(id, url)| MigrationRecord {
                        id,
                        file_url: url.to_string(),
                    })
                    .collect(),
            ),
        }
    }

    fn file_url_of(&self, id: i32) -> String {
        self.rows
            .lock()
            .unwrap()
            .iter()
            .find(|row| row.id == id)
            .map(|row| row.file_url.clone())
            .expect("row exists")
    }
}

#[async_trait]
impl RecordStore for FakeRecords {
    async fn fetch_records(&self) -> Result<Vec<MigrationRecord>, sqlx::Error> {
        let mut rows = self.rows.lock().unwrap().clone();
        rows.sort_by(|a, b| b.id.cmp(&a.id));
        Ok(rows)
    }

    async fn update_file_url(&self, old_url: &str, new_url: &str) -> Result<u64, sqlx::Error> {
        let mut affected = 0;
        for row in self.rows.lock().unwrap().iter_mut() {
            if row.file_url == old_url {
                row.file_url = new_url.to_string();
                affected += 1;
            }
        }
        Ok(affected)
    }
}

fn pipeline(
    container: Arc<FakeContainer>,
    records: Arc<FakeRecords>,
) -> MigrationService {
    MigrationService::new(
        container,
        records,
        PollSettings {
            interval: Duration::from_millis(1),
            deadline: Duration::from_secs(1),
        },
    )
}

#[tokio::test]
async fn happy_path_renames_blob_and_updates_row() {
    let container = Arc::new(FakeContainer::with_blobs(["apolice_123.pdf"]));
    let records = Arc::new(FakeRecords::new(vec![(
        7,
        "https://store/container/apolice_123.pdf",
    )]));

    let summary = pipeline(container.clone(), records.clone())
        .run()
        .await
        .unwrap();

    assert!(container.contains("bilhete_123.pdf"));
    assert!(!container.contains("apolice_123.pdf"));
    assert_eq!(
        records.file_url_of(7),
        "https://store/container/bilhete_123.pdf"
    );
    assert_eq!(summary.renamed, 1);
    assert_eq!(summary.rows_updated, 1);
    assert_eq!(summary.failed, 0);
}

#[tokio::test]
async fn url_rewrite_touches_only_the_final_segment() {
    let container = Arc::new(FakeContainer::with_blobs(["apolice_z.pdf"]));
    let records = Arc::new(FakeRecords::new(vec![(
        1,
        "https://cdn/apolice/apolice_z.pdf",
    )]));

    pipeline(container.clone(), records.clone())
        .run()
        .await
        .unwrap();

    assert_eq!(records.file_url_of(1), "https://cdn/apolice/bilhete_z.pdf");
}

#[tokio::test]
async fn pending_statuses_are_polled_through_to_success() {
    let container = Arc::new(
        FakeContainer::with_blobs(["apolice_1.pdf"]).script_statuses([
            CopyStatus::Pending,
            CopyStatus::Pending,
            CopyStatus::Success,
        ]),
    );
    let records = Arc::new(FakeRecords::new(vec![(
        1,
        "https://store/tickets/apolice_1.pdf",
    )]));

    let summary = pipeline(container.clone(), records)
        .run()
        .await
        .unwrap();

    assert_eq!(summary.renamed, 1);
    assert!(!container.contains("apolice_1.pdf"));
}

#[tokio::test]
async fn failed_copy_leaves_blob_and_row_untouched() {
    let container = Arc::new(
        FakeContainer::with_blobs(["apolice_1.pdf"])
            .script_statuses([CopyStatus::Pending, CopyStatus::Failed]),
    );
    let records = Arc::new(FakeRecords::new(vec![(
        1,
        "https://store/tickets/apolice_1.pdf",
    )]));

    let summary = pipeline(container.clone(), records.clone())
        .run()
        .await
        .unwrap();

    assert!(container.contains("apolice_1.pdf"));
    assert_eq!(
        records.file_url_of(1),
        "https://store/tickets/apolice_1.pdf"
    );
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.renamed, 0);
}

#[tokio::test]
async fn missing_blob_skips_the_record_entirely() {
    let container = Arc::new(FakeContainer::default());
    let records = Arc::new(FakeRecords::new(vec![(
        4,
        "https://store/tickets/apolice_4.pdf",
    )]));

    let summary = pipeline(container.clone(), records.clone())
        .run()
        .await
        .unwrap();

    assert_eq!(summary.skipped, 1);
    assert_eq!(
        records.file_url_of(4),
        "https://store/tickets/apolice_4.pdf"
    );
}

#[tokio::test]
async fn duplicate_rows_sharing_a_url_all_move_together() {
    // two rows point at the same blob; the higher id is processed first,
    // the value-matched update rewrites both, and the second record then
    // finds its source blob gone and is skipped
    let container = Arc::new(FakeContainer::with_blobs(["apolice_9.pdf"]));
    let records = Arc::new(FakeRecords::new(vec![
        (1, "https://store/tickets/apolice_9.pdf"),
        (2, "https://store/tickets/apolice_9.pdf"),
    ]));

    let summary = pipeline(container.clone(), records.clone())
        .run()
        .await
        .unwrap();

    assert_eq!(summary.renamed, 1);
    assert_eq!(summary.skipped, 1);
    assert_eq!(summary.rows_updated, 2);
    assert_eq!(
        records.file_url_of(1),
        "https://store/tickets/bilhete_9.pdf"
    );
    assert_eq!(
        records.file_url_of(2),
        "https://store/tickets/bilhete_9.pdf"
    );
}
